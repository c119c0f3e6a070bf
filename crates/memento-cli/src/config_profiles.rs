//! Named profiles stored in the user config dir, one per Firebase project or device setup.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use memento_core::config::BackendConfig;
use memento_core::device::Capability;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "memento";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub backend: Option<BackendConfig>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub camera_command: Option<String>,
    #[serde(default)]
    pub player_command: Option<String>,
    #[serde(default)]
    pub outbox_dir: Option<PathBuf>,
    #[serde(default)]
    pub permissions: PermissionDefaults,
}

/// Stored answers to permission prompts. `None` means ask.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_library: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone: Option<bool>,
}

impl PermissionDefaults {
    pub const fn get(&self, capability: Capability) -> Option<bool> {
        match capability {
            Capability::Camera => self.camera,
            Capability::MediaLibrary => self.media_library,
            Capability::Microphone => self.microphone,
        }
    }

    pub fn set(&mut self, capability: Capability, granted: bool) {
        let slot = match capability {
            Capability::Camera => &mut self.camera,
            Capability::MediaLibrary => &mut self.media_library,
            Capability::Microphone => &mut self.microphone,
        };
        *slot = Some(granted);
    }
}

#[derive(Debug, Error)]
pub enum ProfilesError {
    #[error("Failed to read config at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write config at {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to serialize config: {0}")]
    Encode(#[from] serde_json::Error),
}

const fn default_config_version() -> u32 {
    1
}

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    app_dir(dirs::config_dir()).join(CONFIG_FILE_NAME)
}

pub fn default_data_dir() -> PathBuf {
    app_dir(dirs::data_dir())
}

pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    memento_core::util::normalize_text_option(value)
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string))
}

fn normalize_path_option(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|path| !path.as_os_str().is_empty())
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, ProfilesError> {
        Self::load_from_path(&default_config_path())
    }

    /// A missing file is an empty config, not an error.
    pub fn load_from_path(path: &Path) -> Result<Self, ProfilesError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ProfilesError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: Self =
            serde_json::from_str(&raw).map_err(|source| ProfilesError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ProfilesError> {
        let path = default_config_path();
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ProfilesError> {
        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)?;

        let write = |path: &Path| -> io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serialized.as_bytes())
        };
        write(path).map_err(|source| ProfilesError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        self.resolve_profile_name_with_env(
            explicit,
            std::env::var("MEMENTO_PROFILE").ok().as_deref(),
        )
    }

    pub fn resolve_profile_name_with_env(
        &self,
        explicit: Option<&str>,
        from_env: Option<&str>,
    ) -> String {
        normalize_profile_name(explicit)
            .or_else(|| normalize_profile_name(from_env))
            .or_else(|| normalize_profile_name(self.active_profile.as_deref()))
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Stored backend config with `MEMENTO_FIREBASE_*` filling the gaps.
    pub fn backend_config(&self) -> BackendConfig {
        self.backend
            .clone()
            .unwrap_or_default()
            .or(BackendConfig::from_env())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("memento.db")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.data_dir().join("photos")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.data_dir().join("clips")
    }

    pub fn outbox_dir(&self) -> PathBuf {
        self.outbox_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("outbox"))
    }

    pub fn camera_command(&self) -> Option<String> {
        normalize_text_option(self.camera_command.clone())
    }

    pub fn player_command(&self) -> Option<String> {
        normalize_text_option(self.player_command.clone())
    }

    fn normalize(&mut self) {
        self.camera_command = normalize_text_option(self.camera_command.take());
        self.player_command = normalize_text_option(self.player_command.take());
        self.data_dir = normalize_path_option(self.data_dir.take());
        self.outbox_dir = normalize_path_option(self.outbox_dir.take());
        if self
            .backend
            .as_ref()
            .is_some_and(|backend| *backend == BackendConfig::default())
        {
            self.backend = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
    }

    #[test]
    fn saved_profiles_reload_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" default ".to_string()),
            profiles: BTreeMap::new(),
        };
        let mut permissions = PermissionDefaults::default();
        permissions.set(Capability::Microphone, true);
        config.profiles.insert(
            "default".to_string(),
            CliProfile {
                backend: Some(BackendConfig {
                    api_key: Some("key".to_string()),
                    project_id: Some("project".to_string()),
                    ..BackendConfig::default()
                }),
                camera_command: Some("  ".to_string()),
                player_command: Some(" aplay ".to_string()),
                permissions,
                ..CliProfile::default()
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();
        let profile = loaded.profile("default").unwrap();

        assert_eq!(loaded.active_profile.as_deref(), Some("default"));
        assert_eq!(profile.camera_command, None);
        assert_eq!(profile.player_command.as_deref(), Some("aplay"));
        assert_eq!(profile.permissions.get(Capability::Microphone), Some(true));
        assert_eq!(profile.permissions.get(Capability::Camera), None);
        assert_eq!(
            profile.backend.as_ref().and_then(|b| b.api_key.as_deref()),
            Some("key")
        );
    }

    #[test]
    fn missing_file_loads_empty_and_garbage_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(
            CliProfilesConfig::load_from_path(&path).unwrap(),
            CliProfilesConfig::default()
        );

        std::fs::write(&path, "{ profiles: ").unwrap();
        let error = CliProfilesConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, ProfilesError::Parse { .. }));
        assert!(error.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_env_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(
            config.resolve_profile_name_with_env(Some("phone"), Some("env")),
            "phone"
        );
        assert_eq!(config.resolve_profile_name_with_env(None, Some("env")), "env");
        assert_eq!(config.resolve_profile_name_with_env(None, Some(" ")), "work");
        assert_eq!(
            CliProfilesConfig::default().resolve_profile_name_with_env(None, None),
            "default"
        );
    }

    #[test]
    fn profile_paths_follow_data_dir() {
        let profile = CliProfile {
            data_dir: Some(PathBuf::from("/tmp/memento")),
            ..CliProfile::default()
        };
        assert_eq!(profile.db_path(), PathBuf::from("/tmp/memento/memento.db"));
        assert_eq!(profile.clips_dir(), PathBuf::from("/tmp/memento/clips"));
        assert_eq!(profile.outbox_dir(), PathBuf::from("/tmp/memento/outbox"));
    }
}
