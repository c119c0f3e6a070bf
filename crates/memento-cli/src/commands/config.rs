use std::path::{Path, PathBuf};

use memento_core::config::{parse_backend_config, BackendConfig};
use memento_core::device::Capability;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::config_profiles::{
    default_config_path, normalize_text_option, CliProfile, CliProfilesConfig, PermissionDefaults,
};
use crate::error::CliError;

/// Values passed to `config init`; `None` keeps what the profile already has.
#[derive(Debug, Default)]
pub struct InitOptions {
    pub profile: Option<String>,
    pub backend_config: Option<PathBuf>,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub auth_domain: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub camera_command: Option<String>,
    pub player_command: Option<String>,
    pub outbox_dir: Option<PathBuf>,
    pub grant: Vec<Capability>,
    pub deny: Vec<Capability>,
    pub no_activate: bool,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            backend_config,
            api_key,
            project_id,
            auth_domain,
            data_dir,
            camera_command,
            player_command,
            outbox_dir,
            grant,
            deny,
            no_activate,
        } => run_config_init(InitOptions {
            profile: profile.or_else(|| global_profile.map(str::to_string)),
            backend_config,
            api_key,
            project_id,
            auth_domain,
            data_dir,
            camera_command,
            player_command,
            outbox_dir,
            grant: grant.into_iter().map(Capability::from).collect(),
            deny: deny.into_iter().map(Capability::from).collect(),
            no_activate,
        }),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(options: InitOptions) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(options.profile.as_deref());

    let from_file = options
        .backend_config
        .as_deref()
        .map(read_backend_file)
        .transpose()?;
    let existing_backend = config
        .profile(&profile_name)
        .and_then(|profile| profile.backend.clone());
    let backend = merge_backend(
        BackendConfig {
            api_key: normalize_text_option(options.api_key),
            project_id: normalize_text_option(options.project_id),
            auth_domain: normalize_text_option(options.auth_domain),
            ..BackendConfig::default()
        },
        from_file,
        BackendConfig::from_env(),
        existing_backend,
    );
    if let Some(backend) = &backend {
        backend.validate().map_err(CliError::Config)?;
    }

    let profile = config.profile_mut_or_default(&profile_name);
    profile.backend = backend;
    if let Some(value) = options.data_dir {
        profile.data_dir = Some(value);
    }
    if let Some(value) = normalize_text_option(options.camera_command) {
        profile.camera_command = Some(value);
    }
    if let Some(value) = normalize_text_option(options.player_command) {
        profile.player_command = Some(value);
    }
    if let Some(value) = options.outbox_dir {
        profile.outbox_dir = Some(value);
    }
    apply_permissions(&mut profile.permissions, &options.grant, &options.deny)?;

    if !options.no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save()?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let ready = config
        .profile(&profile_name)
        .is_some_and(|profile| profile.backend_config().is_configured());
    if ready {
        println!(
            "Profile '{profile_name}' is ready. Run `memento register` or `memento login` next."
        );
    } else {
        println!("Profile '{profile_name}' is missing: apiKey, projectId");
    }
    Ok(())
}

fn read_backend_file(path: &Path) -> Result<BackendConfig, CliError> {
    let payload = std::fs::read_to_string(path)?;
    parse_backend_config(&payload)
        .map_err(|error| CliError::Config(format!("{}: {error}", path.display())))
}

/// Explicit flags win over the config file, then the environment, then what was stored.
pub fn merge_backend(
    explicit: BackendConfig,
    from_file: Option<BackendConfig>,
    from_env: BackendConfig,
    existing: Option<BackendConfig>,
) -> Option<BackendConfig> {
    let merged = explicit
        .or(from_file.unwrap_or_default())
        .or(from_env)
        .or(existing.unwrap_or_default());
    (merged != BackendConfig::default()).then_some(merged)
}

pub fn apply_permissions(
    permissions: &mut PermissionDefaults,
    grant: &[Capability],
    deny: &[Capability],
) -> Result<(), CliError> {
    if let Some(capability) = grant.iter().find(|capability| deny.contains(capability)) {
        return Err(CliError::Config(format!(
            "cannot both grant and deny {capability:?}"
        )));
    }
    for &capability in grant {
        permissions.set(capability, true);
    }
    for &capability in deny {
        permissions.set(capability, false);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProfileSummary<'a> {
    profile: &'a str,
    config_path: PathBuf,
    backend_configured: bool,
    project_id: Option<String>,
    data_dir: PathBuf,
    db_path: PathBuf,
    outbox_dir: PathBuf,
    camera_command: Option<String>,
    player_command: Option<String>,
    permissions: PermissionDefaults,
}

fn run_config_show(global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load()?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    println!(
        "{}",
        serde_json::to_string_pretty(&summarize(&profile_name, &profile))?
    );
    Ok(())
}

fn summarize<'a>(profile_name: &'a str, profile: &CliProfile) -> ProfileSummary<'a> {
    let backend = profile.backend_config();
    ProfileSummary {
        profile: profile_name,
        config_path: default_config_path(),
        backend_configured: backend.is_configured(),
        project_id: backend.project_id,
        data_dir: profile.data_dir(),
        db_path: profile.db_path(),
        outbox_dir: profile.outbox_dir(),
        camera_command: profile.camera_command(),
        player_command: profile.player_command(),
        permissions: profile.permissions,
    }
}

