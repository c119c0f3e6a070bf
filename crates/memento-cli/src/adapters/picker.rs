use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use memento_core::device::{CaptureOptions, CaptureOutcome, PhotoPicker, PhotoSource};
use memento_core::{AssetUri, Error, Result};

const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Library picks copy a chosen file; camera captures run an external command.
///
/// Each capture lands in its own timestamped folder under `photos_dir`, so
/// the file keeps its original name.
pub struct TerminalPicker {
    photos_dir: PathBuf,
    library_file: Option<PathBuf>,
    camera_command: Option<String>,
}

impl TerminalPicker {
    pub const fn new(
        photos_dir: PathBuf,
        library_file: Option<PathBuf>,
        camera_command: Option<String>,
    ) -> Self {
        Self {
            photos_dir,
            library_file,
            camera_command,
        }
    }

    fn capture_dir(&self) -> PathBuf {
        self.photos_dir
            .join(Utc::now().format("%Y%m%d-%H%M%S%3f").to_string())
    }

    async fn pick_from_library(&self) -> Result<CaptureOutcome> {
        let Some(source) = self.library_file.as_deref() else {
            return Ok(CaptureOutcome::Cancelled);
        };
        let Some(file_name) = source.file_name() else {
            return Err(Error::InvalidInput(format!(
                "{} is not a file",
                source.display()
            )));
        };

        let target_dir = self.capture_dir();
        tokio::fs::create_dir_all(&target_dir).await?;
        let target = target_dir.join(file_name);
        tokio::fs::copy(source, &target).await?;
        tracing::debug!("Copied {} to {}", source.display(), target.display());
        Ok(CaptureOutcome::Captured(AssetUri::from_path(&target)?))
    }

    async fn take_picture(&self, options: CaptureOptions) -> Result<CaptureOutcome> {
        let Some(command) = self.camera_command.as_deref() else {
            return Err(Error::DeviceOperationFailed(
                "no camera command configured".to_string(),
            ));
        };

        let target_dir = self.capture_dir();
        tokio::fs::create_dir_all(&target_dir).await?;
        let target = target_dir.join("capture.jpg");

        let Some((program, args)) = command_line(command, &target) else {
            return Err(Error::DeviceOperationFailed(
                "camera command is empty".to_string(),
            ));
        };
        tracing::debug!(
            "Running camera command {program} (quality {:.1})",
            options.quality
        );
        let status = tokio::process::Command::new(&program)
            .args(&args)
            .env("MEMENTO_CAPTURE_QUALITY", options.quality.to_string())
            .status()
            .await?;
        if !status.success() {
            return Err(Error::DeviceOperationFailed(format!(
                "`{program}` exited with status {status}"
            )));
        }

        match tokio::fs::metadata(&target).await {
            Ok(metadata) if metadata.len() > 0 => {
                Ok(CaptureOutcome::Captured(AssetUri::from_path(&target)?))
            }
            _ => {
                tokio::fs::remove_dir_all(&target_dir).await.ok();
                Ok(CaptureOutcome::Cancelled)
            }
        }
    }
}

#[async_trait]
impl PhotoPicker for TerminalPicker {
    async fn capture(&self, source: PhotoSource, options: CaptureOptions) -> Result<CaptureOutcome> {
        match source {
            PhotoSource::Library => self.pick_from_library().await,
            PhotoSource::Camera => self.take_picture(options).await,
        }
    }
}

/// Split a configured command and substitute the output path.
///
/// Without a `{output}` placeholder the path is appended as the last argument.
pub fn command_line(command: &str, output: &Path) -> Option<(String, Vec<String>)> {
    let output = output.display().to_string();
    let mut parts = command.split_whitespace();
    let program = parts.next()?.to_string();

    let mut substituted = false;
    let mut args = parts
        .map(|part| {
            if part.contains(OUTPUT_PLACEHOLDER) {
                substituted = true;
                part.replace(OUTPUT_PLACEHOLDER, &output)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>();
    if !substituted {
        args.push(output);
    }
    Some((program, args))
}
