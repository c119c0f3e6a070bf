//! Photo gallery controller.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::device::{CaptureOptions, CaptureOutcome, PhotoPicker, PhotoSource};
use crate::models::{Photo, RecordId};
use crate::notice::Notice;
use crate::{Error, Result};

use super::ordering::SortOrder;
use super::repository::MediaRepository;

/// Result of a capture attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    Saved(RecordId),
    /// The user dismissed the picker; nothing was stored.
    Cancelled,
}

/// Photo screen: library/camera capture on top of a sorted live list.
pub struct PhotoScreen {
    repo: MediaRepository<Photo>,
    picker: Arc<dyn PhotoPicker>,
}

impl PhotoScreen {
    pub fn new(caps: Capabilities, picker: Arc<dyn PhotoPicker>) -> Self {
        let mut repo = MediaRepository::new(caps);
        repo.set_order(SortOrder::default());
        Self { repo, picker }
    }

    /// Switch ordering; re-sorts in memory without re-querying the store.
    pub fn sort_by(&mut self, order: SortOrder) {
        self.repo.set_order(order);
    }

    pub fn sort_order(&self) -> SortOrder {
        self.repo.order().unwrap_or_default()
    }

    /// Acquire the source's permission, run the picker, and store the result.
    pub async fn capture(&self, source: PhotoSource) -> Result<CaptureResult> {
        self.repo.owner()?;
        let caps = self.repo.capabilities();

        self.repo.acquire(source.capability()).await?;

        let uri = match self.picker.capture(source, CaptureOptions::default()).await {
            Ok(CaptureOutcome::Captured(uri)) => uri,
            Ok(CaptureOutcome::Cancelled) => {
                tracing::debug!("Photo picker dismissed");
                return Ok(CaptureResult::Cancelled);
            }
            Err(error) => {
                tracing::warn!("Photo capture from {source:?} failed: {error}");
                caps.notices
                    .present(Notice::error("Error", failure_message(source)));
                return Err(match error {
                    Error::DeviceOperationFailed(_) => error,
                    other => Error::DeviceOperationFailed(other.to_string()),
                });
            }
        };

        match self.repo.persist(&uri).await {
            Ok(id) => Ok(CaptureResult::Saved(id)),
            Err(error) => {
                tracing::warn!("Captured {uri} but could not store it: {error}");
                caps.notices
                    .present(Notice::error("Error", failure_message(source)));
                Err(error)
            }
        }
    }
}

const fn failure_message(source: PhotoSource) -> &'static str {
    match source {
        PhotoSource::Library => "Failed to pick image!",
        PhotoSource::Camera => "Failed to take picture!",
    }
}

impl Deref for PhotoScreen {
    type Target = MediaRepository<Photo>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

impl DerefMut for PhotoScreen {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.repo
    }
}
