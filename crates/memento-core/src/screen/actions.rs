//! The share / delete / cancel prompt shown for a record.

use serde::Serialize;

use crate::device::{MailDraft, MailStatus};
use crate::models::{AssetUri, Kind};

/// One choice from the record prompt. Choices are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordAction {
    Share,
    Delete,
    Cancel,
}

impl RecordAction {
    pub const ALL: [Self; 3] = [Self::Share, Self::Delete, Self::Cancel];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Share => "Share Via Email",
            Self::Delete => "Delete",
            Self::Cancel => "Cancel",
        }
    }
}

/// Text of the confirmation prompt for a record of some kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionPrompt {
    pub title: &'static str,
    pub message: String,
    pub actions: [RecordAction; 3],
}

impl ActionPrompt {
    pub fn for_kind(kind: Kind) -> Self {
        Self {
            title: "Confirmation",
            message: format!("What do you plan to do with the {}?", kind.noun()),
            actions: RecordAction::ALL,
        }
    }
}

/// What happened after the user picked an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Shared(ShareOutcome),
    Deleted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    /// No mail client is configured.
    Unavailable,
    Composed(MailStatus),
    Failed,
}

pub(crate) fn share_draft(kind: Kind, media_url: &AssetUri) -> MailDraft {
    MailDraft {
        subject: format!("Check out this {}!", kind.noun()),
        body: format!("I wanted to share this {} with you.", kind.noun()),
        attachments: vec![media_url.clone()],
    }
}

pub(crate) fn share_sent_message(kind: Kind) -> &'static str {
    match kind {
        Kind::Photo => "The Image has been sent successfully.",
        Kind::Audio => "The audio has been sent successfully.",
    }
}

pub(crate) const fn deleted_notice(kind: Kind) -> (&'static str, &'static str) {
    match kind {
        Kind::Photo => ("Image Delete", "Image Deleted successfully!"),
        Kind::Audio => ("Audio Delete", "Audio Deleted successfully!"),
    }
}

pub(crate) const fn delete_failed_message(kind: Kind) -> &'static str {
    match kind {
        Kind::Photo => "Sorry! Failed to delete the image!",
        Kind::Audio => "Failed to delete audio",
    }
}
