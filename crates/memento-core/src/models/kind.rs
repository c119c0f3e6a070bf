//! Media kinds and their capability sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::device::Capability;

/// The two kinds of media a user can keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Photo,
    Audio,
}

impl Kind {
    /// Store collection holding records of this kind.
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Photo => "images",
            Self::Audio => "audios",
        }
    }

    /// Document field holding the asset URI.
    pub const fn url_field(self) -> &'static str {
        match self {
            Self::Photo => "imageUrl",
            Self::Audio => "audioUrl",
        }
    }

    /// Noun used in user-facing text.
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Photo => "image",
            Self::Audio => "audio",
        }
    }

    /// Device permissions requested before capturing media of this kind.
    pub const fn permission_scope(self) -> &'static [Capability] {
        match self {
            Self::Photo => &[Capability::Camera, Capability::MediaLibrary],
            Self::Audio => &[Capability::Microphone],
        }
    }

    /// Only photos carry a display name.
    pub const fn has_names(self) -> bool {
        matches!(self, Self::Photo)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

/// Type-level marker for a media kind, used to parameterize screens.
pub trait MediaKind: Send + Sync + 'static {
    const KIND: Kind;
}

/// Photos captured by camera or picked from the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct Photo;

/// Voice clips recorded with the microphone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Audio;

impl MediaKind for Photo {
    const KIND: Kind = Kind::Photo;
}

impl MediaKind for Audio {
    const KIND: Kind = Kind::Audio;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_are_distinct() {
        assert_ne!(Kind::Photo.collection(), Kind::Audio.collection());
        assert_eq!(Photo::KIND.collection(), "images");
        assert_eq!(Audio::KIND.url_field(), "audioUrl");
    }

    #[test]
    fn audio_needs_only_the_microphone() {
        assert_eq!(Kind::Audio.permission_scope(), &[Capability::Microphone]);
        assert!(Kind::Photo
            .permission_scope()
            .contains(&Capability::MediaLibrary));
    }
}
