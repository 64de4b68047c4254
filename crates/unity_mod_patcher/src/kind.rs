//! Moddable asset kinds and their Unity class ids.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEXTURE2D_CLASS_ID: i32 = 28;
pub const AUDIO_CLIP_CLASS_ID: i32 = 83;
pub const SPRITE_CLASS_ID: i32 = 213;

/// Kind of asset a replacement file targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Audio,
    Sprite,
    Texture,
}

/// `(kind, display name, class id)`.
const KIND_TABLE: [(AssetKind, &str, i32); 3] = [
    (AssetKind::Audio, "AudioClip", AUDIO_CLIP_CLASS_ID),
    (AssetKind::Sprite, "Sprite", SPRITE_CLASS_ID),
    (AssetKind::Texture, "Texture2D", TEXTURE2D_CLASS_ID),
];

impl AssetKind {
    pub const ALL: [AssetKind; 3] = [AssetKind::Audio, AssetKind::Sprite, AssetKind::Texture];

    fn entry(self) -> (AssetKind, &'static str, i32) {
        KIND_TABLE[self as usize]
    }

    /// The Unity class name, e.g. `"AudioClip"`.
    pub fn display_name(self) -> &'static str {
        self.entry().1
    }

    pub fn class_id(self) -> i32 {
        self.entry().2
    }

    pub fn from_class_id(class_id: i32) -> Option<Self> {
        KIND_TABLE
            .iter()
            .find(|(_, _, id)| *id == class_id)
            .map(|(kind, _, _)| *kind)
    }

    pub fn is_image(self) -> bool {
        matches!(self, AssetKind::Sprite | AssetKind::Texture)
    }

    /// The other image kind; audio has no fallback.
    pub fn fallback(self) -> Option<Self> {
        match self {
            AssetKind::Audio => None,
            AssetKind::Sprite => Some(AssetKind::Texture),
            AssetKind::Texture => Some(AssetKind::Sprite),
        }
    }

    /// Class ids to search, own class first.
    pub fn search_classes(self) -> Vec<i32> {
        std::iter::once(self)
            .chain(self.fallback())
            .map(AssetKind::class_id)
            .collect()
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
