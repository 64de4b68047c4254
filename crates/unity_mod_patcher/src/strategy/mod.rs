//! Type-specific replacement strategies.
//!
//! Each strategy takes the decoded fields of one candidate record, the logical
//! asset name being looked for and the raw replacement file, and either produces
//! the record's new serialized bytes or reports [`StrategyOutcome::NoMatch`].
//!
//! Every strategy compares the record's `m_Name` with the target (case-sensitive)
//! before touching anything, so a `NoMatch` never leaves a partial mutation behind.
//! The record a replacement is keyed to is not always the candidate: sprites carry
//! no pixels and delegate to the texture they reference.

mod audio;
mod sprite;
mod texture;

pub use audio::AudioStrategy;
pub use sprite::SpriteStrategy;
pub use texture::TextureStrategy;

use crate::container::{AssetRecord, ContainerFile};
use crate::error::Result;
use crate::kind::AssetKind;
use crate::resource::ResourceStreams;
use unity_assets::FieldTree;

/// New serialized bytes for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The record to attach the bytes to.
    pub path_id: i64,
    pub field_bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Replaced(Replacement),
    /// The record's name is not the target; try the next candidate.
    NoMatch,
}

/// What a strategy may consult or write besides the candidate's own fields.
pub struct StrategyContext<'a> {
    pub container: &'a ContainerFile,
    pub resources: &'a mut ResourceStreams,
    pub alignment: u64,
}

pub trait ReplacementStrategy: Sync {
    fn kind(&self) -> AssetKind;

    /// Apply `raw` to `tree` if its name equals `target`.
    fn create_replacement(
        &self,
        record: &AssetRecord,
        tree: &mut FieldTree,
        target: &str,
        raw: &[u8],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<StrategyOutcome>;
}

/// The strategy handling records of `class_id`.
pub fn strategy_for_class(class_id: i32) -> Option<&'static dyn ReplacementStrategy> {
    match AssetKind::from_class_id(class_id)? {
        AssetKind::Audio => Some(&AudioStrategy),
        AssetKind::Sprite => Some(&SpriteStrategy),
        AssetKind::Texture => Some(&TextureStrategy),
    }
}

/// Whether the record's name equals `target` exactly.
fn name_matches(tree: &FieldTree, target: &str) -> bool {
    tree.name() == Some(target)
}

/// Set a field only when the layout has it.
fn set_int_if_present(tree: &mut FieldTree, path: &str, value: i64) -> Result<()> {
    if tree.lookup(path).is_some() {
        tree.set_int(path, value)?;
    }
    Ok(())
}
