use super::{
    name_matches, Replacement, ReplacementStrategy, StrategyContext, StrategyOutcome,
    TextureStrategy,
};
use crate::container::AssetRecord;
use crate::error::{Error, Result};
use crate::kind::{AssetKind, TEXTURE2D_CLASS_ID};
use unity_assets::FieldTree;

/// Sprites carry no pixels; the replacement lands on the texture they reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteStrategy;

impl ReplacementStrategy for SpriteStrategy {
    fn kind(&self) -> AssetKind {
        AssetKind::Sprite
    }

    fn create_replacement(
        &self,
        record: &AssetRecord,
        tree: &mut FieldTree,
        target: &str,
        raw: &[u8],
        ctx: &mut StrategyContext<'_>,
    ) -> Result<StrategyOutcome> {
        if !name_matches(tree, target) {
            return Ok(StrategyOutcome::NoMatch);
        }

        let file_id = tree.get_int("m_RD.texture.m_FileID")? as i32;
        let path_id = tree.get_int("m_RD.texture.m_PathID")?;
        if file_id != 0 || path_id == 0 {
            tracing::warn!(
                "Sprite texture not in this container name={} file_id={} path_id={}",
                target,
                file_id,
                path_id
            );
            return Err(Error::UnsupportedReference {
                asset: target.to_string(),
                file_id,
                path_id,
            });
        }

        let texture = ctx
            .container
            .record(path_id)
            .filter(|r| r.class_id == TEXTURE2D_CLASS_ID)
            .ok_or(unity_assets::Error::ObjectNotFound(path_id))?;
        let mut texture_tree = ctx.container.fields_of(&texture)?;
        let field_bytes = TextureStrategy::apply(&mut texture_tree, raw)?;

        tracing::info!(
            "Replaced sprite texture name={} sprite_path_id={} texture_path_id={}",
            target,
            record.path_id,
            texture.path_id
        );
        Ok(StrategyOutcome::Replaced(Replacement {
            path_id: texture.path_id,
            field_bytes,
        }))
    }
}
