use super::{
    name_matches, set_int_if_present, Replacement, ReplacementStrategy, StrategyContext,
    StrategyOutcome,
};
use crate::container::AssetRecord;
use crate::error::Result;
use crate::kind::AssetKind;
use image::imageops::FilterType;
use unity_assets::FieldTree;

/// `TextureFormat.RGBA32`.
pub const RGBA32_FORMAT: i64 = 4;

/// Decodes an image and stores it inline as uncompressed RGBA32.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureStrategy;

impl TextureStrategy {
    /// Overwrite a texture's pixels with `raw`, skipping the name check.
    ///
    /// The image is resized to the texture's existing dimensions and stored
    /// bottom row first, as Unity expects.
    pub fn apply(tree: &mut FieldTree, raw: &[u8]) -> Result<Vec<u8>> {
        let width = u32::try_from(tree.get_int("m_Width")?).unwrap_or(0);
        let height = u32::try_from(tree.get_int("m_Height")?).unwrap_or(0);

        let mut img = image::load_from_memory(raw)?;
        if width > 0 && height > 0 && (img.width() != width || img.height() != height) {
            tracing::debug!(
                "Resizing replacement image from={}x{} to={}x{}",
                img.width(),
                img.height(),
                width,
                height
            );
            img = img.resize_exact(width, height, FilterType::CatmullRom);
        }
        let pixels = image::imageops::flip_vertical(&img.to_rgba8()).into_raw();

        tree.set_int("m_TextureFormat", RGBA32_FORMAT)?;
        tree.set_int("m_CompleteImageSize", pixels.len() as i64)?;
        tree.set_bytes("image data", pixels)?;
        set_int_if_present(tree, "m_MipCount", 1)?;
        // Pixels are inline now; drop any pointer into a streamed blob.
        if tree.lookup("m_StreamData").is_some() {
            tree.set_uint("m_StreamData.offset", 0)?;
            tree.set_uint("m_StreamData.size", 0)?;
            tree.set_string("m_StreamData.path", "")?;
        }
        tree.to_bytes().map_err(Into::into)
    }
}

impl ReplacementStrategy for TextureStrategy {
    fn kind(&self) -> AssetKind {
        AssetKind::Texture
    }

    fn create_replacement(
        &self,
        record: &AssetRecord,
        tree: &mut FieldTree,
        target: &str,
        raw: &[u8],
        _ctx: &mut StrategyContext<'_>,
    ) -> Result<StrategyOutcome> {
        if !name_matches(tree, target) {
            return Ok(StrategyOutcome::NoMatch);
        }
        let field_bytes = Self::apply(tree, raw)?;
        tracing::info!(
            "Replaced texture name={} path_id={} bytes={}",
            target,
            record.path_id,
            field_bytes.len()
        );
        Ok(StrategyOutcome::Replaced(Replacement {
            path_id: record.path_id,
            field_bytes,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceStreams;
    use crate::strategy::fixtures;

    #[test]
    fn test_resized_and_flipped() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(5, fixtures::texture("menu-bg", 4, 4))],
        );
        let container = fixtures::open(&path);
        let record = container.record(5).unwrap();
        let mut tree = container.fields_of(&record).unwrap();

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 4,
        };
        let outcome = TextureStrategy
            .create_replacement(&record, &mut tree, "menu-bg", &fixtures::png(4, 4), &mut ctx)
            .unwrap();
        assert!(matches!(outcome, StrategyOutcome::Replaced(ref r) if r.path_id == 5));

        assert_eq!(tree.get_int("m_TextureFormat").unwrap(), RGBA32_FORMAT);
        assert_eq!(tree.get_int("m_CompleteImageSize").unwrap(), 64);
        assert_eq!(tree.get_int("m_MipCount").unwrap(), 1);
        assert_eq!(tree.get_uint("m_StreamData.size").unwrap(), 0);
        assert_eq!(tree.get_str("m_StreamData.path").unwrap(), "");

        // The red top row of the image is the last row in storage order.
        let pixels = tree.get_bytes("image data").unwrap();
        assert_eq!(&pixels[..4], &[0, 0, 255, 255]);
        assert_eq!(&pixels[48..52], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_apply_resizes_to_texture_dimensions() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(5, fixtures::texture("atlas", 8, 2))],
        );
        let container = fixtures::open(&path);
        let mut tree = container.fields_of(&container.record(5).unwrap()).unwrap();

        TextureStrategy::apply(&mut tree, &fixtures::png(32, 32)).unwrap();
        assert_eq!(tree.get_bytes("image data").unwrap().len(), 8 * 2 * 4);
        assert_eq!(tree.get_int("m_Width").unwrap(), 8);
    }

    #[test]
    fn test_name_mismatch_leaves_fields() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(5, fixtures::texture("menu-bg", 4, 4))],
        );
        let container = fixtures::open(&path);
        let record = container.record(5).unwrap();
        let mut tree = container.fields_of(&record).unwrap();
        let before = tree.to_bytes().unwrap();

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 4,
        };
        let outcome = TextureStrategy
            .create_replacement(&record, &mut tree, "Menu-bg", &fixtures::png(4, 4), &mut ctx)
            .unwrap();
        assert_eq!(outcome, StrategyOutcome::NoMatch);
        assert_eq!(tree.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_undecodable_image_fails() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(5, fixtures::texture("menu-bg", 4, 4))],
        );
        let container = fixtures::open(&path);
        let mut tree = container.fields_of(&container.record(5).unwrap()).unwrap();
        assert!(TextureStrategy::apply(&mut tree, b"not an image").is_err());
    }
}
