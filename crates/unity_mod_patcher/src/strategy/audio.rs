use super::{
    name_matches, set_int_if_present, Replacement, ReplacementStrategy, StrategyContext,
    StrategyOutcome,
};
use crate::audio;
use crate::container::{AssetRecord, ContainerFile};
use crate::error::Result;
use crate::kind::AssetKind;
use camino::Utf8PathBuf;
use unity_assets::FieldTree;

/// Streams encoded audio into the clip's resource blob and rewrites its header.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioStrategy;

impl AudioStrategy {
    /// Blob file the clip streams from, relative to the container's directory.
    ///
    /// Returns the blob path and whether `m_Source` must be filled in.
    fn blob_for(container: &ContainerFile, source: &str) -> (Utf8PathBuf, Option<String>) {
        let dir = container
            .path()
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        // `archive:/CAB-.../CAB-....resS` and bare file names both resolve by file name.
        match source.rsplit('/').next().filter(|name| !name.is_empty()) {
            Some(name) => (dir.join(name), None),
            None => {
                let name = format!("{}.resS", container.path().file_name().unwrap_or("data"));
                (dir.join(&name), Some(name))
            }
        }
    }
}

impl ReplacementStrategy for AudioStrategy {
    fn kind(&self) -> AssetKind {
        AssetKind::Audio
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

        let info = audio::inspect(raw)?;
        let source = tree.get_str("m_Resource.m_Source")?.to_string();
        let (blob, new_source) = Self::blob_for(ctx.container, &source);

        let stream = ctx.resources.open(&blob)?;
        let (offset, size) = stream.append_aligned(raw, ctx.alignment)?;

        tree.set_int("m_Channels", i64::from(info.channels))?;
        tree.set_int("m_Frequency", i64::from(info.frequency))?;
        tree.set_float("m_Length", info.length_seconds)?;
        tree.set_int("m_CompressionFormat", i64::from(info.format.compression_format()))?;
        set_int_if_present(tree, "m_BitsPerSample", i64::from(info.bits_per_sample))?;
        // Decompress-on-load; streaming clips keep a handle on the old region otherwise.
        set_int_if_present(tree, "m_LoadType", 0)?;
        if let Some(name) = new_source {
            tree.set_string("m_Resource.m_Source", name)?;
        }
        tree.set_uint("m_Resource.m_Offset", offset)?;
        tree.set_uint("m_Resource.m_Size", size)?;

        tracing::info!(
            "Replaced audio clip name={} path_id={} blob={} offset={} size={} channels={} frequency={}",
            target,
            record.path_id,
            blob,
            offset,
            size,
            info.channels,
            info.frequency
        );

        Ok(StrategyOutcome::Replaced(Replacement {
            path_id: record.path_id,
            field_bytes: tree.to_bytes()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tests::fake_ogg;
    use crate::resource::ResourceStreams;
    use crate::strategy::fixtures;
    use std::fs;

    #[test]
    fn test_ogg_into_empty_blob() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(1, fixtures::audio_clip("lobby-theme"))],
        );
        fs::write(root.join("level0.assets.resS"), b"").unwrap();
        let container = fixtures::open(&path);
        let record = container.record(1).unwrap();
        let mut tree = container.fields_of(&record).unwrap();
        let ogg = fake_ogg(2, 44_100, 88_200, 1024);

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 4,
        };
        let outcome = AudioStrategy
            .create_replacement(&record, &mut tree, "lobby-theme", &ogg, &mut ctx)
            .unwrap();
        assert!(matches!(outcome, StrategyOutcome::Replaced(ref r) if r.path_id == 1));

        assert_eq!(tree.get_int("m_Channels").unwrap(), 2);
        assert_eq!(tree.get_int("m_Frequency").unwrap(), 44_100);
        assert_eq!(tree.get_int("m_CompressionFormat").unwrap(), 1);
        assert_eq!(tree.get_int("m_LoadType").unwrap(), 0);
        assert!((tree.get_float("m_Length").unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(tree.get_str("m_Resource.m_Source").unwrap(), "level0.assets.resS");
        assert_eq!(tree.get_uint("m_Resource.m_Offset").unwrap(), 0);
        assert_eq!(tree.get_uint("m_Resource.m_Size").unwrap(), 1024);

        resources.commit_all().unwrap();
        assert_eq!(fs::read(root.join("level0.assets.resS")).unwrap(), ogg);
    }

    #[test]
    fn test_existing_source_is_appended_aligned() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(1, fixtures::audio_clip("hit"))],
        );
        fs::write(root.join("sharedassets0.resource"), [9u8; 10]).unwrap();
        let container = fixtures::open(&path);
        let record = container.record(1).unwrap();
        let mut tree = container.fields_of(&record).unwrap();
        tree.set_string("m_Resource.m_Source", "archive:/CAB-1/sharedassets0.resource")
            .unwrap();

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 16,
        };
        AudioStrategy
            .create_replacement(&record, &mut tree, "hit", &fake_ogg(1, 22_050, 100, 300), &mut ctx)
            .unwrap();

        assert_eq!(tree.get_uint("m_Resource.m_Offset").unwrap(), 16);
        assert_eq!(
            tree.get_str("m_Resource.m_Source").unwrap(),
            "archive:/CAB-1/sharedassets0.resource"
        );
    }

    #[test]
    fn test_name_mismatch_leaves_fields() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(1, fixtures::audio_clip("other"))],
        );
        let container = fixtures::open(&path);
        let record = container.record(1).unwrap();
        let mut tree = container.fields_of(&record).unwrap();
        let before = tree.to_bytes().unwrap();

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 4,
        };
        let outcome = AudioStrategy
            .create_replacement(&record, &mut tree, "lobby-theme", b"garbage", &mut ctx)
            .unwrap();

        assert_eq!(outcome, StrategyOutcome::NoMatch);
        assert_eq!(tree.to_bytes().unwrap(), before);
        assert!(resources.is_empty());
    }

    #[test]
    fn test_unreadable_audio_fails() {
        let (_dir, root) = fixtures::utf8_tempdir();
        let path = fixtures::write_container(
            &root,
            vec![(1, fixtures::audio_clip("bgm"))],
        );
        let container = fixtures::open(&path);
        let record = container.record(1).unwrap();
        let mut tree = container.fields_of(&record).unwrap();

        let mut resources = ResourceStreams::new();
        let mut ctx = StrategyContext {
            container: &container,
            resources: &mut resources,
            alignment: 4,
        };
        assert!(AudioStrategy
            .create_replacement(&record, &mut tree, "bgm", b"not audio", &mut ctx)
            .is_err());
    }
}
