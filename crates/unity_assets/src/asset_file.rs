//! A serialized file opened through `rabex`, with checked access to object payloads.

use crate::error::{Error, Result};
use crate::field::FieldTree;
use crate::layout::LayoutDatabase;
use crate::typetree::TypeTree;
use crate::Endian;
use camino::Utf8Path;
use rabex::files::serializedfile::build_common_offset_map;
use rabex::files::serializedfile::builder::SerializedFileBuilder;
use rabex::files::SerializedFile;
use rabex::typetree::typetree_cache::sync::TypeTreeCache;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Cursor;
use std::ops::Range;
use std::sync::Arc;

/// One object of an [`AssetFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub path_id: i64,
    pub class_id: i32,
    range: Range<usize>,
}

impl ObjectEntry {
    pub fn byte_size(&self) -> usize {
        self.range.len()
    }
}

/// A parsed `.assets` file and the bytes it was read from.
pub struct AssetFile {
    file: SerializedFile,
    data: Vec<u8>,
    objects: Vec<ObjectEntry>,
}

impl std::fmt::Debug for AssetFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetFile")
            .field("unity_version", &self.unity_version())
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl AssetFile {
    /// Parse a serialized file.
    ///
    /// Every object's payload range is validated here, so later reads never index
    /// outside `data`.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let file = SerializedFile::from_reader(&mut Cursor::new(data.as_slice()))
            .map_err(Error::container)?;

        let data_offset = to_u64(file.m_Header.m_DataOffset, "data offset")?;
        let mut objects = Vec::new();
        for object in file.objects() {
            let path_id = object.m_PathID;
            let start = to_u64(object.m_ByteStart, "byte start")?;
            let size = to_u64(object.m_ByteSize, "byte size")?;
            let range = data_offset
                .checked_add(start)
                .and_then(|start| Some(start..start.checked_add(size)?))
                .filter(|range| range.end <= data.len() as u64)
                .ok_or_else(|| {
                    Error::malformed(format!(
                        "object {path_id} at {data_offset}+{start} ({size} bytes) lies outside the {}-byte file",
                        data.len()
                    ))
                })?;
            objects.push(ObjectEntry {
                path_id,
                class_id: object.m_ClassID.clone() as i32,
                range: range.start as usize..range.end as usize,
            });
        }

        Ok(Self {
            file,
            data,
            objects,
        })
    }

    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self> {
        Self::from_bytes(std::fs::read(path.as_ref())?)
    }

    pub fn unity_version(&self) -> String {
        self.file
            .m_UnityVersion
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn objects(&self) -> &[ObjectEntry] {
        &self.objects
    }

    pub fn object(&self, path_id: i64) -> Option<&ObjectEntry> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }

    pub fn object_data(&self, path_id: i64) -> Result<&[u8]> {
        let object = self.object(path_id).ok_or(Error::ObjectNotFound(path_id))?;
        Ok(&self.data[object.range.clone()])
    }

    pub fn layout_for(&self, layouts: &dyn LayoutDatabase, path_id: i64) -> Result<TypeTree> {
        layouts.layout_for(&self.file, path_id)
    }

    /// Decode object `path_id` with `layout`.
    ///
    /// Object payloads are read little-endian.
    pub fn decode(&self, layout: Arc<TypeTree>, path_id: i64) -> Result<FieldTree> {
        FieldTree::decode(layout, self.object_data(path_id)?, Endian::Little)
    }

    /// Serialize the file with the payloads in `replacements` substituted by path id.
    pub fn to_bytes(&self, replacements: &HashMap<i64, Vec<u8>>) -> Result<Vec<u8>> {
        let version = self
            .file
            .m_UnityVersion
            .as_ref()
            .ok_or_else(|| Error::malformed("serialized file has no Unity version"))?;
        let tpk = TypeTreeCache::embedded();
        let com = build_common_offset_map(&tpk.inner, version);
        let mut builder = SerializedFileBuilder::from_serialized(
            version,
            &self.file,
            &self.data,
            &tpk,
            &com,
            self.file.objects().cloned(),
        );
        for (&path_id, bytes) in replacements {
            let object = builder
                .objects
                .get_mut(&path_id)
                .ok_or(Error::ObjectNotFound(path_id))?;
            object.1 = Cow::Owned(bytes.clone());
        }
        builder.write_vec().map_err(Error::container)
    }

    pub fn write_to(
        &self,
        path: impl AsRef<Utf8Path>,
        replacements: &HashMap<i64, Vec<u8>>,
    ) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes(replacements)?)?;
        Ok(())
    }
}

fn to_u64<T: TryInto<u64>>(value: T, what: &str) -> Result<u64> {
    value
        .try_into()
        .map_err(|_| Error::malformed(format!("negative {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::StaticLayouts;
    use crate::typetree::TypeTreeBuilder;
    use rabex::objects::{ClassId, ClassIdType};
    use rabex::UnityVersion;
    use serde::Serialize;
    use std::str::FromStr;

    const MARKER_PATH_ID: i64 = 0x0123_4567_89ab_cdef;

    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Clip {
        m_Name: String,
        m_Channels: i32,
    }

    impl ClassIdType for Clip {
        const CLASS_ID: ClassId = ClassId::AudioClip;
    }

    fn clip_layout() -> TypeTree {
        TypeTreeBuilder::new("AudioClip")
            .string("m_Name")
            .field("int", "m_Channels")
            .build()
            .unwrap()
    }

    fn sample_bytes() -> Vec<u8> {
        let version = UnityVersion::from_str("2019.4.40f1").unwrap();
        let layouts = StaticLayouts::new().with(ClassId::AudioClip, &clip_layout());
        let com = build_common_offset_map(&TypeTreeCache::embedded().inner, &version);
        let mut builder = SerializedFileBuilder::new(&version, &layouts, &com, true);
        for (path_id, name) in [(3, "lobby-theme"), (MARKER_PATH_ID, "victory")] {
            builder
                .add_object_at(
                    path_id,
                    &Clip {
                        m_Name: name.to_string(),
                        m_Channels: 2,
                    },
                )
                .unwrap();
        }
        builder.write_vec().unwrap()
    }

    #[test]
    fn test_open_lists_objects() {
        let file = AssetFile::from_bytes(sample_bytes()).unwrap();
        assert_eq!(file.unity_version(), "2019.4.40f1");

        let ids: Vec<i64> = file.objects().iter().map(|o| o.path_id).collect();
        assert!(ids.contains(&3));
        assert!(ids.contains(&MARKER_PATH_ID));
        assert!(file.objects().iter().all(|o| o.class_id == 83));
        assert!(matches!(file.object_data(99), Err(Error::ObjectNotFound(99))));
    }

    #[test]
    fn test_replace_object_and_reopen() {
        let file = AssetFile::from_bytes(sample_bytes()).unwrap();
        let layouts = StaticLayouts::new();
        let layout = Arc::new(file.layout_for(&layouts, 3).unwrap());

        let mut tree = file.decode(layout.clone(), 3).unwrap();
        assert_eq!(tree.get_str("m_Name").unwrap(), "lobby-theme");
        tree.set_int("m_Channels", 1).unwrap();

        let replacements = HashMap::from([(3, tree.to_bytes().unwrap())]);
        let reopened = AssetFile::from_bytes(file.to_bytes(&replacements).unwrap()).unwrap();

        let patched = reopened.decode(layout.clone(), 3).unwrap();
        assert_eq!(patched.get_int("m_Channels").unwrap(), 1);
        let untouched = reopened.decode(layout, MARKER_PATH_ID).unwrap();
        assert_eq!(untouched.get_str("m_Name").unwrap(), "victory");
        assert_eq!(untouched.get_int("m_Channels").unwrap(), 2);
    }

    #[test]
    fn test_replacing_unknown_object_fails() {
        let file = AssetFile::from_bytes(sample_bytes()).unwrap();
        let replacements = HashMap::from([(42, vec![0u8; 4])]);
        assert!(matches!(
            file.to_bytes(&replacements),
            Err(Error::ObjectNotFound(42))
        ));
    }

    #[test]
    fn test_out_of_range_object_is_an_error() {
        let mut bytes = sample_bytes();
        let marker = MARKER_PATH_ID.to_le_bytes();
        let at = bytes
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len();
        // Byte start directly follows the path id in the object table.
        bytes[at..at + 8].copy_from_slice(&(u64::MAX - 100).to_le_bytes());

        assert!(AssetFile::from_bytes(bytes).is_err());
    }
}
