//! Container reader/index over [`unity_assets::AssetFile`].
//!
//! A [`ContainerFile`] owns one parsed container for the duration of its
//! processing. Records are enumerated by class, decoded into [`FieldTree`]s on
//! demand, and replacement payloads are attached in memory. [`ContainerFile::write`]
//! serializes to a caller-chosen path; the caller stages and swaps it in.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use unity_assets::{AssetFile, Endian, FieldTree, LayoutDatabase, TypeTree};

/// One object in a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRecord {
    pub path_id: i64,
    pub class_id: i32,
    pub byte_size: usize,
}

pub struct ContainerFile {
    path: Utf8PathBuf,
    file: AssetFile,
    layouts: Arc<dyn LayoutDatabase>,
    replacements: HashMap<i64, Vec<u8>>,
}

impl std::fmt::Debug for ContainerFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerFile")
            .field("path", &self.path)
            .field("unity_version", &self.file.unity_version())
            .field("objects", &self.file.objects().len())
            .field("replacements", &self.replacements.len())
            .finish()
    }
}

impl ContainerFile {
    /// Read and parse a container.
    ///
    /// Unreadable headers or metadata, and objects whose payload lies outside the
    /// file, yield [`Error::CorruptContainer`].
    pub fn open(path: &Utf8Path, layouts: Arc<dyn LayoutDatabase>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file = AssetFile::from_bytes(bytes).map_err(|source| Error::CorruptContainer {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(
            "Opened container path={} unity={} objects={}",
            path,
            file.unity_version(),
            file.objects().len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            file,
            layouts,
            replacements: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn unity_version(&self) -> String {
        self.file.unity_version()
    }

    pub fn records(&self) -> impl Iterator<Item = AssetRecord> + '_ {
        self.file.objects().iter().map(|o| AssetRecord {
            path_id: o.path_id,
            class_id: o.class_id,
            byte_size: o.byte_size(),
        })
    }

    /// All records of a class, in object table order. Empty when none exist.
    pub fn records_of_class(&self, class_id: i32) -> Vec<AssetRecord> {
        self.records().filter(|r| r.class_id == class_id).collect()
    }

    pub fn record(&self, path_id: i64) -> Option<AssetRecord> {
        self.records().find(|r| r.path_id == path_id)
    }

    /// The layout of a record: embedded type tree first, then the layout database.
    pub fn layout_for(&self, record: &AssetRecord) -> Result<Arc<TypeTree>> {
        match self.file.layout_for(self.layouts.as_ref(), record.path_id) {
            Ok(layout) => Ok(Arc::new(layout)),
            Err(unity_assets::Error::ObjectNotFound(path_id)) => {
                Err(unity_assets::Error::ObjectNotFound(path_id).into())
            }
            Err(e) => Err(self.unknown_layout(record.class_id, e.to_string())),
        }
    }

    fn unknown_layout(&self, class_id: i32, reason: impl Into<String>) -> Error {
        Error::UnknownLayout {
            path: self.path.clone(),
            unity_version: self.file.unity_version(),
            class_id,
            reason: reason.into(),
        }
    }

    /// Decode a record's fields, from its attached replacement if it has one.
    ///
    /// Payloads are read little-endian. A layout that does not fit the record's
    /// bytes is reported as [`Error::UnknownLayout`].
    pub fn fields_of(&self, record: &AssetRecord) -> Result<FieldTree> {
        let layout = self.layout_for(record)?;
        let data = match self.replacements.get(&record.path_id) {
            Some(bytes) => bytes.as_slice(),
            None => self.file.object_data(record.path_id)?,
        };
        FieldTree::decode(layout, data, Endian::Little)
            .map_err(|e| self.unknown_layout(record.class_id, e.to_string()))
    }

    /// Serialize `record` from `bytes` on the next write.
    pub fn attach_replacement(&mut self, path_id: i64, bytes: Vec<u8>) -> Result<()> {
        if self.file.object(path_id).is_none() {
            return Err(unity_assets::Error::ObjectNotFound(path_id).into());
        }
        self.replacements.insert(path_id, bytes);
        Ok(())
    }

    pub fn replacement(&self, path_id: i64) -> Option<&[u8]> {
        self.replacements.get(&path_id).map(Vec::as_slice)
    }

    pub fn replacement_count(&self) -> usize {
        self.replacements.len()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.file.to_bytes(&self.replacements)?)?;
        Ok(())
    }

    /// Write the full container to `out_path`. Never renames over the original.
    pub fn write(&self, out_path: &Utf8Path) -> Result<()> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(out_path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }
}
