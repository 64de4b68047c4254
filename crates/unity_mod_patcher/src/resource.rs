//! Resource blob writer.
//!
//! Payloads that do not live inside a container (audio data) go into a companion
//! `.resS` blob addressed by `(offset, size)` fields in the object. During a session
//! each blob is staged as a copy of its current contents; appends go to the copy
//! and the copy replaces the real blob only on [`ResourceStream::commit`]. Existing
//! bytes are never moved, so offsets already stored in other objects stay valid.

use crate::error::Result;
use crate::staging::StagedFile;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};

/// Staged, append-only view of one resource blob.
#[derive(Debug)]
pub struct ResourceStream {
    staged: StagedFile,
    len: u64,
    created: bool,
}

impl ResourceStream {
    /// Stage `target`, copying its current contents when it exists.
    pub fn open(target: &Utf8Path) -> Result<Self> {
        let mut staged = StagedFile::new(target)?;
        let (len, created) = match File::open(target) {
            Ok(mut existing) => (io::copy(&mut existing, staged.file())?, false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (0, true),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            "Opened resource stream path={} len={} created={}",
            target,
            len,
            created
        );
        Ok(Self {
            staged,
            len,
            created,
        })
    }

    pub fn target(&self) -> &Utf8Path {
        self.staged.target()
    }

    /// Whether the blob did not exist before this session.
    pub fn is_new(&self) -> bool {
        self.created
    }

    /// Current length; the base offset before alignment padding.
    pub fn current_offset(&self) -> u64 {
        self.len
    }

    /// Append `bytes` at the next multiple of `alignment`, zero-filling the gap.
    ///
    /// Returns the padded offset and the exact payload length.
    pub fn append_aligned(&mut self, bytes: &[u8], alignment: u64) -> Result<(u64, u64)> {
        let alignment = alignment.max(1);
        let offset = self.len.div_ceil(alignment) * alignment;
        let padding = (offset - self.len) as usize;

        let file = self.staged.file();
        file.seek(SeekFrom::Start(self.len))?;
        file.write_all(&vec![0u8; padding])?;
        file.write_all(bytes)?;
        file.flush()?;

        self.len = offset + bytes.len() as u64;
        Ok((offset, bytes.len() as u64))
    }

    /// Swap the staged blob into place.
    pub fn commit(self) -> Result<()> {
        let len = self.len;
        let target = self.target().to_path_buf();
        self.staged.commit()?;
        tracing::info!("Committed resource blob path={} len={}", target, len);
        Ok(())
    }
}

/// The resource streams a container touched, keyed by blob path.
#[derive(Debug, Default)]
pub struct ResourceStreams {
    streams: BTreeMap<Utf8PathBuf, ResourceStream>,
}

impl ResourceStreams {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stream for `target`, staging it on first use.
    pub fn open(&mut self, target: &Utf8Path) -> Result<&mut ResourceStream> {
        match self.streams.entry(target.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(ResourceStream::open(target)?)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceStream> {
        self.streams.values()
    }

    /// Commit every stream; stops at the first failure.
    pub fn commit_all(self) -> Result<()> {
        for stream in self.streams.into_values() {
            stream.commit()?;
        }
        Ok(())
    }
}
