//! Atomic file replacement: tempfile + fsync + rename.

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// New contents for `target`, written next to it and swapped in by [`commit`].
///
/// Dropping a staged file without committing deletes the temp file and leaves the
/// target untouched.
///
/// [`commit`]: StagedFile::commit
#[derive(Debug)]
pub struct StagedFile {
    target: Utf8PathBuf,
    temp: NamedTempFile,
}

impl StagedFile {
    pub fn new(target: &Utf8Path) -> Result<Self> {
        // Same directory so the final rename never crosses filesystems.
        let parent = match target.parent() {
            Some(p) if !p.as_str().is_empty() => p,
            _ => Utf8Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let temp = NamedTempFile::new_in(parent)?;
        Ok(Self {
            target: target.to_path_buf(),
            temp,
        })
    }

    pub fn target(&self) -> &Utf8Path {
        &self.target
    }

    /// Location of the temp file while staged.
    pub fn temp_path(&self) -> &std::path::Path {
        self.temp.path()
    }

    pub fn file(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Flush to disk and rename over the target.
    pub fn commit(self) -> Result<()> {
        self.temp.as_file().sync_all()?;
        self.temp
            .persist(self.target.as_std_path())
            .map_err(|e| e.error)?;
        tracing::debug!("Committed staged file target={}", self.target);
        Ok(())
    }
}

impl Write for StagedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}
