//! Pre-flight detection of files held by another process.

use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io;

/// Whether `path` cannot be opened for exclusive writing right now.
///
/// Missing files are not locked.
pub fn is_locked(path: &Utf8Path) -> bool {
    let file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
        Err(e) => {
            tracing::debug!("Cannot open for writing path={} error={}", path, e);
            return true;
        }
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = FileExt::unlock(&file);
            false
        }
        Err(e) => {
            tracing::debug!("Exclusive lock refused path={} error={}", path, e);
            true
        }
    }
}

/// The subset of `paths` that [`is_locked`].
pub fn locked_files<'a>(paths: impl IntoIterator<Item = &'a Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    paths
        .into_iter()
        .filter(|p| is_locked(p))
        .cloned()
        .collect()
}
