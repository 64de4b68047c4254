//! Backup tree guarding every file a session touches.
//!
//! Backups mirror the install tree's relative paths under a sibling backup root
//! named after the install directory.
//! The first backup of a path is authoritative: later calls never overwrite it, so
//! a file touched twice keeps its pristine bytes. Resource blobs a session creates
//! have nothing to restore and are listed in a manifest instead, so recovery can
//! delete them.

use crate::config::PatcherConfig;
use crate::error::{Error, Result};
use crate::staging::StagedFile;
use camino::{Utf8Path, Utf8PathBuf};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use walkdir::WalkDir;

/// Manifest of files created (not modified) by a session, relative to the install root.
pub const CREATED_MANIFEST: &str = ".created.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CreatedManifest {
    files: BTreeSet<Utf8PathBuf>,
}

/// Outcome of [`BackupManager::recover_all`].
#[derive(Debug, Default)]
pub struct RecoveryReport {
    /// Originals restored from their backup.
    pub restored: Vec<Utf8PathBuf>,
    /// Session-created files that were deleted.
    pub deleted_created: Vec<Utf8PathBuf>,
    /// Originals that could not be restored, with the reason.
    pub failed: Vec<(Utf8PathBuf, String)>,
}

impl RecoveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of [`BackupManager::prune_stale`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Backups whose original no longer exists.
    pub orphaned: Vec<Utf8PathBuf>,
    /// Backups whose original changed size or modification time since.
    pub outdated: Vec<Utf8PathBuf>,
    /// Backups still describing their original.
    pub kept: usize,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    install_root: Utf8PathBuf,
    backup_root: Utf8PathBuf,
}

impl BackupManager {
    pub fn new(install_root: impl Into<Utf8PathBuf>, backup_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            backup_root: backup_root.into(),
        }
    }

    /// Backups for `install_root` in `<parent>/<backup_dir_name>/<install dir name>`.
    ///
    /// Installs sharing a parent share `<backup_dir_name>` but never a backup tree.
    /// An install root without a parent keeps its backups inside itself.
    pub fn for_config(install_root: &Utf8Path, config: &PatcherConfig) -> Self {
        let backup_root = match (install_root.parent(), install_root.file_name()) {
            (Some(parent), Some(name)) if !parent.as_str().is_empty() => {
                parent.join(&config.backup_dir_name).join(name)
            }
            _ => install_root.join(&config.backup_dir_name),
        };
        Self::new(install_root, backup_root)
    }

    pub fn install_root(&self) -> &Utf8Path {
        &self.install_root
    }

    pub fn backup_root(&self) -> &Utf8Path {
        &self.backup_root
    }

    fn relative<'a>(&self, file: &'a Utf8Path) -> io::Result<&'a Utf8Path> {
        file.strip_prefix(&self.install_root).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is outside the install root {}", file, self.install_root),
            )
        })
    }

    /// Where the backup of `file` lives.
    pub fn backup_path_for(&self, file: &Utf8Path) -> Result<Utf8PathBuf> {
        let relative = self.relative(file).map_err(|source| Error::BackupFailure {
            path: file.to_path_buf(),
            source,
        })?;
        Ok(self.backup_root.join(relative))
    }

    pub fn has_backup(&self, file: &Utf8Path) -> bool {
        self.backup_path_for(file).is_ok_and(|p| p.is_file())
    }

    /// Copy `file` into the backup tree unless a backup already exists.
    ///
    /// Returns the new backup's path, or `None` when an existing backup was kept.
    pub fn backup(&self, file: &Utf8Path) -> Result<Option<Utf8PathBuf>> {
        let backup = self.backup_path_for(file)?;
        if backup.is_file() {
            tracing::debug!("Backup already exists, keeping it path={}", backup);
            return Ok(None);
        }
        copy_preserving_mtime(file, &backup).map_err(|source| Error::BackupFailure {
            path: file.to_path_buf(),
            source,
        })?;
        tracing::info!("Backed up file src={} dst={}", file, backup);
        Ok(Some(backup))
    }

    /// Note that `file` did not exist before this session.
    pub fn record_created(&self, file: &Utf8Path) -> Result<()> {
        let relative = self
            .relative(file)
            .map_err(|source| Error::BackupFailure {
                path: file.to_path_buf(),
                source,
            })?
            .to_path_buf();
        let mut manifest = self.read_manifest()?;
        if manifest.files.insert(relative) {
            self.write_manifest(&manifest)?;
            tracing::debug!("Recorded created file path={}", file);
        }
        Ok(())
    }

    fn manifest_path(&self) -> Utf8PathBuf {
        self.backup_root.join(CREATED_MANIFEST)
    }

    fn read_manifest(&self) -> Result<CreatedManifest> {
        match fs::read(self.manifest_path()) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CreatedManifest::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_manifest(&self, manifest: &CreatedManifest) -> Result<()> {
        let path = self.manifest_path();
        let mut staged = StagedFile::new(&path)?;
        serde_json::to_writer_pretty(&mut staged, manifest)?;
        staged.commit()
    }

    /// Every `(backup, original)` pair in the backup tree.
    pub fn entries(&self) -> Result<Vec<(Utf8PathBuf, Utf8PathBuf)>> {
        if !self.backup_root.is_dir() {
            return Ok(Vec::new());
        }
        let manifest = self.manifest_path();
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.backup_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(backup) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
                tracing::warn!("Skipping non UTF-8 path under {}", self.backup_root);
                continue;
            };
            // Staged temp files left by an interrupted write.
            if backup == manifest || backup.file_name().is_some_and(|n| n.starts_with(".tmp")) {
                continue;
            }
            let Ok(relative) = backup.strip_prefix(&self.backup_root) else {
                continue;
            };
            let original = self.install_root.join(relative);
            entries.push((backup, original));
        }
        Ok(entries)
    }

    /// Restore every backed-up original and delete every session-created file.
    ///
    /// Fails with [`Error::RecoveryInconsistency`] before touching anything when a
    /// backup has no original. Individual restore failures are collected rather
    /// than aborting, and the backup tree is removed only if all succeeded.
    pub fn recover_all(&self) -> Result<RecoveryReport> {
        let entries = self.entries()?;
        if let Some((backup, original)) = entries.iter().find(|(_, original)| !original.exists()) {
            return Err(Error::RecoveryInconsistency {
                backup: backup.clone(),
                original: original.clone(),
            });
        }
        let manifest = self.read_manifest()?;

        let mut report = RecoveryReport::default();
        for (backup, original) in entries {
            match copy_preserving_mtime(&backup, &original).and_then(|()| fs::remove_file(&backup))
            {
                Ok(()) => {
                    tracing::info!("Restored file src={} dst={}", backup, original);
                    report.restored.push(original);
                }
                Err(e) => {
                    tracing::warn!("Failed to restore file path={} error={}", original, e);
                    report.failed.push((original, e.to_string()));
                }
            }
        }

        for relative in manifest.files {
            let created = self.install_root.join(&relative);
            match fs::remove_file(&created) {
                Ok(()) => {
                    tracing::info!("Deleted created file path={}", created);
                    report.deleted_created.push(created);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to delete created file path={} error={}", created, e);
                    report.failed.push((created, e.to_string()));
                }
            }
        }

        if report.is_complete() {
            self.delete_all()?;
        }
        tracing::info!(
            "Recovery finished restored={} deleted={} failed={}",
            report.restored.len(),
            report.deleted_created.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Remove the whole backup tree.
    pub fn delete_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.backup_root) {
            Ok(()) => {
                tracing::debug!("Deleted backup tree path={}", self.backup_root);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop backups that no longer describe their original.
    pub fn prune_stale(&self) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        for (backup, original) in self.entries()? {
            let original_meta = match fs::metadata(&original) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    fs::remove_file(&backup)?;
                    tracing::info!("Pruned orphaned backup path={}", backup);
                    report.orphaned.push(backup);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let backup_meta = fs::metadata(&backup)?;
            let same_size = original_meta.len() == backup_meta.len();
            let same_mtime = FileTime::from_last_modification_time(&original_meta)
                == FileTime::from_last_modification_time(&backup_meta);
            if same_size && same_mtime {
                report.kept += 1;
            } else {
                fs::remove_file(&backup)?;
                tracing::info!("Pruned outdated backup path={}", backup);
                report.outdated.push(backup);
            }
        }

        let mut manifest = self.read_manifest()?;
        let before = manifest.files.len();
        manifest
            .files
            .retain(|relative| self.install_root.join(relative).is_file());
        if manifest.files.len() != before {
            if manifest.files.is_empty() {
                fs::remove_file(self.manifest_path())?;
            } else {
                self.write_manifest(&manifest)?;
            }
        }

        if report.kept == 0 && manifest.files.is_empty() {
            self.delete_all()?;
        } else {
            remove_empty_dirs(&self.backup_root)?;
        }
        Ok(report)
    }
}

/// Copy `src` over `dst` atomically, carrying over the modification time.
fn copy_preserving_mtime(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    let mtime = FileTime::from_last_modification_time(&fs::metadata(src)?);
    let mut staged = StagedFile::new(dst).map_err(into_io)?;
    io::copy(&mut File::open(src)?, staged.file())?;
    staged.commit().map_err(into_io)?;
    filetime::set_file_mtime(dst, mtime)
}

fn into_io(error: Error) -> io::Error {
    match error {
        Error::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

/// Remove empty directories below `root`, deepest first.
fn remove_empty_dirs(root: &Utf8Path) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(root).min_depth(1).contents_first(true) {
        let entry = entry?;
        if entry.file_type().is_dir() && fs::read_dir(entry.path())?.next().is_none() {
            fs::remove_dir(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        game: Utf8PathBuf,
        manager: BackupManager,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let game = root.join("Game");
        fs::create_dir_all(game.join("Data")).unwrap();
        let manager = BackupManager::for_config(&game, &PatcherConfig::default());
        Fixture {
            _dir: dir,
            game,
            manager,
        }
    }

    #[test]
    fn test_backup_root_is_sibling() {
        let f = fixture();
        assert_eq!(
            f.manager.backup_root(),
            f.game.parent().unwrap().join("Backups/Game")
        );
    }

    #[test]
    fn test_sibling_installs_keep_separate_backups() {
        let f = fixture();
        let other_game = f.game.parent().unwrap().join("OtherGame");
        fs::create_dir_all(other_game.join("Data")).unwrap();
        let other = BackupManager::for_config(&other_game, &PatcherConfig::default());
        assert_ne!(other.backup_root(), f.manager.backup_root());

        let mine = f.game.join("Data/level0.assets");
        let theirs = other_game.join("Data/level0.assets");
        fs::write(&mine, b"mine").unwrap();
        fs::write(&theirs, b"theirs").unwrap();
        f.manager.backup(&mine).unwrap();
        other.backup(&theirs).unwrap();

        // Neither original exists under the other install, so a shared tree would
        // see the other install's backups as orphans.
        let report = f.manager.prune_stale().unwrap();
        assert!(report.orphaned.is_empty());
        assert_eq!(report.kept, 1);
        assert!(other.has_backup(&theirs));

        f.manager.delete_all().unwrap();
        assert!(other.has_backup(&theirs));
        assert_eq!(other.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_backup_is_never_overwritten() {
        let f = fixture();
        let file = f.game.join("Data/level0.assets");
        fs::write(&file, b"pristine").unwrap();

        let first = f.manager.backup(&file).unwrap();
        assert_eq!(first, Some(f.manager.backup_root().join("Data/level0.assets")));

        fs::write(&file, b"patched once").unwrap();
        assert_eq!(f.manager.backup(&file).unwrap(), None);
        assert_eq!(fs::read(first.unwrap()).unwrap(), b"pristine");
    }

    #[test]
    fn test_backup_outside_root_fails() {
        let f = fixture();
        let outside = f.game.parent().unwrap().join("elsewhere.assets");
        fs::write(&outside, b"x").unwrap();
        assert!(matches!(
            f.manager.backup(&outside),
            Err(Error::BackupFailure { .. })
        ));
    }

    #[test]
    fn test_recover_restores_and_cleans_up() {
        let f = fixture();
        let file = f.game.join("Data/level0.assets");
        let blob = f.game.join("Data/level0.assets.resS");
        fs::write(&file, b"pristine").unwrap();
        f.manager.backup(&file).unwrap();
        fs::write(&file, b"half patched").unwrap();
        fs::write(&blob, b"new blob").unwrap();
        f.manager.record_created(&blob).unwrap();

        let report = f.manager.recover_all().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.restored, vec![file.clone()]);
        assert_eq!(report.deleted_created, vec![blob.clone()]);
        assert_eq!(fs::read(&file).unwrap(), b"pristine");
        assert!(!blob.exists());
        assert!(!f.manager.backup_root().exists());
    }

    #[test]
    fn test_recover_with_locked_files_keeps_tree() {
        let f = fixture();
        let names = ["a.assets", "b.assets", "c.assets"];
        for name in names {
            let file = f.game.join("Data").join(name);
            fs::write(&file, name.as_bytes()).unwrap();
            f.manager.backup(&file).unwrap();
            fs::write(&file, b"patched").unwrap();
        }
        // An original that cannot be replaced stands in for one held open elsewhere.
        let locked = f.game.join("Data/b.assets");
        fs::remove_file(&locked).unwrap();
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("keep"), b"").unwrap();

        let report = f.manager.recover_all().unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.restored.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, locked);
        assert_eq!(fs::read(f.game.join("Data/a.assets")).unwrap(), b"a.assets");
        assert!(f.manager.backup_root().join("Data/b.assets").is_file());
    }

    #[test]
    fn test_recover_missing_original_is_inconsistent() {
        let f = fixture();
        let file = f.game.join("Data/level0.assets");
        fs::write(&file, b"pristine").unwrap();
        f.manager.backup(&file).unwrap();
        fs::remove_file(&file).unwrap();

        assert!(matches!(
            f.manager.recover_all(),
            Err(Error::RecoveryInconsistency { .. })
        ));
        assert!(f.manager.backup_root().join("Data/level0.assets").is_file());
    }

    #[test]
    fn test_prune_stale() {
        let f = fixture();
        let kept = f.game.join("Data/kept.assets");
        let orphan = f.game.join("Data/gone/orphan.assets");
        let changed = f.game.join("Data/changed.assets");
        fs::create_dir_all(orphan.parent().unwrap()).unwrap();
        for file in [&kept, &orphan, &changed] {
            fs::write(file, b"original").unwrap();
            f.manager.backup(file).unwrap();
        }
        fs::remove_file(&orphan).unwrap();
        fs::write(&changed, b"updated by the launcher").unwrap();

        let report = f.manager.prune_stale().unwrap();
        assert_eq!(report.kept, 1);
        assert_eq!(report.orphaned.len(), 1);
        assert_eq!(report.outdated.len(), 1);
        assert!(!f.manager.backup_root().join("Data/gone").exists());
        assert!(f.manager.has_backup(&kept));
    }

    #[test]
    fn test_prune_removes_empty_tree() {
        let f = fixture();
        let file = f.game.join("Data/level0.assets");
        fs::write(&file, b"original").unwrap();
        f.manager.backup(&file).unwrap();
        fs::write(&file, b"something else entirely").unwrap();

        f.manager.prune_stale().unwrap();
        assert!(!f.manager.backup_root().exists());
    }
}
