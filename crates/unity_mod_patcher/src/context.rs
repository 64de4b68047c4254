//! Everything one patch session needs, passed explicitly.

use crate::backup::BackupManager;
use crate::catalog::Catalog;
use crate::config::PatcherConfig;
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unity_assets::{embedded_layouts, LayoutDatabase};

/// Install root, mod catalog snapshot, configuration and layouts for one session.
///
/// The catalog is scanned once when the context is built; the session consumes
/// entries from it as containers commit.
pub struct PatchContext {
    pub game_root: Utf8PathBuf,
    pub mods_root: Utf8PathBuf,
    pub catalog: Catalog,
    pub config: PatcherConfig,
    pub layouts: Arc<dyn LayoutDatabase>,
    cancel: Arc<AtomicBool>,
}

impl std::fmt::Debug for PatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchContext")
            .field("game_root", &self.game_root)
            .field("mods_root", &self.mods_root)
            .field("pending", &self.catalog.pending_count())
            .field("config", &self.config)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl PatchContext {
    /// Scan `mods_root`. Layouts come from the bundled type tree database.
    pub fn new(game_root: &Utf8Path, mods_root: &Utf8Path, config: PatcherConfig) -> Result<Self> {
        let catalog = Catalog::load(mods_root, &config.replacement_prefix)?;
        Ok(Self::with_catalog(game_root, catalog, config))
    }

    /// A context around an already-built catalog.
    pub fn with_catalog(game_root: &Utf8Path, catalog: Catalog, config: PatcherConfig) -> Self {
        Self {
            game_root: game_root.to_path_buf(),
            mods_root: catalog.root().to_path_buf(),
            catalog,
            config,
            layouts: embedded_layouts(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the layout source, e.g. with [`unity_assets::StaticLayouts`] for
    /// classes the bundled database lacks.
    pub fn with_layouts(mut self, layouts: Arc<dyn LayoutDatabase>) -> Self {
        self.layouts = layouts;
        self
    }

    /// A flag another thread can set to cancel the session before it mutates anything.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::for_config(&self.game_root, &self.config)
    }

    pub fn backup_root(&self) -> Utf8PathBuf {
        self.backups().backup_root().to_path_buf()
    }
}
