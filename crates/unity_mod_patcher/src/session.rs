//! Patch session orchestration.
//!
//! A session walks the install tree once. Before anything is written it prunes
//! stale backups, finds every container and resource blob, and refuses to start if
//! any of them is held open elsewhere. Each container is then processed in turn
//! while replacements remain pending:
//!
//! 1. open and index the records of the classes pending entries can target
//! 2. back the container up
//! 3. run the matching strategy over each candidate record
//! 4. commit touched blobs, then the container, then consume the matched entries
//!
//! Corrupt containers and unknown layouts skip the container. Everything else
//! that fails once a container is being processed aborts the session, and every
//! backup taken so far is restored before the error is returned.

use crate::backup::BackupManager;
use crate::catalog::ReplacementRecord;
use crate::container::{AssetRecord, ContainerFile};
use crate::context::PatchContext;
use crate::error::{Error, Result};
use crate::lock;
use crate::resource::ResourceStreams;
use crate::staging::StagedFile;
use crate::strategy::{strategy_for_class, Replacement, StrategyContext, StrategyOutcome};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fmt;
use unity_assets::FieldTree;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one container was rewritten.
    Patched,
    /// Nothing matched; no file was changed.
    NoOp,
}

/// Summary of a session, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub files_processed: usize,
    pub files_patched: usize,
    pub assets_replaced: usize,
    pub assets_skipped: usize,
    /// Catalog entries no container satisfied.
    pub pending_remaining: usize,
    pub patched_files: Vec<Utf8PathBuf>,
    pub outcome: PatchOutcome,
}

impl Default for PatchReport {
    fn default() -> Self {
        Self {
            files_processed: 0,
            files_patched: 0,
            assets_replaced: 0,
            assets_skipped: 0,
            pending_remaining: 0,
            patched_files: Vec::new(),
            outcome: PatchOutcome::NoOp,
        }
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            PatchOutcome::Patched => write!(
                f,
                "patched {} of {} files processed: {} assets replaced, {} skipped, {} not found",
                self.files_patched,
                self.files_processed,
                self.assets_replaced,
                self.assets_skipped,
                self.pending_remaining
            ),
            PatchOutcome::NoOp => write!(
                f,
                "no replacements applied ({} files processed, {} skipped, {} not found)",
                self.files_processed, self.assets_skipped, self.pending_remaining
            ),
        }
    }
}

/// What happened to the backups after a failed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStatus {
    /// Every touched file is back to its original bytes.
    Recovered,
    /// These files (relative to the install root) could not be restored.
    Partial { locked: Vec<Utf8PathBuf> },
    /// The session failed before anything was mutated.
    NotAttempted,
    /// Recovery itself could not run.
    Failed(String),
}

impl RecoveryStatus {
    pub fn is_recovered(&self) -> bool {
        matches!(self, RecoveryStatus::Recovered | RecoveryStatus::NotAttempted)
    }
}

impl fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStatus::Recovered => f.write_str("all files restored"),
            RecoveryStatus::Partial { locked } => write!(
                f,
                "{} file(s) could not be restored: {}",
                locked.len(),
                locked
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RecoveryStatus::NotAttempted => f.write_str("no files were modified"),
            RecoveryStatus::Failed(reason) => write!(f, "recovery failed: {reason}"),
        }
    }
}

/// A session that did not complete.
#[derive(Debug)]
pub struct SessionFailure {
    pub error: Error,
    pub recovery: RecoveryStatus,
    /// Progress up to the failure.
    pub report: PatchReport,
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.recovery)
    }
}

impl std::error::Error for SessionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Run one patch session over `ctx.game_root`.
///
/// On success all backups are deleted. On failure the returned
/// [`SessionFailure`] says whether the install tree was restored.
pub fn run_session(ctx: &mut PatchContext) -> std::result::Result<PatchReport, SessionFailure> {
    let backups = ctx.backups();
    let mut report = PatchReport::default();
    tracing::info!(
        "Starting patch session game={} mods={} pending={}",
        ctx.game_root,
        ctx.mods_root,
        ctx.catalog.pending_count()
    );

    let containers = match prepare(ctx, &backups) {
        Ok(containers) => containers,
        Err(error) => {
            report.pending_remaining = ctx.catalog.pending_count();
            return Err(SessionFailure {
                error,
                recovery: RecoveryStatus::NotAttempted,
                report,
            });
        }
    };

    for path in &containers {
        if ctx.catalog.pending_count() == 0 {
            break;
        }
        report.files_processed += 1;
        if let Err(error) = patch_container(ctx, &backups, path, &mut report) {
            tracing::warn!("Session aborted path={} error={}", path, error);
            report.pending_remaining = ctx.catalog.pending_count();
            let recovery = recover(&backups, &ctx.game_root);
            return Err(SessionFailure {
                error,
                recovery,
                report,
            });
        }
    }

    if let Err(e) = backups.delete_all() {
        tracing::warn!("Failed to delete backups path={} error={}", backups.backup_root(), e);
    }
    report.pending_remaining = ctx.catalog.pending_count();
    report.outcome = if report.files_patched > 0 {
        PatchOutcome::Patched
    } else {
        PatchOutcome::NoOp
    };
    tracing::info!("Patch session finished: {}", report);
    Ok(report)
}

/// Everything that happens before the first mutation. Returns the containers to visit.
fn prepare(ctx: &PatchContext, backups: &BackupManager) -> Result<Vec<Utf8PathBuf>> {
    if ctx.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let pruned = backups.prune_stale()?;
    if !pruned.orphaned.is_empty() || !pruned.outdated.is_empty() {
        tracing::info!(
            "Pruned stale backups orphaned={} outdated={} kept={}",
            pruned.orphaned.len(),
            pruned.outdated.len(),
            pruned.kept
        );
    }

    let (containers, resources) = enumerate(ctx, backups.backup_root())?;
    let locked = lock::locked_files(containers.iter().chain(resources.iter()));
    if !locked.is_empty() {
        return Err(Error::LockedFile(locked));
    }

    if ctx.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(containers)
}

/// Container and resource files under the install root, sorted, backup tree excluded.
fn enumerate(
    ctx: &PatchContext,
    backup_root: &Utf8Path,
) -> Result<(Vec<Utf8PathBuf>, Vec<Utf8PathBuf>)> {
    let mut containers = Vec::new();
    let mut resources = Vec::new();
    let walker = WalkDir::new(&ctx.game_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.path() != backup_root.as_std_path());
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            tracing::warn!("Skipping non UTF-8 path under {}", ctx.game_root);
            continue;
        };
        if ctx.config.is_container(&path) {
            containers.push(path);
        } else if ctx.config.is_resource(&path) {
            resources.push(path);
        }
    }
    tracing::debug!(
        "Enumerated install tree containers={} resources={}",
        containers.len(),
        resources.len()
    );
    Ok((containers, resources))
}

/// Decoded candidates per class id.
type RecordIndex = BTreeMap<i32, Vec<(AssetRecord, FieldTree)>>;

fn patch_container(
    ctx: &mut PatchContext,
    backups: &BackupManager,
    path: &Utf8Path,
    report: &mut PatchReport,
) -> Result<()> {
    let mut container = match ContainerFile::open(path, ctx.layouts.clone()) {
        Ok(container) => container,
        Err(e) if !e.is_session_fatal() => {
            tracing::warn!("Skipping container path={} error={}", path, e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let pending: Vec<(usize, ReplacementRecord)> = ctx
        .catalog
        .pending()
        .filter(|(_, entry)| {
            entry
                .kind
                .search_classes()
                .into_iter()
                .any(|class| !container.records_of_class(class).is_empty())
        })
        .map(|(index, entry)| (index, entry.clone()))
        .collect();
    if pending.is_empty() {
        tracing::debug!("No candidate records path={}", path);
        return Ok(());
    }

    let mut index = match build_index(&container, &pending) {
        Ok(index) => index,
        Err(e) if !e.is_session_fatal() => {
            tracing::warn!("Skipping container path={} error={}", path, e);
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    backups.backup(path)?;

    let mut resources = ResourceStreams::new();
    let mut consumed = Vec::new();
    for (catalog_index, entry) in &pending {
        let raw = std::fs::read(&entry.source)
            .map_err(|e| Error::from(e).in_strategy(&entry.name))?;
        let outcome = {
            let mut strategy_ctx = StrategyContext {
                container: &container,
                resources: &mut resources,
                alignment: ctx.config.alignment,
            };
            apply_entry(entry, &raw, &mut index, &mut strategy_ctx)
        };
        match outcome {
            Ok(Some(replacement)) => {
                container.attach_replacement(replacement.path_id, replacement.field_bytes)?;
                consumed.push(*catalog_index);
            }
            Ok(None) => {}
            Err(e @ Error::UnsupportedReference { .. }) => {
                tracing::warn!("Skipping asset name={} error={}", entry.name, e);
                report.assets_skipped += 1;
            }
            Err(e) => return Err(e.in_strategy(&entry.name)),
        }
    }

    if consumed.is_empty() {
        tracing::debug!("No records matched path={}", path);
        return Ok(());
    }

    // Blobs first: the container's new offsets must never point past a blob's end.
    for stream in resources.iter() {
        if stream.is_new() {
            backups.record_created(stream.target())?;
        } else {
            backups.backup(stream.target())?;
        }
    }
    resources.commit_all()?;

    let mut staged = StagedFile::new(path)?;
    container.write_to(&mut staged)?;
    staged.commit()?;

    for catalog_index in &consumed {
        ctx.catalog.consume(*catalog_index);
    }
    report.files_patched += 1;
    report.assets_replaced += consumed.len();
    report.patched_files.push(path.to_path_buf());
    tracing::info!(
        "Patched container dst={} replaced={}",
        path,
        container.replacement_count()
    );
    Ok(())
}

/// Decode every record of the classes the pending entries can target.
fn build_index(
    container: &ContainerFile,
    pending: &[(usize, ReplacementRecord)],
) -> Result<RecordIndex> {
    let mut index = RecordIndex::new();
    for (_, entry) in pending {
        for class in entry.kind.search_classes() {
            if index.contains_key(&class) {
                continue;
            }
            let records = container
                .records_of_class(class)
                .into_iter()
                .map(|record| Ok((record, container.fields_of(&record)?)))
                .collect::<Result<Vec<_>>>()?;
            index.insert(class, records);
        }
    }
    Ok(index)
}

/// Try `entry` against its own class, then its fallback class.
///
/// The first record whose strategy reports a replacement wins.
fn apply_entry(
    entry: &ReplacementRecord,
    raw: &[u8],
    index: &mut RecordIndex,
    ctx: &mut StrategyContext<'_>,
) -> Result<Option<Replacement>> {
    for class in entry.kind.search_classes() {
        let (Some(strategy), Some(records)) = (strategy_for_class(class), index.get_mut(&class))
        else {
            continue;
        };
        for (record, tree) in records.iter_mut() {
            match strategy.create_replacement(record, tree, &entry.name, raw, ctx)? {
                StrategyOutcome::Replaced(replacement) => return Ok(Some(replacement)),
                StrategyOutcome::NoMatch => {}
            }
        }
    }
    Ok(None)
}

fn recover(backups: &BackupManager, game_root: &Utf8Path) -> RecoveryStatus {
    match backups.recover_all() {
        Ok(report) if report.is_complete() => RecoveryStatus::Recovered,
        Ok(report) => RecoveryStatus::Partial {
            locked: report
                .failed
                .into_iter()
                .map(|(path, _)| {
                    path.strip_prefix(game_root)
                        .map(Utf8Path::to_path_buf)
                        .unwrap_or(path)
                })
                .collect(),
        },
        Err(e) => {
            tracing::warn!("Recovery failed error={}", e);
            RecoveryStatus::Failed(e.to_string())
        }
    }
}
