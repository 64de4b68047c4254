use crate::errors::from_patcher;
use crate::println_pad;
use crate::utils::{config::load_config, require_dir};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use unity_mod_patcher::BackupManager;

pub struct PruneArgs {
    pub game_dir: Utf8PathBuf,
    pub config: Option<Utf8PathBuf>,
}

pub fn prune_backups(args: PruneArgs) -> Result<()> {
    require_dir(&args.game_dir)?;
    let config = load_config(args.config.as_deref())?;
    let backups = BackupManager::for_config(&args.game_dir, &config);

    let report = backups.prune_stale().map_err(from_patcher)?;
    for backup in &report.orphaned {
        println_pad!("   {} {} {}", "✗".bright_red(), backup, "(original missing)".dimmed());
    }
    for backup in &report.outdated {
        println_pad!("   {} {} {}", "✗".bright_yellow(), backup, "(original changed)".dimmed());
    }
    println_pad!(
        "{} {} removed, {} kept",
        "🧹 Pruned:".bright_green().bold(),
        report.orphaned.len() + report.outdated.len(),
        report.kept
    );
    Ok(())
}
