use crate::errors::{from_patcher, CliError};
use crate::println_pad;
use crate::utils::{config::load_config, require_dir};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use unity_mod_patcher::BackupManager;

pub struct RecoverArgs {
    pub game_dir: Utf8PathBuf,
    pub config: Option<Utf8PathBuf>,
}

pub fn recover_game(args: RecoverArgs) -> Result<()> {
    require_dir(&args.game_dir)?;
    let config = load_config(args.config.as_deref())?;
    let backups = BackupManager::for_config(&args.game_dir, &config);

    if !backups.backup_root().exists() {
        println_pad!(
            "{} {}",
            "ℹ️  No backups at".bright_yellow(),
            backups.backup_root().as_str().bright_white()
        );
        return Ok(());
    }

    let report = backups.recover_all().map_err(from_patcher)?;
    for file in &report.restored {
        println_pad!("   {} {}", "↩".bright_green(), file);
    }
    for file in &report.deleted_created {
        println_pad!("   {} {}", "✗".bright_cyan(), file);
    }
    if !report.is_complete() {
        return Err(CliError::RecoveryIncomplete {
            paths: report.failed.into_iter().map(|(path, _)| path).collect(),
        }
        .into());
    }

    println_pad!(
        "{} {} restored, {} removed",
        "✅ Recovered:".bright_green().bold(),
        report.restored.len(),
        report.deleted_created.len()
    );
    Ok(())
}
