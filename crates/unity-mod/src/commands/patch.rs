use crate::errors::{from_patcher, CliError};
use crate::println_pad;
use crate::utils::{config::load_config, require_dir};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;
use unity_mod_patcher::{run_session, PatchContext, PatchOutcome, RecoveryStatus, SessionFailure};

pub struct PatchArgs {
    pub game_dir: Utf8PathBuf,
    pub mods_dir: Utf8PathBuf,
    pub config: Option<Utf8PathBuf>,
}

pub fn patch_game(args: PatchArgs) -> Result<()> {
    require_dir(&args.game_dir)?;
    require_dir(&args.mods_dir)?;
    let config = load_config(args.config.as_deref())?;

    let mut ctx = PatchContext::new(&args.game_dir, &args.mods_dir, config).map_err(from_patcher)?;
    println_pad!(
        "{} {} {}",
        "🔎 Found".bright_blue().bold(),
        ctx.catalog.len().to_string().bright_cyan().bold(),
        "replacement(s)".bright_blue().bold()
    );

    match run_session(&mut ctx) {
        Ok(report) => {
            match report.outcome {
                PatchOutcome::Patched => {
                    println_pad!("{} {}", "✅ Patched:".bright_green().bold(), report);
                    for file in &report.patched_files {
                        println_pad!("   {} {}", "•".bright_cyan(), file);
                    }
                }
                PatchOutcome::NoOp => {
                    println_pad!("{} {}", "ℹ️  Nothing to do:".bright_yellow().bold(), report);
                }
            }
            if report.pending_remaining > 0 {
                println_pad!("\n{}", "❓ Not found in any asset file:".bright_yellow());
                for (_, record) in ctx.catalog.pending() {
                    println_pad!(
                        "   {} {} {}",
                        "•".bright_yellow(),
                        record.name.bright_white(),
                        format!("({})", record.kind).dimmed()
                    );
                }
            }
            Ok(())
        }
        Err(failure) => {
            println_pad!("{} {}", "❌ Failed after:".bright_red().bold(), failure.report);
            Err(session_error(failure).into())
        }
    }
}

fn session_error(failure: SessionFailure) -> CliError {
    let SessionFailure {
        error, recovery, ..
    } = failure;
    match (error, recovery) {
        (unity_mod_patcher::Error::LockedFile(paths), _) => CliError::FilesLocked { paths },
        (source, RecoveryStatus::Recovered | RecoveryStatus::NotAttempted) => {
            CliError::PatchFailed { source }
        }
        (source, RecoveryStatus::Partial { locked }) => {
            CliError::PartialRecovery { locked, source }
        }
        (source, RecoveryStatus::Failed(reason)) => CliError::RecoveryFailed { reason, source },
    }
}
