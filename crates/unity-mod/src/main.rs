use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    patch_game, prune_backups, recover_game, scan_mods, PatchArgs, PruneArgs, RecoverArgs,
    ScanArgs,
};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output from the patcher
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply every replacement in the mods directory to the game's asset files
    Patch {
        /// The game's data directory (the one holding the .assets files)
        #[arg(short, long)]
        game_dir: Utf8PathBuf,

        /// The directory holding replacement audio and images
        #[arg(short, long)]
        mods_dir: Utf8PathBuf,

        /// The path to the patcher config file
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
    },
    /// Restore the game's asset files from backups left by an interrupted patch
    Recover {
        /// The game's data directory
        #[arg(short, long)]
        game_dir: Utf8PathBuf,

        /// The path to the patcher config file
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
    },
    /// Remove backups that no longer match the game's files
    Prune {
        /// The game's data directory
        #[arg(short, long)]
        game_dir: Utf8PathBuf,

        /// The path to the patcher config file
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
    },
    /// List the replacements found in a mods directory
    Scan {
        /// The directory holding replacement audio and images
        #[arg(short, long)]
        mods_dir: Utf8PathBuf,

        /// The path to the patcher config file
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,

        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = parse_args();
    init_tracing(args.verbose);

    match args.command {
        Commands::Patch {
            game_dir,
            mods_dir,
            config,
        } => patch_game(PatchArgs {
            game_dir,
            mods_dir,
            config,
        }),
        Commands::Recover { game_dir, config } => recover_game(RecoverArgs { game_dir, config }),
        Commands::Prune { game_dir, config } => prune_backups(PruneArgs { game_dir, config }),
        Commands::Scan {
            mods_dir,
            config,
            json,
        } => scan_mods(ScanArgs {
            mods_dir,
            config,
            json,
        }),
    }
}
