use crate::errors::from_patcher;
use crate::println_pad;
use crate::utils::{config::load_config, require_dir};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use unity_mod_patcher::catalog::scan;
use unity_mod_patcher::ReplacementRecord;

pub struct ScanArgs {
    pub mods_dir: Utf8PathBuf,
    pub config: Option<Utf8PathBuf>,
    pub json: bool,
}

pub fn scan_mods(args: ScanArgs) -> Result<()> {
    require_dir(&args.mods_dir)?;
    let config = load_config(args.config.as_deref())?;
    let result = scan(&args.mods_dir, &config.replacement_prefix).map_err(from_patcher)?;

    if args.json {
        let records: Vec<&ReplacementRecord> = result.iter().collect();
        println!("{}", serde_json::to_string_pretty(&records).into_diagnostic()?);
        return Ok(());
    }

    println_pad!(
        "{} {}",
        "📂 Mods:".bright_blue().bold(),
        args.mods_dir.as_str().bright_cyan().bold()
    );
    for (title, records) in [
        ("🔊 Audio", &result.audio),
        ("🖼️  Sprites", &result.sprites),
        ("🧱 Textures", &result.textures),
    ] {
        println_pad!(
            "\n{} {}",
            title.bright_magenta().bold(),
            format!("({})", records.len()).dimmed()
        );
        for record in records {
            println_pad!(
                "   {} {} {}",
                "•".bright_cyan(),
                record.name.bright_white().bold(),
                format!("{} ({} bytes)", record.source, record.byte_len).dimmed()
            );
        }
    }
    Ok(())
}
