//! Locating and loading the patcher configuration.

use crate::errors::from_patcher;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use std::env;
use unity_mod_patcher::PatcherConfig;

pub const CONFIG_FILE_NAME: &str = "unity-mod.toml";

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path, next to the executable.
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load the config at `explicit`, or the default one; defaults when neither exists.
pub fn load_config(explicit: Option<&Utf8Path>) -> Result<PatcherConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(PatcherConfig::default()),
        },
    };
    tracing::debug!("Loading config path={}", path);
    PatcherConfig::load(&path).map_err(|e| from_patcher(e).into())
}
