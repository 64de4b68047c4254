//! Error types for patch sessions.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, image decoding,
//! container codec errors) are converted via `From` impls.
//!
//! Whether an error ends the whole session or only the current container is
//! decided by [`Error::is_session_fatal`].

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while cataloging mods or patching containers.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Walking a directory tree failed.
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A replacement image could not be decoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to parse or serialize JSON (backup manifest).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The patcher configuration file is malformed.
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The patcher configuration could not be serialized.
    #[error("Failed to write config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A replacement audio file is not a recognizable WAV, Ogg, MP3 or M4A stream.
    #[error("Unreadable audio: {0}")]
    Audio(String),

    /// A field-level error from the container codec outside a strategy.
    #[error("Asset error: {0}")]
    Assets(#[from] unity_assets::Error),

    /// The container header or metadata is unreadable. Skips that container.
    #[error("Corrupt container {path}: {source}")]
    CorruptContainer {
        path: Utf8PathBuf,
        #[source]
        source: unity_assets::Error,
    },

    /// No usable class layout for the container's engine version. Skips that container.
    #[error("No layout for class {class_id} in {path} (Unity {unity_version}): {reason}")]
    UnknownLayout {
        path: Utf8PathBuf,
        unity_version: String,
        class_id: i32,
        reason: String,
    },

    /// A sprite references a texture outside its own container. Skips that asset.
    #[error("Sprite '{asset}' references texture (file {file_id}, path {path_id}) outside its container")]
    UnsupportedReference {
        asset: String,
        file_id: i32,
        path_id: i64,
    },

    /// Files are held open by another process; the session was not started.
    #[error("{} file(s) locked by another process: {}", .0.len(), display_paths(.0))]
    LockedFile(Vec<Utf8PathBuf>),

    /// A replacement strategy failed part-way through.
    #[error("Replacing '{asset}' failed: {source}")]
    StrategyFailure {
        asset: String,
        #[source]
        source: Box<Error>,
    },

    /// A backup could not be written before mutating a file.
    #[error("Failed to back up {path}: {source}")]
    BackupFailure {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A backup exists for a file that is no longer in the install tree.
    #[error("Backup {backup} has no original at {original}; restore it manually")]
    RecoveryInconsistency {
        backup: Utf8PathBuf,
        original: Utf8PathBuf,
    },

    /// The session was cancelled before any file was mutated.
    #[error("Session cancelled")]
    Cancelled,
}

fn display_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Whether this error must end the session (with recovery) rather than skip
    /// one container or one asset.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(
            self,
            Error::CorruptContainer { .. }
                | Error::UnknownLayout { .. }
                | Error::UnsupportedReference { .. }
        )
    }

    /// Wrap an error raised while applying a replacement for `asset`.
    ///
    /// Per-asset skips pass through unchanged.
    pub fn in_strategy(self, asset: &str) -> Self {
        match self {
            Error::UnsupportedReference { .. } | Error::StrategyFailure { .. } => self,
            other => Error::StrategyFailure {
                asset: asset.to_string(),
                source: Box::new(other),
            },
        }
    }
}
