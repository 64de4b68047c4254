use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Directory not found: {path}")]
    #[diagnostic(
        code(fs::directory_missing),
        help("Make sure the directory exists and the path is correct")
    )]
    DirectoryNotFound { path: Utf8PathBuf },

    #[error("{} file(s) are open in another program: {}", .paths.len(), join(.paths))]
    #[diagnostic(
        code(session::files_locked),
        help("Close the game and any tool that has these files open, then run the command again. Nothing was modified.")
    )]
    FilesLocked { paths: Vec<Utf8PathBuf> },

    #[error("Patching failed; no game file was left modified")]
    #[diagnostic(
        code(session::failed),
        help("Fix the replacement named in the error and run patch again")
    )]
    PatchFailed {
        #[source]
        source: unity_mod_patcher::Error,
    },

    #[error("Patching failed and {} file(s) could not be restored: {}", .locked.len(), join(.locked))]
    #[diagnostic(
        code(session::partial_recovery),
        help("Close whatever holds these files, then run `unity-mod recover` with the same game directory")
    )]
    PartialRecovery {
        locked: Vec<Utf8PathBuf>,
        #[source]
        source: unity_mod_patcher::Error,
    },

    #[error("Patching failed and recovery could not run: {reason}")]
    #[diagnostic(
        code(session::recovery_failed),
        help("The backups were kept; copy them back over the game directory by hand")
    )]
    RecoveryFailed {
        reason: String,
        #[source]
        source: unity_mod_patcher::Error,
    },

    #[error("{} file(s) could not be restored: {}", .paths.len(), join(.paths))]
    #[diagnostic(
        code(recover::incomplete),
        help("Close whatever holds these files and run recover again; the remaining backups were kept")
    )]
    RecoveryIncomplete { paths: Vec<Utf8PathBuf> },

    #[error("Backup {backup} has no original file at {original}")]
    #[diagnostic(
        code(recover::inconsistent),
        help("The game files changed since the backup was taken. Verify the game installation, then delete the backup directory")
    )]
    BackupWithoutOriginal {
        backup: Utf8PathBuf,
        original: Utf8PathBuf,
    },

    #[error("Patcher error")]
    #[diagnostic(code(patcher::error))]
    Patcher {
        #[from]
        source: unity_mod_patcher::Error,
    },
}

fn join(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CliError {
    pub fn directory_not_found(path: Utf8PathBuf) -> Self {
        Self::DirectoryNotFound { path }
    }
}

/// Pick the diagnostic for a library error outside a patch session.
pub fn from_patcher(error: unity_mod_patcher::Error) -> CliError {
    match error {
        unity_mod_patcher::Error::LockedFile(paths) => CliError::FilesLocked { paths },
        unity_mod_patcher::Error::RecoveryInconsistency { backup, original } => {
            CliError::BackupWithoutOriginal { backup, original }
        }
        other => other.into(),
    }
}
