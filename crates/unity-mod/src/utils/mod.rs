use crate::errors::CliError;
use camino::Utf8Path;
use miette::Result;

pub mod config;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

pub fn require_dir(path: &Utf8Path) -> Result<()> {
    if !path.is_dir() {
        return Err(CliError::directory_not_found(path.to_path_buf()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_dir_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        assert!(require_dir(root).is_ok());
        assert!(require_dir(&root.join("missing")).is_err());
        std::fs::write(root.join("file"), b"").unwrap();
        assert!(require_dir(&root.join("file")).is_err());
    }
}
