use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unsupported file name: {0:?}")]
    UnsupportedName(String),
}

pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn exists(&self, name: &str) -> Result<bool, FsError> {
        Ok(tokio::fs::try_exists(self.entry_path(name)?).await?)
    }

    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), FsError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.entry_path(name)?, bytes).await?;
        Ok(())
    }

    /// Returns `Ok(false)` when the file was already gone; real I/O failures
    /// propagate.
    pub async fn remove(&self, name: &str) -> Result<bool, FsError> {
        match tokio::fs::remove_file(self.entry_path(name)?).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    // Names come from the last segment of a remote key; anything that is not
    // a single normal component could escape the target directory.
    fn entry_path(&self, name: &str) -> Result<PathBuf, FsError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == OsStr::new(name) => {
                Ok(self.root.join(part))
            }
            _ => Err(FsError::UnsupportedName(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_exists_remove_round_trip() {
        let dir = tempdir().unwrap();
        let local = LocalDir::new(dir.path());

        local.write("a.jar", b"v1").await.unwrap();
        assert!(local.exists("a.jar").await.unwrap());
        assert_eq!(std::fs::read(dir.path().join("a.jar")).unwrap(), b"v1");

        assert!(local.remove("a.jar").await.unwrap());
        assert!(!local.exists("a.jar").await.unwrap());
    }

    #[tokio::test]
    async fn write_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let local = LocalDir::new(dir.path());

        local.write("a.jar", b"old contents").await.unwrap();
        local.write("a.jar", b"new").await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("a.jar")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn remove_reports_already_gone() {
        let dir = tempdir().unwrap();
        let local = LocalDir::new(dir.path());

        assert!(!local.remove("missing.jar").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_names_that_leave_the_root() {
        let dir = tempdir().unwrap();
        let local = LocalDir::new(dir.path());

        for name in ["../escape", "a/b", "/abs", "..", ".", ""] {
            let err = local.write(name, b"x").await.unwrap_err();
            assert!(
                matches!(err, FsError::UnsupportedName(_)),
                "{name:?} must be rejected"
            );
        }
    }
}
