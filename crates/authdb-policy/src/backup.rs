use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{PolicyError, Result};

pub const BACKUP_PREFIX: &str = "authorization";
pub const BACKUP_SUFFIX: &str = ".bak";

/// Byte-exact copy of a policy file taken before it is modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    path: PathBuf,
}

impl Backup {
    /// Writes `content` to a new, uniquely named file in `dir`.
    ///
    /// The name is `authorization<random>.bak`. The file is synced and kept
    /// on disk; nothing removes it later.
    pub fn create(dir: &Path, content: &[u8]) -> Result<Self> {
        let backup_err = |source: std::io::Error| PolicyError::Backup {
            dir: dir.to_path_buf(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix(BACKUP_PREFIX)
            .suffix(BACKUP_SUFFIX)
            .tempfile_in(dir)
            .map_err(backup_err)?;
        file.write_all(content).map_err(backup_err)?;
        file.as_file().sync_all().map_err(backup_err)?;

        let (_, path) = file.keep().map_err(|e| backup_err(e.error))?;
        info!(backup = %path.display(), bytes = content.len(), "created policy backup");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_backup_is_exact_copy() {
        let dir = tempfile::tempdir().unwrap();
        let content = b"<plist>\n\t<false/>\n</plist>\n";
        let backup = Backup::create(dir.path(), content).unwrap();

        assert_eq!(fs::read(backup.path()).unwrap(), content);
        let name = backup.path().file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(BACKUP_PREFIX));
        assert!(name.ends_with(BACKUP_SUFFIX));
    }

    #[test]
    fn test_backups_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = Backup::create(dir.path(), b"one").unwrap();
        let second = Backup::create(dir.path(), b"two").unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_missing_directory_is_backup_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = Backup::create(&missing, b"content").unwrap_err();

        assert!(matches!(err, PolicyError::Backup { .. }));
        assert!(!err.is_configuration());
    }
}
