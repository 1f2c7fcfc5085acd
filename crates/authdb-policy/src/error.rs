use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Configuration error: marker not found (no boolean '{flag}' under '{right}')")]
    MarkerNotFound { right: String, flag: String },

    #[error("Configuration error: {count} entries for '{right}' carry a boolean flag")]
    AmbiguousEntry { right: String, count: usize },

    #[error("Configuration error: malformed policy document near byte {position}: {message}")]
    Malformed { position: usize, message: String },

    #[error("Failed to create backup in {}: {source}", dir.display())]
    Backup {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Console error: {0}")]
    Console(#[source] io::Error),
}

impl PolicyError {
    /// Adapter for `map_err` on filesystem calls against `path`.
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for failures caused by the document's content rather than the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PolicyError::MarkerNotFound { .. }
                | PolicyError::AmbiguousEntry { .. }
                | PolicyError::Malformed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
