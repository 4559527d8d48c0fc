use std::{
    io,
    path::{Path, PathBuf},
};

/// Failure classes surfaced by the mutation engine. Attribute clearing and
/// backup rotation never report through here; their failures are swallowed
/// locally as best-effort work.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no staged content to install")]
    InputMissing,

    #[error("no target path provided")]
    PathMissing,

    #[error("hosts file not found: {0}")]
    TargetNotFound(PathBuf),

    #[error("target directory does not exist: {0}")]
    DirectoryMissing(PathBuf),

    #[error("permission denied writing {path}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write failed for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no backup found beside {0}")]
    NoBackupAvailable(PathBuf),

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl EngineError {
    /// Classifies an exhausted-retry I/O error against a target path.
    pub fn from_write_error(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Self::WriteFailed {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}
