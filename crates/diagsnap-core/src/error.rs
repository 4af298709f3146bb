//! Error taxonomy for diagsnap.

use std::path::PathBuf;

/// Errors from the atomic persistence layer.
///
/// Every variant guarantees the target file was left untouched.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to write temp file {temp:?} for {target:?}: {source}")]
    Write {
        target: PathBuf,
        temp: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to rename {temp:?} over {target:?}: {source}")]
    Rename {
        target: PathBuf,
        temp: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read existing content of {target:?}: {source}")]
    Read {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("target path has no file name: {0:?}")]
    InvalidTarget(PathBuf),
}

/// Result type for persistence operations.
pub type PersistResult<T> = std::result::Result<T, PersistError>;

/// diagsnap domain errors.
#[derive(Debug, thiserror::Error)]
pub enum DiagError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("incident not found: {0:?}")]
    IncidentNotFound(PathBuf),

    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for diagsnap domain operations.
pub type Result<T> = std::result::Result<T, DiagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_error_converts_into_domain_error() {
        let err: DiagError = PersistError::InvalidTarget(PathBuf::from("/")).into();
        assert!(matches!(err, DiagError::Persist(_)));
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn rename_error_names_both_paths() {
        let err = PersistError::Rename {
            target: PathBuf::from("/logs/uptime.log"),
            temp: PathBuf::from("/logs/.uptime.log.abc.tmp"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("uptime.log"));
        assert!(msg.contains(".uptime.log.abc.tmp"));
    }
}
