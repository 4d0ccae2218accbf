use thiserror::Error;

pub type Result<T> = std::result::Result<T, SeedbankError>;

#[derive(Debug, Error)]
pub enum SeedbankError {
    #[error("a seedbank repository is not initialized at '{0}' (run `sb init` to create one)")]
    RepoNotInitialized(String),

    #[error("a seedbank repository is already initialized at '{0}'")]
    RepoAlreadyInitialized(String),

    #[error("path '{0}' does not exist or is not a directory")]
    InvalidSourcePath(String),

    #[error("uid prefix '{prefix}' is ambiguous; it matches: {}", .candidates.join(", "))]
    AmbiguousUidPrefix {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("archive not found: '{0}'")]
    ArchiveNotFound(String),

    #[error("archive {0} has no payload in the local store")]
    PayloadMissingLocally(String),

    #[error("malformed metadata record '{path}': {source}")]
    MalformedMetadataRecord {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("vault transfer failed: {0}")]
    VaultTransferFailure(String),

    #[error("archive {uid} was already uploaded (remote id {remote_id})")]
    AlreadyUploaded { uid: String, remote_id: String },

    #[error("archive {0} is already registered")]
    DuplicateArchive(String),

    #[error("invalid upload state: cannot {operation} while {state}")]
    InvalidUploadState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("history error: {0}")]
    History(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SeedbankError {
    /// Shorthand for wrapping any displayable vault-side failure.
    pub fn vault(err: impl std::fmt::Display) -> Self {
        SeedbankError::VaultTransferFailure(err.to_string())
    }
}
