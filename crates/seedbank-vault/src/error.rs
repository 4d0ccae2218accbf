use seedbank_types::error::SeedbankError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Network or service failure that persisted through every retry.
    #[error("{op}: {message}")]
    Transport { op: String, message: String },

    /// The vault answered with an error status; not retried.
    #[error("{op}: rejected by vault (HTTP {status}): {message}")]
    Rejected {
        op: String,
        status: u16,
        message: String,
    },

    /// The vault answered successfully but the response is unusable.
    #[error("{op}: unexpected response: {message}")]
    Protocol { op: String, message: String },

    #[error("{op}: checksum mismatch (sent {sent}, vault reports {reported})")]
    ChecksumMismatch {
        op: String,
        sent: String,
        reported: String,
    },

    #[error("unknown upload session '{0}'")]
    UnknownSession(String),

    #[error("invalid part: {0}")]
    InvalidPart(String),

    #[error("vault configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VaultError> for SeedbankError {
    fn from(value: VaultError) -> Self {
        match value {
            VaultError::Config(msg) => SeedbankError::Config(msg),
            other => SeedbankError::VaultTransferFailure(other.to_string()),
        }
    }
}
