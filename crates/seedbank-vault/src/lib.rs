pub mod error;
pub mod glacier;
pub mod http_util;
pub mod local;
pub mod retry;
pub mod sigv4;
pub mod tree_hash;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::{Result, VaultError};

/// Size of one multipart transfer part (8 MiB).
pub const PART_SIZE: u64 = 1_048_576 * 8;

/// Inclusive byte range of one part within a payload of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

#[allow(clippy::len_without_is_empty)]
impl ByteRange {
    /// Range of the part beginning at `offset`, clamped to the payload end.
    ///
    /// Returns `None` when `offset` is already past the last byte.
    pub fn for_part(offset: u64, part_size: u64, total: u64) -> Option<Self> {
        if offset >= total || part_size == 0 {
            return None;
        }
        let end = offset.saturating_add(part_size - 1).min(total - 1);
        Some(Self {
            start: offset,
            end,
            total,
        })
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for a Glacier part upload.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/*", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Vault acknowledgement of a single uploaded part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartAck {
    pub range: ByteRange,
    /// Tree hash of the part as confirmed by the vault.
    pub checksum: String,
}

/// What the vault hands back once an archive is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub remote_id: String,
    pub location: String,
    pub checksum: String,
}

/// The operations seedbank needs from a cold-storage vault.
///
/// All calls block until the vault has answered. Implementations validate
/// the response and report failures as [`VaultError`]; transient failures
/// are retried internally under the backend's [`RetryConfig`].
pub trait VaultClient: Send + Sync {
    /// Open a multipart transfer session and return its id.
    fn initiate_multipart(&self, vault: &str, description: &str, part_size: u64)
        -> Result<String>;

    /// Upload one part covering `range` of the payload.
    fn upload_part(
        &self,
        vault: &str,
        session_id: &str,
        range: &ByteRange,
        body: &[u8],
    ) -> Result<PartAck>;

    /// Finish a session; `checksum` is the hex tree hash of the whole payload.
    fn complete_multipart(
        &self,
        vault: &str,
        session_id: &str,
        total_size: u64,
        checksum: &str,
    ) -> Result<TransferReceipt>;

    /// Discard a session so no parts are stranded on the vault.
    fn abort_multipart(&self, vault: &str, session_id: &str) -> Result<()>;

    /// Store a whole payload in a single request.
    fn put_archive(&self, vault: &str, description: &str, body: &[u8]) -> Result<TransferReceipt>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultBackendKind {
    #[default]
    Glacier,
    Local,
}

/// Retry settings for vault requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

fn default_max_retries() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

/// The `vault` block of the repository config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub backend: VaultBackendKind,
    /// Glacier region (falls back to `AWS_REGION`, then `us-east-1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Endpoint override, e.g. for a Glacier-compatible test server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Root directory of a `local` vault; relative paths resolve against the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Build a vault client from config. `base_dir` anchors relative local paths.
pub fn vault_from_config(cfg: &VaultConfig, base_dir: &Path) -> Result<Box<dyn VaultClient>> {
    match cfg.backend {
        VaultBackendKind::Glacier => {
            let credentials = sigv4::Credentials::from_env()?;
            let region = cfg
                .region
                .clone()
                .or_else(|| env_nonempty("AWS_REGION"))
                .or_else(|| env_nonempty("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| "us-east-1".to_string());
            let endpoint = cfg
                .endpoint
                .clone()
                .unwrap_or_else(|| format!("https://glacier.{region}.amazonaws.com"));
            Ok(Box::new(glacier::GlacierVault::new(
                &endpoint,
                &region,
                credentials,
                cfg.retry.clone(),
            )?))
        }
        VaultBackendKind::Local => {
            let path = cfg.path.as_deref().ok_or_else(|| {
                VaultError::Config("local vault backend requires `vault.path`".into())
            })?;
            let root = if Path::new(path).is_absolute() {
                Path::new(path).to_path_buf()
            } else {
                base_dir.join(path)
            };
            Ok(Box::new(local::LocalVault::new(root)?))
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
