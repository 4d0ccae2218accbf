use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of one archive: hex SHA-256 of its creation timestamp.
///
/// Two bundles of identical content get distinct uids; the id names the
/// moment an archive was built, not what it contains.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveUid(String);

impl ArchiveUid {
    /// Derive the uid for an archive created at `time`.
    pub fn from_time(time: &DateTime<Utc>) -> Self {
        let stamp = time.to_rfc3339_opts(SecondsFormat::Nanos, true);
        ArchiveUid(hex::encode(Sha256::digest(stamp.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, enough to address an archive in practice.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// File name of the metadata record: `<uid>.json`.
    pub fn metadata_file_name(&self) -> String {
        format!("{}.json", self.0)
    }

    /// File name of the local payload: `<uid>.tar.zst`.
    pub fn payload_file_name(&self) -> String {
        format!("{}.tar.zst", self.0)
    }
}

impl From<String> for ArchiveUid {
    fn from(value: String) -> Self {
        ArchiveUid(value)
    }
}

impl From<&str> for ArchiveUid {
    fn from(value: &str) -> Self {
        ArchiveUid(value.to_string())
    }
}

impl fmt::Debug for ArchiveUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveUid({})", self.short())
    }
}

impl fmt::Display for ArchiveUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
