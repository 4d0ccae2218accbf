use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use seedbank_types::ArchiveUid;

use crate::error::{Result, SeedbankError};
use crate::layout;
use crate::platform::fs::atomic_write;

/// Longest description shown by [`Archive::summary`].
pub const SUMMARY_MAX_CHARS: usize = 40;

/// Shown in listings for archives without a description.
pub const NO_DESCRIPTION: &str = "(no description)";

/// One archived directory snapshot, as recorded in `meta/<uid>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub uid: ArchiveUid,
    /// Contents of `description.md` in the archived directory.
    #[serde(default)]
    pub description: String,
    pub create_time: DateTime<Utc>,
    /// Paths inside the payload, relative to the source directory, in walk order.
    #[serde(default)]
    pub file_list: Vec<String>,
    /// Payload size in bytes before the metadata record was embedded.
    #[serde(default)]
    pub size: u64,
    /// Vault archive id; empty until an upload succeeds.
    #[serde(default)]
    pub remote_id: String,
    #[serde(default = "empty_receipt", alias = "aws_response")]
    pub transfer_receipt: serde_json::Value,
}

fn empty_receipt() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Archive {
    /// A fresh, not-yet-uploaded archive whose uid derives from `create_time`.
    pub fn new(create_time: DateTime<Utc>) -> Self {
        Self {
            uid: ArchiveUid::from_time(&create_time),
            description: String::new(),
            create_time,
            file_list: Vec::new(),
            size: 0,
            remote_id: String::new(),
            transfer_receipt: empty_receipt(),
        }
    }

    pub fn metadata_path(&self, root: &Path) -> PathBuf {
        layout::metadata_path(root, &self.uid)
    }

    pub fn payload_path(&self, root: &Path) -> PathBuf {
        layout::payload_path(root, &self.uid)
    }

    pub fn is_uploaded(&self) -> bool {
        !self.remote_id.is_empty()
    }

    /// Pretty JSON with a trailing newline. Field order is fixed by the struct.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Parse a metadata record; `origin` names the source in errors.
    pub fn from_json(data: &[u8], origin: &str) -> Result<Self> {
        serde_json::from_slice(data).map_err(|source| SeedbankError::MalformedMetadataRecord {
            path: origin.to_string(),
            source,
        })
    }

    /// Read a record from disk. The file must be named after the uid it holds.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let origin = path.display().to_string();
        let archive = Self::from_json(&data, &origin)?;
        if path.file_stem().and_then(|s| s.to_str()) != Some(archive.uid.as_str()) {
            return Err(SeedbankError::MalformedMetadataRecord {
                path: origin,
                source: <serde_json::Error as serde::de::Error>::custom(format!(
                    "record for archive {} is stored under the wrong name",
                    archive.uid
                )),
            });
        }
        Ok(archive)
    }

    /// Atomically write the metadata record and return the exact bytes written.
    pub fn save(&self, root: &Path) -> Result<Vec<u8>> {
        let data = self.to_json()?;
        atomic_write(&self.metadata_path(root), &data)?;
        Ok(data)
    }

    /// First line of the description, cut to [`SUMMARY_MAX_CHARS`].
    pub fn summary(&self) -> String {
        let first = self
            .description
            .split(['\n', '\r'])
            .next()
            .unwrap_or_default()
            .trim();
        if first.is_empty() {
            return NO_DESCRIPTION.to_string();
        }
        first.chars().take(SUMMARY_MAX_CHARS).collect()
    }
}
