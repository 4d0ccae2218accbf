//! Pending-upload journal.
//!
//! An upload is recorded in two steps: the vault receipt is first written to
//! `pending/<uid>.json`, then the metadata record is rewritten and committed.
//! The journal entry is removed only after the commit, so an interrupted
//! upload can be finished later by `repair` without touching the vault again.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use seedbank_types::ArchiveUid;
use seedbank_vault::TransferReceipt;

use crate::error::{Result, SeedbankError};
use crate::layout;
use crate::platform::fs::{atomic_write, remove_if_exists};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpload {
    pub uid: ArchiveUid,
    pub receipt: TransferReceipt,
    pub uploaded_at: DateTime<Utc>,
}

impl PendingUpload {
    pub fn new(uid: ArchiveUid, receipt: TransferReceipt) -> Self {
        Self {
            uid,
            receipt,
            uploaded_at: Utc::now(),
        }
    }

    pub fn write(&self, root: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)?;
        atomic_write(&layout::pending_path(root, &self.uid), &data)?;
        Ok(())
    }

    pub fn remove(root: &Path, uid: &ArchiveUid) -> Result<()> {
        remove_if_exists(&layout::pending_path(root, uid))?;
        Ok(())
    }

    pub fn find(root: &Path, uid: &ArchiveUid) -> Result<Option<Self>> {
        let path = layout::pending_path(root, uid);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(parse(&data, &path)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every journal entry, in file-name order.
    pub fn load_all(root: &Path) -> Result<Vec<Self>> {
        let dir = layout::pending_dir(root);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        paths
            .iter()
            .map(|path| parse(&std::fs::read(path)?, path))
            .collect()
    }
}

fn parse(data: &[u8], path: &Path) -> Result<PendingUpload> {
    serde_json::from_slice(data).map_err(|source| SeedbankError::MalformedMetadataRecord {
        path: path.display().to_string(),
        source,
    })
}
