use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::tree_hash::{tree_hash_hex, tree_hash_reader};
use crate::{ByteRange, PartAck, TransferReceipt, VaultClient};

const SESSION_FILE: &str = "session.json";
const PART_SUFFIX: &str = ".part";

/// A vault backed by a local directory.
///
/// Layout under the root:
/// `<vault>/archives/<id>.archive` (+ `<id>.json` sidecar) and
/// `<vault>/multipart/<session>/` holding one file per uploaded part.
pub struct LocalVault {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionInfo {
    description: String,
    part_size: u64,
    created: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveInfo {
    description: String,
    size: u64,
    checksum: String,
    created: DateTime<Utc>,
}

impl LocalVault {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stored archive, if the vault holds it.
    pub fn archive_path(&self, vault: &str, remote_id: &str) -> Option<PathBuf> {
        validate_name("vault", vault).ok()?;
        validate_name("archive id", remote_id).ok()?;
        let path = self
            .root
            .join(vault)
            .join("archives")
            .join(format!("{remote_id}.archive"));
        path.is_file().then_some(path)
    }

    /// Ids of multipart sessions that were opened but never completed or aborted.
    pub fn open_sessions(&self, vault: &str) -> Result<Vec<String>> {
        validate_name("vault", vault)?;
        let dir = self.root.join(vault).join("multipart");
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn archives_dir(&self, vault: &str) -> Result<PathBuf> {
        validate_name("vault", vault)?;
        let dir = self.root.join(vault).join("archives");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn session_dir(&self, vault: &str, session_id: &str) -> Result<PathBuf> {
        validate_name("vault", vault)?;
        validate_name("session id", session_id)?;
        let dir = self.root.join(vault).join("multipart").join(session_id);
        if !dir.is_dir() {
            return Err(VaultError::UnknownSession(session_id.to_string()));
        }
        Ok(dir)
    }

    fn read_session(dir: &Path) -> Result<SessionInfo> {
        let data = fs::read(dir.join(SESSION_FILE))?;
        serde_json::from_slice(&data).map_err(|e| VaultError::Protocol {
            op: "read session".into(),
            message: e.to_string(),
        })
    }

    /// Sorted `(offset, path, len)` of every part stored for a session.
    fn stored_parts(dir: &Path) -> Result<Vec<(u64, PathBuf, u64)>> {
        let mut parts = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(offset) = name.strip_suffix(PART_SUFFIX) else {
                continue;
            };
            let offset: u64 = offset
                .parse()
                .map_err(|_| VaultError::InvalidPart(format!("unexpected part file '{name}'")))?;
            parts.push((offset, entry.path(), entry.metadata()?.len()));
        }
        parts.sort_by_key(|(offset, _, _)| *offset);
        Ok(parts)
    }

    fn finish_archive(
        &self,
        vault: &str,
        tmp: tempfile::NamedTempFile,
        description: &str,
        size: u64,
        checksum: &str,
    ) -> Result<TransferReceipt> {
        let dir = self.archives_dir(vault)?;
        let remote_id = new_id();
        let info = ArchiveInfo {
            description: description.to_string(),
            size,
            checksum: checksum.to_string(),
            created: Utc::now(),
        };
        let info_bytes = serde_json::to_vec_pretty(&info).map_err(|e| VaultError::Protocol {
            op: "write archive info".into(),
            message: e.to_string(),
        })?;
        atomic_write(&dir, &dir.join(format!("{remote_id}.json")), &info_bytes)?;
        tmp.persist(dir.join(format!("{remote_id}.archive")))
            .map_err(|e| e.error)?;

        debug!("local vault {vault}: stored archive {remote_id} ({size} bytes)");
        Ok(TransferReceipt {
            location: format!("/{vault}/archives/{remote_id}"),
            remote_id,
            checksum: checksum.to_string(),
        })
    }
}

impl VaultClient for LocalVault {
    fn initiate_multipart(
        &self,
        vault: &str,
        description: &str,
        part_size: u64,
    ) -> Result<String> {
        validate_name("vault", vault)?;
        if part_size == 0 {
            return Err(VaultError::InvalidPart("part size must be non-zero".into()));
        }
        let session_id = new_id();
        let dir = self.root.join(vault).join("multipart").join(&session_id);
        fs::create_dir_all(&dir)?;
        let info = SessionInfo {
            description: description.to_string(),
            part_size,
            created: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&info).map_err(|e| VaultError::Protocol {
            op: "write session".into(),
            message: e.to_string(),
        })?;
        atomic_write(&dir, &dir.join(SESSION_FILE), &data)?;
        Ok(session_id)
    }

    fn upload_part(
        &self,
        vault: &str,
        session_id: &str,
        range: &ByteRange,
        body: &[u8],
    ) -> Result<PartAck> {
        let dir = self.session_dir(vault, session_id)?;
        let session = Self::read_session(&dir)?;
        if body.len() as u64 != range.len() {
            return Err(VaultError::InvalidPart(format!(
                "{range}: body is {} bytes",
                body.len()
            )));
        }
        if range.start % session.part_size != 0 || range.len() > session.part_size {
            return Err(VaultError::InvalidPart(format!(
                "{range} does not align with part size {}",
                session.part_size
            )));
        }
        let path = dir.join(format!("{:020}{PART_SUFFIX}", range.start));
        atomic_write(&dir, &path, body)?;
        Ok(PartAck {
            range: *range,
            checksum: tree_hash_hex(body),
        })
    }

    fn complete_multipart(
        &self,
        vault: &str,
        session_id: &str,
        total_size: u64,
        checksum: &str,
    ) -> Result<TransferReceipt> {
        let dir = self.session_dir(vault, session_id)?;
        let session = Self::read_session(&dir)?;
        let parts = Self::stored_parts(&dir)?;

        let archives = self.archives_dir(vault)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&archives)?;
        let mut expected = 0u64;
        for (i, (offset, path, len)) in parts.iter().enumerate() {
            if *offset != expected {
                return Err(VaultError::InvalidPart(format!(
                    "missing bytes {expected}-{}",
                    offset.saturating_sub(1)
                )));
            }
            let is_last = i + 1 == parts.len();
            if !is_last && *len != session.part_size {
                return Err(VaultError::InvalidPart(format!(
                    "part at offset {offset} is {len} bytes, expected {}",
                    session.part_size
                )));
            }
            let mut part = fs::File::open(path)?;
            std::io::copy(&mut part, tmp.as_file_mut())?;
            expected += len;
        }
        if expected != total_size {
            return Err(VaultError::InvalidPart(format!(
                "parts cover {expected} bytes but archive size is {total_size}"
            )));
        }

        let file = tmp.as_file_mut();
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        let computed = hex::encode(tree_hash_reader(file)?);
        if !computed.eq_ignore_ascii_case(checksum) {
            return Err(VaultError::ChecksumMismatch {
                op: format!("COMPLETE {vault}"),
                sent: checksum.to_string(),
                reported: computed,
            });
        }

        let receipt = self.finish_archive(vault, tmp, &session.description, total_size, &computed)?;
        fs::remove_dir_all(&dir)?;
        Ok(receipt)
    }

    fn abort_multipart(&self, vault: &str, session_id: &str) -> Result<()> {
        let dir = self.session_dir(vault, session_id)?;
        fs::remove_dir_all(&dir)?;
        Ok(())
    }

    fn put_archive(&self, vault: &str, description: &str, body: &[u8]) -> Result<TransferReceipt> {
        let dir = self.archives_dir(vault)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(body)?;
        let checksum = tree_hash_hex(body);
        self.finish_archive(vault, tmp, description, body.len() as u64, &checksum)
    }
}

/// Write data to a temp file in `dir`, then atomically rename into place.
fn atomic_write(dir: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn new_id() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Reject names that could escape the vault root.
fn validate_name(kind: &str, name: &str) -> Result<()> {
    let safe = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if !safe {
        return Err(VaultError::Config(format!("invalid {kind} name '{name}'")));
    }
    Ok(())
}
