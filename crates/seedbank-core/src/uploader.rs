use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use seedbank_vault::tree_hash::tree_hash_reader;
use seedbank_vault::{ByteRange, TransferReceipt, VaultClient, PART_SIZE};
use tracing::{debug, info};

use crate::error::{Result, SeedbankError};

/// Where a [`ChunkedUploader`] is in the multipart protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Created,
    Opened,
    Transferring,
    Completed,
    Aborted,
}

impl UploadState {
    pub fn name(self) -> &'static str {
        match self {
            UploadState::Created => "created",
            UploadState::Opened => "opened",
            UploadState::Transferring => "transferring",
            UploadState::Completed => "completed",
            UploadState::Aborted => "aborted",
        }
    }
}

/// Drives one multipart transfer: `open`, `start_session`, then
/// `transfer_next_part` until it returns `true`, then `complete`.
///
/// Parts go out strictly in offset order, one at a time. Each call checks
/// the current state and fails with [`SeedbankError::InvalidUploadState`]
/// when made out of turn.
pub struct ChunkedUploader<'a> {
    vault: &'a dyn VaultClient,
    vault_name: String,
    description: String,
    part_size: u64,
    state: UploadState,
    file: Option<File>,
    total_size: u64,
    offset: u64,
    all_parts_sent: bool,
    session_id: Option<String>,
}

impl<'a> ChunkedUploader<'a> {
    pub fn new(vault: &'a dyn VaultClient, vault_name: &str, description: &str) -> Self {
        Self {
            vault,
            vault_name: vault_name.to_string(),
            description: description.to_string(),
            part_size: PART_SIZE,
            state: UploadState::Created,
            file: None,
            total_size: 0,
            offset: 0,
            all_parts_sent: false,
            session_id: None,
        }
    }

    /// Override the part size (must be non-zero).
    pub fn with_part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size.max(1);
        self
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn part_count(&self) -> u64 {
        self.total_size.div_ceil(self.part_size)
    }

    fn expect_state(&self, expected: UploadState, operation: &'static str) -> Result<()> {
        if self.state != expected {
            return Err(SeedbankError::InvalidUploadState {
                operation,
                state: self.state.name(),
            });
        }
        Ok(())
    }

    /// Open the payload and record its size.
    pub fn open(&mut self, payload: &Path) -> Result<()> {
        self.expect_state(UploadState::Created, "open a payload")?;
        let file = File::open(payload).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SeedbankError::PayloadMissingLocally(payload.display().to_string())
            } else {
                SeedbankError::Io(e)
            }
        })?;
        self.total_size = file.metadata()?.len();
        self.file = Some(file);
        self.state = UploadState::Opened;
        debug!(
            "opened {} ({} bytes, {} part(s))",
            payload.display(),
            self.total_size,
            self.part_count()
        );
        Ok(())
    }

    /// Ask the vault for a multipart session.
    pub fn start_session(&mut self) -> Result<()> {
        self.expect_state(UploadState::Opened, "start a session")?;
        let session_id =
            self.vault
                .initiate_multipart(&self.vault_name, &self.description, self.part_size)?;
        info!("started multipart session {session_id} on vault {}", self.vault_name);
        self.session_id = Some(session_id);
        self.state = UploadState::Transferring;
        Ok(())
    }

    /// Send the part at the current offset. Returns `true` once, when the
    /// last part has been sent.
    pub fn transfer_next_part(&mut self) -> Result<bool> {
        self.expect_state(UploadState::Transferring, "transfer a part")?;
        if self.all_parts_sent {
            return Err(SeedbankError::InvalidUploadState {
                operation: "transfer a part",
                state: "done transferring",
            });
        }

        let Some(range) = ByteRange::for_part(self.offset, self.part_size, self.total_size) else {
            self.all_parts_sent = true;
            return Ok(true);
        };
        let (file, session_id) = match (self.file.as_mut(), self.session_id.as_deref()) {
            (Some(file), Some(session_id)) => (file, session_id),
            _ => {
                return Err(SeedbankError::InvalidUploadState {
                    operation: "transfer a part",
                    state: self.state.name(),
                })
            }
        };

        let mut body = vec![0u8; range.len() as usize];
        file.read_exact(&mut body)?;
        let ack = self
            .vault
            .upload_part(&self.vault_name, session_id, &range, &body)?;
        if ack.range != range {
            return Err(SeedbankError::vault(format!(
                "vault acknowledged {} for part {range}",
                ack.range
            )));
        }
        debug!("uploaded part {range}");

        self.offset = range.end + 1;
        self.all_parts_sent = self.offset >= self.total_size;
        Ok(self.all_parts_sent)
    }

    /// Finish the session with the tree hash of the whole payload.
    pub fn complete(&mut self) -> Result<TransferReceipt> {
        self.expect_state(UploadState::Transferring, "complete the upload")?;
        if !self.all_parts_sent {
            return Err(SeedbankError::InvalidUploadState {
                operation: "complete the upload",
                state: "parts still pending",
            });
        }
        let (file, session_id) = match (self.file.as_mut(), self.session_id.as_deref()) {
            (Some(file), Some(session_id)) => (file, session_id),
            _ => {
                return Err(SeedbankError::InvalidUploadState {
                    operation: "complete the upload",
                    state: self.state.name(),
                })
            }
        };

        file.seek(SeekFrom::Start(0))?;
        let checksum = hex::encode(tree_hash_reader(file)?);
        let receipt = self.vault.complete_multipart(
            &self.vault_name,
            session_id,
            self.total_size,
            &checksum,
        )?;
        if !receipt.checksum.eq_ignore_ascii_case(&checksum) {
            return Err(SeedbankError::vault(format!(
                "vault reports checksum {} but payload hashes to {checksum}",
                receipt.checksum
            )));
        }
        info!("completed multipart session {session_id}: {}", receipt.remote_id);
        self.state = UploadState::Completed;
        self.file = None;
        Ok(receipt)
    }

    /// Discard the session on the vault, if one was started.
    pub fn abort(&mut self) -> Result<()> {
        if matches!(self.state, UploadState::Completed | UploadState::Aborted) {
            return Err(SeedbankError::InvalidUploadState {
                operation: "abort the upload",
                state: self.state.name(),
            });
        }
        self.state = UploadState::Aborted;
        self.file = None;
        if let Some(session_id) = self.session_id.as_deref() {
            self.vault.abort_multipart(&self.vault_name, session_id)?;
            info!("aborted multipart session {session_id}");
        }
        Ok(())
    }
}
