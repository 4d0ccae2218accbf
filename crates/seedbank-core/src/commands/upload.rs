use std::path::Path;

use seedbank_types::ArchiveUid;
use seedbank_vault::tree_hash::tree_hash_hex;
use seedbank_vault::{TransferReceipt, VaultClient, PART_SIZE};
use tracing::{info, warn};

use crate::archive::Archive;
use crate::error::{Result, SeedbankError};
use crate::journal::PendingUpload;
use crate::layout;
use crate::session::Session;
use crate::uploader::ChunkedUploader;

/// How a payload is sent to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStrategy {
    SingleShot,
    Multipart { parts: u64 },
}

/// Payloads up to two parts go in one request; anything larger is chunked.
pub fn choose_strategy(size: u64, part_size: u64) -> TransferStrategy {
    if size <= 2 * part_size {
        TransferStrategy::SingleShot
    } else {
        TransferStrategy::Multipart {
            parts: size.div_ceil(part_size),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub uid: ArchiveUid,
    pub strategy: TransferStrategy,
    pub receipt: TransferReceipt,
}

/// Run `sb upload`: send one archive's payload to the configured vault and
/// record the result in its metadata and in history.
pub fn run(session: &mut Session, uid_prefix: &str) -> Result<UploadOutcome> {
    run_with_part_size(session, uid_prefix, PART_SIZE)
}

pub(crate) fn run_with_part_size(
    session: &mut Session,
    uid_prefix: &str,
    part_size: u64,
) -> Result<UploadOutcome> {
    let root = session.root().to_path_buf();
    let archive = session.manager.require(uid_prefix)?.clone();
    if archive.is_uploaded() {
        return Err(SeedbankError::AlreadyUploaded {
            uid: archive.uid.to_string(),
            remote_id: archive.remote_id.clone(),
        });
    }
    if let Some(pending) = PendingUpload::find(&root, &archive.uid)? {
        return Err(SeedbankError::AlreadyUploaded {
            uid: archive.uid.to_string(),
            remote_id: pending.receipt.remote_id,
        });
    }

    let payload = archive.payload_path(&root);
    if !payload.is_file() {
        return Err(SeedbankError::PayloadMissingLocally(archive.uid.to_string()));
    }
    let size = std::fs::metadata(&payload)?.len();
    let strategy = choose_strategy(size, part_size);
    let vault_name = session.config.vault_name.clone();
    let vault = session.vault()?;

    info!(
        "uploading archive {} ({size} bytes) to vault {vault_name}",
        archive.uid
    );
    let receipt = match strategy {
        TransferStrategy::SingleShot => {
            put_single(vault.as_ref(), &vault_name, archive.uid.as_str(), &payload)?
        }
        TransferStrategy::Multipart { .. } => put_multipart(
            vault.as_ref(),
            &vault_name,
            archive.uid.as_str(),
            &payload,
            part_size,
        )?,
    };

    record_upload(session, &archive, &receipt)?;
    Ok(UploadOutcome {
        uid: archive.uid,
        strategy,
        receipt,
    })
}

fn put_single(
    vault: &dyn VaultClient,
    vault_name: &str,
    description: &str,
    payload: &Path,
) -> Result<TransferReceipt> {
    let body = std::fs::read(payload)?;
    let checksum = tree_hash_hex(&body);
    let receipt = vault.put_archive(vault_name, description, &body)?;
    if !receipt.checksum.eq_ignore_ascii_case(&checksum) {
        return Err(SeedbankError::vault(format!(
            "vault reports checksum {} but payload hashes to {checksum}",
            receipt.checksum
        )));
    }
    Ok(receipt)
}

fn put_multipart(
    vault: &dyn VaultClient,
    vault_name: &str,
    description: &str,
    payload: &Path,
    part_size: u64,
) -> Result<TransferReceipt> {
    let mut uploader = ChunkedUploader::new(vault, vault_name, description).with_part_size(part_size);
    uploader.open(payload)?;
    uploader.start_session()?;

    let result = (|| {
        while !uploader.transfer_next_part()? {}
        uploader.complete()
    })();
    if result.is_err() {
        if let Err(e) = uploader.abort() {
            warn!(
                "could not abort multipart session {}: {e}",
                uploader.session_id().unwrap_or("?")
            );
        }
    }
    result
}

/// Commit message recorded for a finished upload.
pub fn upload_message(archive: &Archive, location: &str) -> String {
    let mut message = format!("Upload archive {} to {location}", archive.uid);
    if !archive.description.is_empty() {
        message.push_str("\n\n");
        message.push_str(&archive.description);
    }
    message
}

/// Journal the receipt, rewrite the metadata record, commit it, then drop
/// the journal entry.
fn record_upload(session: &mut Session, archive: &Archive, receipt: &TransferReceipt) -> Result<()> {
    let root = session.root().to_path_buf();
    PendingUpload::new(archive.uid.clone(), receipt.clone()).write(&root)?;
    finish_record(session, archive.uid.as_str(), receipt)?;
    PendingUpload::remove(&root, &archive.uid)
}

/// Apply `receipt` to the archive's metadata record and commit it unless
/// history already holds exactly that record.
pub(crate) fn finish_record(
    session: &mut Session,
    uid: &str,
    receipt: &TransferReceipt,
) -> Result<()> {
    let root = session.root().to_path_buf();
    let archive = session
        .manager
        .get_mut(uid)
        .ok_or_else(|| SeedbankError::ArchiveNotFound(uid.to_string()))?;
    archive.remote_id = receipt.remote_id.clone();
    archive.transfer_receipt = serde_json::to_value(receipt)?;
    let bytes = archive.save(&root)?;
    let message = upload_message(archive, &receipt.location);

    let rel = layout::metadata_rel_path(&archive.uid);
    if session.history().recorded_contents(&rel)?.as_deref() == Some(bytes.as_slice()) {
        return Ok(());
    }
    session.history().commit(&[rel.as_path()], &message)?;
    info!("recorded upload of {uid} as {}", receipt.remote_id);
    Ok(())
}
