use seedbank_types::ArchiveUid;
use tracing::{info, warn};

use crate::commands::upload::finish_record;
use crate::error::Result;
use crate::journal::PendingUpload;
use crate::session::Session;

/// Run `sb repair`: finish recording uploads that reached the vault but
/// never made it into history. Returns the uids that were repaired.
pub fn run(session: &mut Session) -> Result<Vec<ArchiveUid>> {
    let root = session.root().to_path_buf();
    let mut repaired = Vec::new();
    for pending in PendingUpload::load_all(&root)? {
        let Some(archive) = session.manager.get(pending.uid.as_str()) else {
            warn!(
                "pending upload {} has no metadata record; leaving it in place",
                pending.uid
            );
            continue;
        };
        if archive.is_uploaded() && archive.remote_id != pending.receipt.remote_id {
            warn!(
                "archive {} is recorded as {} but the journal says {}; leaving it in place",
                pending.uid, archive.remote_id, pending.receipt.remote_id
            );
            continue;
        }
        finish_record(session, pending.uid.as_str(), &pending.receipt)?;
        PendingUpload::remove(&root, &pending.uid)?;
        info!("repaired upload record for {}", pending.uid);
        repaired.push(pending.uid);
    }
    Ok(repaired)
}
