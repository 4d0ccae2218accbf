use std::path::Path;

use chrono::Utc;
use seedbank_types::ArchiveUid;
use tracing::info;

use crate::archive::Archive;
use crate::error::{Result, SeedbankError};
use crate::layout;
use crate::payload::PayloadWriter;
use crate::platform::fs::remove_if_exists;
use crate::session::Session;

/// File in the source directory whose contents become the archive description.
pub const DESCRIPTION_FILE: &str = "description.md";

/// Run `sb create`: bundle `source` into a new local archive.
///
/// The metadata record is written to `meta/` first and the same bytes are
/// then embedded in the payload as `info.json`. Nothing is uploaded.
pub fn run(session: &mut Session, source: &Path) -> Result<ArchiveUid> {
    if !source.is_dir() {
        return Err(SeedbankError::InvalidSourcePath(
            source.display().to_string(),
        ));
    }

    let create_time = Utc::now();
    let mut archive = Archive::new(create_time);
    if session.manager.get(archive.uid.as_str()).is_some() {
        return Err(SeedbankError::DuplicateArchive(archive.uid.to_string()));
    }
    archive.description = read_description(source)?;

    let root = session.root().to_path_buf();
    let payload_path = archive.payload_path(&root);
    // Walk real paths so a repository nested in `source` is recognised.
    let walk_root = std::fs::canonicalize(source)?;
    let skip = layout::unarchived_dirs(&std::fs::canonicalize(&root)?);
    let mut writer = PayloadWriter::create(&payload_path)?;
    writer.add_tree(&walk_root, &skip)?;
    archive.file_list = writer.file_list().to_vec();
    archive.size = writer.close_contents()?;

    let manifest = archive.save(&root)?;
    if let Err(e) = writer.finish(&manifest, create_time) {
        remove_if_exists(&archive.metadata_path(&root))?;
        return Err(e);
    }

    if let Err(e) = session.history().commit(
        &[layout::metadata_rel_path(&archive.uid).as_path()],
        &format!("Create archive {}", archive.uid),
    ) {
        remove_if_exists(&archive.metadata_path(&root))?;
        remove_if_exists(&payload_path)?;
        return Err(e);
    }

    info!(
        "created archive {} from {} ({} files, {} bytes)",
        archive.uid,
        source.display(),
        archive.file_list.len(),
        archive.size
    );
    let uid = archive.uid.clone();
    session.manager.add(archive)?;
    Ok(uid)
}

fn read_description(source: &Path) -> Result<String> {
    match std::fs::read(source.join(DESCRIPTION_FILE)) {
        Ok(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}
