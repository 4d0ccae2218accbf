use std::path::Path;

use seedbank_core::commands;
use seedbank_core::commands::upload::TransferStrategy;
use seedbank_core::session::Session;

use crate::format::format_bytes;
use crate::prompt::confirm;

pub(crate) fn run_upload(
    root: &Path,
    uid_prefix: &str,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(root)?;

    if !yes {
        let archive = session.manager.require(uid_prefix)?;
        let question = format!(
            "Upload archive {} ({}) to vault '{}'?",
            archive.uid.short(),
            format_bytes(archive.size),
            session.config.vault_name
        );
        if !confirm(&question, "--yes")? {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let outcome = commands::upload::run(&mut session, uid_prefix)?;
    let how = match outcome.strategy {
        TransferStrategy::SingleShot => "single request".to_string(),
        TransferStrategy::Multipart { parts } => format!("{parts} parts"),
    };
    println!("Uploaded archive {} ({how})", outcome.uid);
    println!("  remote id: {}", outcome.receipt.remote_id);
    println!("  location:  {}", outcome.receipt.location);
    Ok(())
}
