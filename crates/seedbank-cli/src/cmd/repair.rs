use std::path::Path;

use seedbank_core::commands;
use seedbank_core::session::Session;

pub(crate) fn run_repair(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(root)?;
    let repaired = commands::repair::run(&mut session)?;
    if repaired.is_empty() {
        println!("Nothing to repair.");
        return Ok(());
    }
    for uid in &repaired {
        println!("Recorded upload of {uid}");
    }
    println!("Repaired {} upload record(s).", repaired.len());
    Ok(())
}
