use std::path::Path;

use seedbank_core::commands;
use seedbank_core::session::Session;

use crate::format::{format_bytes, format_time};
use crate::table::{add_kv_row, CliTableTheme};

pub(crate) fn run_show(
    root: &Path,
    uid_prefix: &str,
    files: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open(root)?;
    let details = commands::show::run(&session, uid_prefix)?;
    let archive = &details.archive;

    let theme = CliTableTheme::detect();
    let mut table = theme.new_kv_table();
    add_kv_row(&mut table, theme, "UID", &archive.uid);
    add_kv_row(&mut table, theme, "Created", format_time(&archive.create_time));
    add_kv_row(&mut table, theme, "Description", archive.summary());
    add_kv_row(&mut table, theme, "Size", format_bytes(archive.size));
    add_kv_row(&mut table, theme, "Files", archive.file_list.len());
    add_kv_row(
        &mut table,
        theme,
        "Payload",
        if details.payload_present {
            "present"
        } else {
            "missing"
        },
    );
    if archive.is_uploaded() {
        add_kv_row(&mut table, theme, "Remote ID", &archive.remote_id);
        if let Some(location) = archive.transfer_receipt.get("location").and_then(|v| v.as_str()) {
            add_kv_row(&mut table, theme, "Location", location);
        }
    } else {
        add_kv_row(&mut table, theme, "Remote ID", "-");
    }
    if let Some(pending) = &details.pending {
        add_kv_row(
            &mut table,
            theme,
            "Pending",
            format!(
                "uploaded as {}, not yet recorded (run `sb repair`)",
                pending.receipt.remote_id
            ),
        );
    }
    println!("{table}");

    if files {
        println!();
        for file in &archive.file_list {
            println!("{file}");
        }
    }
    Ok(())
}
