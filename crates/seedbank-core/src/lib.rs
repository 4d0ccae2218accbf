pub mod archive;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod journal;
pub mod layout;
pub mod manager;
pub mod payload;
pub mod platform;
pub mod session;
pub mod uploader;

pub use seedbank_types::ArchiveUid;
pub use seedbank_vault::{PART_SIZE, VaultClient};

#[cfg(test)]
mod tests;
#[cfg(test)]
mod testutil;
