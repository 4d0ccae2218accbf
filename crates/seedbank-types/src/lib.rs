pub mod archive_uid;
pub mod error;

pub use archive_uid::ArchiveUid;
