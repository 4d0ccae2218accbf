pub(crate) mod create;
pub(crate) mod download;
pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod repair;
pub(crate) mod show;
pub(crate) mod upload;
