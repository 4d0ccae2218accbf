pub mod create;
pub mod download;
pub mod init;
pub mod list;
pub mod repair;
pub mod show;
pub mod upload;
