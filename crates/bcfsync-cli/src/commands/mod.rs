pub mod import;
pub mod init;
pub mod preview;
pub mod topics;
pub mod user;
