//! # bcfsync-directory
//!
//! The host system's user directory: accounts addressed by mail, their
//! project memberships and roles, and the license seat policy that caps
//! how many accounts may exist.
//!
//! State is one JSON snapshot (`directory.json`). Mutations go through
//! [`DirectoryFile`], which reloads, mutates and rewrites the snapshot
//! under an exclusive `<snapshot>.lock` file.

pub mod directory;
pub mod file;
pub mod license;
pub mod mail;
pub mod user;

pub use directory::{Directory, DirectoryError};
pub use file::{DirectoryFile, directory_lock_path};
pub use license::SeatPolicy;
pub use mail::{is_mail_address, mail_key};
pub use user::{DirectoryUser, Membership, Role, UserStatus};
