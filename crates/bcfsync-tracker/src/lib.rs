//! # bcfsync-tracker
//!
//! Host-project issue tracker used as the synchronization target of BCF
//! imports.
//!
//! This crate provides:
//! - `Issue` (the tracked work item) and its validation rules
//! - JSONL read/write (portable persistence)
//! - `IssueStore` (canonical in-memory state, per-project numbering)
//! - `mutate_store_jsonl` (lock-scoped read/modify/write of the issues file)
//!
//! It knows nothing about archives or directories; the import pipeline in
//! `bcfsync-import` drives it.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one line per issue)
//!     ↕  load / save (under <issues>.lock)
//! IssueStore (deterministic in-memory projection)
//! ```

pub mod atomic_store;
pub mod hash;
pub mod issue;
pub mod jsonl;
pub mod store;

pub use atomic_store::{AtomicStoreMutationError, issue_lock_path, mutate_store_jsonl};
pub use hash::{ContentHash, ContentHashBuilder};
pub use issue::{
    DEFAULT_PRIORITY, DEFAULT_STATUS, Issue, IssueValidationError, MAX_TITLE_LENGTH,
};
pub use jsonl::{JsonlError, read_issues, read_issues_from_path, write_issues, write_issues_to_path};
pub use store::{IssueStore, IssueStoreError};
