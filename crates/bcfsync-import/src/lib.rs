//! # bcfsync-import
//!
//! Imports a BCF archive into a project of the host issue tracker.
//!
//! ```text
//! TopicArchive ──► EntryExtractor ──► ParticipantReconciler
//!                                          │
//!                                   InvitationGate (mutates directory)
//!                                          │  clear_cache()
//!                                          ▼
//!                                      TopicSync ──► IssueMaterializer
//! ```
//!
//! The collaborators the pipeline does not own (markup parsing, the user
//! directory, the license, issue persistence) sit behind the traits in
//! [`extractor`], [`directory`] and [`materializer`]; this crate ships
//! implementations backed by `bcfsync-directory` and `bcfsync-tracker`.

pub mod archive;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod gate;
pub mod materializer;
pub mod options;
pub mod reconcile;
pub mod record;
pub mod sync;

pub use archive::{ArchiveError, TOPIC_DESCRIPTOR_SUFFIX, TopicArchive, TopicEntry};
pub use directory::{SeatLicense, UserDirectory};
pub use error::{ImportError, ImportFailure, error_chain};
pub use extractor::{EntryExtractor, ExtractError, MarkupExtractor};
pub use gate::{GateOutcome, InvitationGate};
pub use materializer::{
    IssueMaterializer, MaterializeError, ParticipantIndex, SyncRequest, SyncedIssue,
    TrackerMaterializer,
};
pub use options::{ADD_ACTION, ANONYMIZE_ACTION, INVITE_ACTION, ImportOptions};
pub use reconcile::{
    ParticipantReconciler, collect_mails, collect_people, invalid_people, partition_members,
    unknown_mails,
};
pub use record::{TopicRecord, TopicSummary};
pub use sync::{ImportOutcome, ImportReport, ImportRequest, SyncState, TopicSync};
