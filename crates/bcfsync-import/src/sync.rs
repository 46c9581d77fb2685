//! Topic Synchronization Driver.
//!
//! ```text
//! Idle ─► ArchiveOpen ─► GateEvaluated ─► CacheCleared ─► Synchronizing ─► Done
//!   └──────────┴──────────────┴────────────────┴───────────────┴──► Aborted
//! ```
//!
//! Per-topic validation failures are recorded in the topic's
//! [`ImportOutcome`] and the loop moves on. Anything else aborts the run;
//! issues saved before the abort stay saved.

use bcfsync_directory::DirectoryUser;
use bcfsync_tracker::{Issue, IssueValidationError};
use serde::Serialize;
use std::io::{Read, Seek};
use std::path::Path;
use uuid::Uuid;

use crate::archive::{ArchiveError, TopicArchive};
use crate::directory::{SeatLicense, UserDirectory};
use crate::error::{ImportError, ImportFailure, error_chain};
use crate::extractor::EntryExtractor;
use crate::gate::InvitationGate;
use crate::materializer::{IssueMaterializer, ParticipantIndex, SyncRequest};
use crate::options::ImportOptions;
use crate::reconcile::ParticipantReconciler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    ArchiveOpen,
    GateEvaluated,
    CacheCleared,
    Synchronizing,
    Done,
    Aborted,
}

/// Result for one topic entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub entry: String,
    pub topic_uuid: Uuid,
    /// The materialized issue; unsaved when `errors` is non-empty.
    pub issue: Issue,
    pub saved: bool,
    pub created: bool,
    pub errors: Vec<IssueValidationError>,
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        self.saved && self.errors.is_empty()
    }
}

/// Everything one import did, in archive enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub archive: String,
    pub project_id: String,
    pub outcomes: Vec<ImportOutcome>,
    pub invited: Vec<DirectoryUser>,
    pub enrolled: Vec<DirectoryUser>,
}

impl ImportReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRequest {
    pub project_id: String,
    /// Directory id of the user running the import.
    pub actor_id: String,
    pub options: ImportOptions,
}

impl ImportRequest {
    pub fn new(project_id: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            actor_id: actor_id.into(),
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Drives one import at a time through its collaborators.
pub struct TopicSync<'a> {
    extractor: &'a dyn EntryExtractor,
    directory: &'a dyn UserDirectory,
    license: &'a dyn SeatLicense,
    materializer: &'a dyn IssueMaterializer,
    state: SyncState,
}

impl<'a> TopicSync<'a> {
    pub fn new(
        extractor: &'a dyn EntryExtractor,
        directory: &'a dyn UserDirectory,
        license: &'a dyn SeatLicense,
        materializer: &'a dyn IssueMaterializer,
    ) -> Self {
        Self {
            extractor,
            directory,
            license,
            materializer,
            state: SyncState::Idle,
        }
    }

    /// State reached by the last import (`Idle` before the first).
    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn import_path(
        &mut self,
        path: impl AsRef<Path>,
        request: &ImportRequest,
    ) -> Result<ImportReport, ImportFailure> {
        let path = path.as_ref();
        self.import_with(path.display().to_string(), || TopicArchive::open(path), request)
    }

    /// Import from an in-memory or otherwise seekable archive; `label`
    /// names it in the report and errors.
    pub fn import_reader<R: Read + Seek>(
        &mut self,
        label: &str,
        reader: R,
        request: &ImportRequest,
    ) -> Result<ImportReport, ImportFailure> {
        self.import_with(
            label.to_string(),
            || TopicArchive::from_reader(label, reader),
            request,
        )
    }

    fn import_with<R: Read + Seek>(
        &mut self,
        label: String,
        open: impl FnOnce() -> Result<TopicArchive<R>, ArchiveError>,
        request: &ImportRequest,
    ) -> Result<ImportReport, ImportFailure> {
        self.state = SyncState::Idle;
        tracing::info!(archive = %label, project = %request.project_id, "import started");

        let result = match open() {
            Ok(archive) => self.run(archive, request),
            Err(err) => Err(err.into()),
        };
        result.map_err(|source| self.abort(label, source))
    }

    fn run<R: Read + Seek>(
        &mut self,
        archive: TopicArchive<R>,
        request: &ImportRequest,
    ) -> Result<ImportReport, ImportError> {
        self.enter(SyncState::ArchiveOpen);
        let label = archive.label().to_string();
        let project_id = request.project_id.as_str();
        let mut reconciler =
            ParticipantReconciler::new(archive, project_id, self.extractor, self.directory);

        let gate = InvitationGate::new(self.directory, self.license);
        let gate_outcome = gate.run(&mut reconciler, &request.actor_id, &request.options)?;
        self.enter(SyncState::GateEvaluated);

        reconciler.clear_cache();
        self.enter(SyncState::CacheCleared);

        let listing = reconciler.listing()?;
        let participants = ParticipantIndex::new(
            project_id,
            &reconciler.known_users()?,
            reconciler.invalid_people()?,
            request.options.anonymizes_invalid_people(),
        );

        self.enter(SyncState::Synchronizing);
        let mut outcomes = Vec::with_capacity(listing.len());
        for summary in listing.iter() {
            let sync_request = SyncRequest {
                project_id,
                record: &summary.record,
                participants: &participants,
            };
            let synced = self
                .materializer
                .synchronize(&sync_request)
                .map_err(|source| ImportError::Materialize {
                    entry: summary.entry.clone(),
                    source,
                })?;
            outcomes.push(ImportOutcome {
                entry: summary.entry.clone(),
                topic_uuid: summary.record.uuid,
                issue: synced.issue,
                saved: synced.saved,
                created: synced.created,
                errors: synced.errors,
            });
        }
        self.enter(SyncState::Done);

        let report = ImportReport {
            archive: label,
            project_id: project_id.to_string(),
            outcomes,
            invited: gate_outcome.invited,
            enrolled: gate_outcome.enrolled,
        };
        tracing::info!(
            archive = %report.archive,
            topics = report.outcomes.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            invited = report.invited.len(),
            "import finished"
        );
        Ok(report)
    }

    fn enter(&mut self, next: SyncState) {
        tracing::debug!(from = ?self.state, to = ?next, "import state");
        self.state = next;
    }

    fn abort(&mut self, archive: String, source: ImportError) -> ImportFailure {
        self.enter(SyncState::Aborted);
        let failure = ImportFailure { archive, source };
        tracing::error!(error = %error_chain(&failure), "import aborted");
        failure
    }
}
