//! Issue Materializer: topic record in, persisted tracker issue out.

use bcfsync_directory::{DirectoryUser, mail_key};
use bcfsync_tracker::{
    AtomicStoreMutationError, DEFAULT_PRIORITY, DEFAULT_STATUS, Issue, IssueStoreError,
    IssueValidationError, mutate_store_jsonl,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::record::TopicRecord;

/// An unanticipated persistence failure. Aborts the whole import.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Store(#[from] AtomicStoreMutationError<IssueStoreError>),

    #[error("issue backend failure: {0}")]
    Backend(String),
}

/// Person tokens of the archive resolved against the directory.
///
/// Built from the reconciler's sets after the gate ran, so accounts it
/// provisioned resolve like any other.
#[derive(Debug, Clone, Default)]
pub struct ParticipantIndex {
    by_mail: BTreeMap<String, DirectoryUser>,
    assignable: BTreeSet<String>,
    invalid_people: Arc<BTreeSet<String>>,
    anonymize_invalid: bool,
}

impl ParticipantIndex {
    pub fn new(
        project_id: &str,
        known_users: &[DirectoryUser],
        invalid_people: Arc<BTreeSet<String>>,
        anonymize_invalid: bool,
    ) -> Self {
        let by_mail = known_users
            .iter()
            .map(|user| (user.mail_key(), user.clone()))
            .collect();
        let assignable = known_users
            .iter()
            .filter(|user| user.is_member_of(project_id))
            .map(|user| user.id.clone())
            .collect();
        Self {
            by_mail,
            assignable,
            invalid_people,
            anonymize_invalid,
        }
    }

    /// The directory user a token names, matched case-insensitively.
    pub fn resolve(&self, token: &str) -> Option<&DirectoryUser> {
        self.by_mail.get(&mail_key(token))
    }

    /// Author-like field value: the user id when the token resolves,
    /// otherwise the raw token (or nothing when anonymizing it).
    pub fn person(&self, token: Option<&str>) -> String {
        let Some(token) = token else {
            return String::new();
        };
        if let Some(user) = self.resolve(token) {
            return user.id.clone();
        }
        if self.anonymize_invalid && self.invalid_people.contains(token) {
            return String::new();
        }
        token.to_string()
    }

    /// Assignee field value; only resolvable users can be assigned.
    pub fn assignee(&self, token: Option<&str>) -> String {
        token
            .and_then(|token| self.resolve(token))
            .map(|user| user.id.clone())
            .unwrap_or_default()
    }

    /// Whether `user_id` is a member of the target project.
    pub fn is_assignable(&self, user_id: &str) -> bool {
        self.assignable.contains(user_id)
    }
}

/// One topic to synchronize into `project_id`.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'r> {
    pub project_id: &'r str,
    pub record: &'r TopicRecord,
    pub participants: &'r ParticipantIndex,
}

/// The materialized issue and what happened to it.
///
/// `saved == false` with non-empty `errors` is a per-topic validation
/// failure, not an error of the import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedIssue {
    pub issue: Issue,
    pub saved: bool,
    pub created: bool,
    pub errors: Vec<IssueValidationError>,
}

pub trait IssueMaterializer {
    /// Build or update the issue for one topic, validate it, and persist it
    /// when valid.
    fn synchronize(&self, request: &SyncRequest<'_>) -> Result<SyncedIssue, MaterializeError>;
}

/// Materializes into a `bcfsync-tracker` JSONL issues file.
#[derive(Debug, Clone)]
pub struct TrackerMaterializer {
    issues_path: PathBuf,
}

impl TrackerMaterializer {
    pub fn new(issues_path: impl Into<PathBuf>) -> Self {
        Self {
            issues_path: issues_path.into(),
        }
    }

    pub fn issues_path(&self) -> &Path {
        &self.issues_path
    }
}

impl IssueMaterializer for TrackerMaterializer {
    fn synchronize(&self, request: &SyncRequest<'_>) -> Result<SyncedIssue, MaterializeError> {
        let synced = mutate_store_jsonl::<_, IssueStoreError, _>(&self.issues_path, |store| {
            let existing = store
                .issue_for_topic(request.project_id, request.record.uuid)
                .cloned();
            let created = existing.is_none();
            let mut issue = existing.clone().unwrap_or_else(|| {
                let mut issue = Issue::new(request.project_id, request.record.title.as_str());
                issue.topic_uuid = Some(request.record.uuid);
                issue
            });
            apply_record(&mut issue, request);

            let errors = issue.validate(|user_id| request.participants.is_assignable(user_id));
            if !errors.is_empty() {
                let synced = SyncedIssue {
                    issue,
                    saved: false,
                    created,
                    errors,
                };
                return Ok((synced, false));
            }

            if let Some(existing) = existing
                && existing.content_hash() == issue.content_hash()
                && existing.metadata == issue.metadata
            {
                let synced = SyncedIssue {
                    issue: existing,
                    saved: true,
                    created: false,
                    errors: Vec::new(),
                };
                return Ok((synced, false));
            }

            let stored = store.save_issue(issue)?.clone();
            let synced = SyncedIssue {
                issue: stored,
                saved: true,
                created,
                errors: Vec::new(),
            };
            Ok((synced, true))
        })?;
        Ok(synced)
    }
}

fn apply_record(issue: &mut Issue, request: &SyncRequest<'_>) {
    let record = request.record;
    let people = request.participants;

    issue.title = record.title.clone();
    issue.description = record.description.clone().unwrap_or_default();
    issue.priority = record
        .priority
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_PRIORITY.to_string());
    let status = record
        .status
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| DEFAULT_STATUS.to_string());
    if status != issue.status {
        issue.set_status(status);
    }
    issue.due_date = record.due_date;
    issue.labels = record.labels.clone();

    issue.author = people.person(record.author.as_deref());
    issue.modified_author = people.person(record.modified_author.as_deref());
    issue.assignee = people.assignee(record.assignee.as_deref());

    issue.metadata = Some(json!({
        "bcf": {
            "viewpointCount": record.viewpoint_count,
            "commentsCount": record.comments_count,
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use bcfsync_directory::Membership;
    use bcfsync_tracker::IssueStore;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    fn temp_issues_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("bcfsync-materialize-{prefix}-{}-{unique}", std::process::id()))
            .join("issues.jsonl")
    }

    fn member(id: &str, mail: &str, project: &str) -> DirectoryUser {
        let mut user = DirectoryUser::invited(id, mail);
        user.memberships.push(Membership {
            project_id: project.to_string(),
            role_ids: vec!["member".to_string()],
        });
        user
    }

    fn index(anonymize: bool) -> ParticipantIndex {
        let known = [
            member("u-a", "A@Example.com", "site"),
            member("u-b", "b@example.com", "elsewhere"),
        ];
        let invalid = Arc::new(BTreeSet::from(["Site Office".to_string()]));
        ParticipantIndex::new("site", &known, invalid, anonymize)
    }

    fn record(title: &str) -> TopicRecord {
        let mut record = TopicRecord::new(Uuid::new_v4(), title);
        record.status = Some("Open".to_string());
        record.priority = Some("High".to_string());
        record.author = Some("a@example.com".to_string());
        record.modified_author = Some("Site Office".to_string());
        record.assignee = Some("a@example.com".to_string());
        record.comments_count = 2;
        record
    }

    #[test]
    fn index_resolves_people() {
        let index = index(false);
        assert_eq!(index.person(Some("a@EXAMPLE.com")), "u-a");
        assert_eq!(index.person(Some("Site Office")), "Site Office");
        assert_eq!(index.person(None), "");
        assert_eq!(index.assignee(Some("nobody@example.com")), "");
        assert!(index.is_assignable("u-a"));
        assert!(!index.is_assignable("u-b"));

        assert_eq!(self::index(true).person(Some("Site Office")), "");
    }

    #[test]
    fn creates_then_updates_in_place() {
        let path = temp_issues_path("update");
        let materializer = TrackerMaterializer::new(&path);
        let participants = index(false);
        let mut record = record("Duct clash");

        let first = materializer
            .synchronize(&SyncRequest {
                project_id: "site",
                record: &record,
                participants: &participants,
            })
            .expect("first sync");
        assert!(first.saved && first.created);
        assert_eq!(first.issue.id, "site-1");
        assert_eq!(first.issue.status, "open");
        assert_eq!(first.issue.priority, "high");
        assert_eq!(first.issue.author, "u-a");
        assert_eq!(first.issue.assignee, "u-a");
        assert_eq!(first.issue.modified_author, "Site Office");
        assert_eq!(
            first.issue.metadata,
            Some(json!({"bcf": {"viewpointCount": 0, "commentsCount": 2}}))
        );

        let again = materializer
            .synchronize(&SyncRequest {
                project_id: "site",
                record: &record,
                participants: &participants,
            })
            .expect("unchanged sync");
        assert!(again.saved && !again.created);
        assert_eq!(again.issue.updated_at, first.issue.updated_at);

        record.status = Some("Closed".to_string());
        let closed = materializer
            .synchronize(&SyncRequest {
                project_id: "site",
                record: &record,
                participants: &participants,
            })
            .expect("update sync");
        assert!(closed.saved && !closed.created);
        assert_eq!(closed.issue.id, "site-1");
        assert!(closed.issue.closed_at.is_some());

        record.labels = vec!["MEP".to_string(), "Structure".to_string()];
        let labelled = materializer
            .synchronize(&SyncRequest {
                project_id: "site",
                record: &record,
                participants: &participants,
            })
            .expect("label sync");
        assert!(labelled.saved && !labelled.created);
        assert_eq!(labelled.issue.labels, vec!["MEP", "Structure"]);
        assert_ne!(labelled.issue.content_hash(), closed.issue.content_hash());

        let store = IssueStore::load_jsonl(&path).expect("reload");
        assert_eq!(store.len(), 1);
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn invalid_issue_is_returned_unsaved() {
        let path = temp_issues_path("invalid");
        let materializer = TrackerMaterializer::new(&path);
        let participants = index(false);
        let mut record = record("Assigned elsewhere");
        record.assignee = Some("b@example.com".to_string());

        let synced = materializer
            .synchronize(&SyncRequest {
                project_id: "site",
                record: &record,
                participants: &participants,
            })
            .expect("validation failure is not an error");
        assert!(!synced.saved);
        assert_eq!(
            synced.errors,
            vec![IssueValidationError::AssigneeNotMember {
                assignee: "u-b".to_string()
            }]
        );
        assert!(!path.exists());
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn numbering_continues_per_project() {
        let path = temp_issues_path("numbering");
        let materializer = TrackerMaterializer::new(&path);
        let participants = index(false);

        for expected in ["site-1", "site-2", "site-3"] {
            let synced = materializer
                .synchronize(&SyncRequest {
                    project_id: "site",
                    record: &record("topic"),
                    participants: &participants,
                })
                .expect("sync");
            assert_eq!(synced.issue.id, expected);
        }
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }
}
