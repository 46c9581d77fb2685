//! Canonical in-memory representation of tracker state.
//!
//! This is the memory boundary for `bcfsync-tracker`:
//! - load/store JSONL
//! - deterministic lookups by id and by imported topic
//! - per-project number allocation

use crate::issue::Issue;
use crate::jsonl::{JsonlError, read_issues_from_path, write_issues_to_path};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Errors raised while loading or mutating the issue store.
#[derive(Debug, thiserror::Error)]
pub enum IssueStoreError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("issue not found: {0}")]
    IssueNotFound(String),

    #[error("issue {id} belongs to project {actual}, not {expected}")]
    ProjectMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}

/// Canonical in-memory state for issues, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct IssueStore {
    issues: BTreeMap<String, Issue>,
}

impl IssueStore {
    /// Build a store from materialized issues.
    ///
    /// Duplicate ids resolve last-write-wins.
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let issues = issues
            .into_iter()
            .map(|issue| (issue.id.clone(), issue))
            .collect();
        Self { issues }
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, IssueStoreError> {
        Ok(Self::from_issues(read_issues_from_path(path)?))
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), IssueStoreError> {
        let issues: Vec<Issue> = self.issues.values().cloned().collect();
        write_issues_to_path(path, &issues)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.get(id)
    }

    /// Iterate all issues in deterministic id order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.values()
    }

    /// Iterate the issues of one project.
    pub fn project_issues<'a, 'p>(
        &'a self,
        project_id: &'p str,
    ) -> impl Iterator<Item = &'a Issue> + use<'a, 'p> {
        self.issues
            .values()
            .filter(move |issue| issue.project_id == project_id)
    }

    /// The issue previously imported from `topic_uuid` into `project_id`.
    pub fn issue_for_topic(&self, project_id: &str, topic_uuid: Uuid) -> Option<&Issue> {
        self.project_issues(project_id)
            .find(|issue| issue.topic_uuid == Some(topic_uuid))
    }

    /// Next free number in `project_id` (1-based, never reused).
    pub fn next_number(&self, project_id: &str) -> u64 {
        self.project_issues(project_id)
            .map(|issue| issue.number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Persist `issue` into the store, numbering it if it is new.
    ///
    /// Returns the stored copy. An already-numbered issue must exist and
    /// stay in its project.
    pub fn save_issue(&mut self, mut issue: Issue) -> Result<&Issue, IssueStoreError> {
        if issue.is_persisted() {
            let existing = self
                .issues
                .get(&issue.id)
                .ok_or_else(|| IssueStoreError::IssueNotFound(issue.id.clone()))?;
            if existing.project_id != issue.project_id {
                return Err(IssueStoreError::ProjectMismatch {
                    id: issue.id.clone(),
                    expected: existing.project_id.clone(),
                    actual: issue.project_id.clone(),
                });
            }
        } else {
            issue.number = self.next_number(&issue.project_id);
            issue.id = Issue::format_id(&issue.project_id, issue.number);
        }
        issue.touch_updated_at();

        let id = issue.id.clone();
        self.issues.insert(id.clone(), issue);
        self.issues
            .get(&id)
            .ok_or(IssueStoreError::IssueNotFound(id))
    }
}
