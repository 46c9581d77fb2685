//! Issue type: the tracked work item a BCF topic synchronizes into.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::ContentHash;

pub const DEFAULT_STATUS: &str = "open";
pub const DEFAULT_PRIORITY: &str = "normal";
pub const MAX_TITLE_LENGTH: usize = 255;

/// An issue in one project of the host tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    // ── Identification ──
    /// `<project>-<number>`, stable once assigned.
    pub id: String,
    pub project_id: String,
    pub number: u64,
    /// The BCF topic this issue was imported from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_uuid: Option<Uuid>,

    // ── Content ──
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    // ── Workflow ──
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    // ── People ──
    /// Directory user id when resolved, otherwise the raw author token.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    /// Directory user id; never free text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignee: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub modified_author: String,

    // ── Timestamps ──
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_priority() -> String {
    DEFAULT_PRIORITY.to_string()
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// A rule an issue broke. Carried as data; never aborts an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueValidationError {
    #[error("title can't be blank")]
    TitleBlank,

    #[error("title is too long ({length} characters, maximum is {MAX_TITLE_LENGTH})")]
    TitleTooLong { length: usize },

    #[error("project can't be blank")]
    ProjectBlank,

    #[error("status can't be blank")]
    StatusBlank,

    #[error("assignee is not a member of the project: {assignee}")]
    AssigneeNotMember { assignee: String },
}

impl Issue {
    /// Create an unnumbered issue for `project_id`.
    ///
    /// The store assigns `number` and `id` on first save.
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            project_id: project_id.into(),
            number: 0,
            topic_uuid: None,
            title: title.into(),
            description: String::new(),
            status: default_status(),
            priority: default_priority(),
            due_date: None,
            author: String::new(),
            assignee: String::new(),
            modified_author: String::new(),
            created_at: now,
            updated_at: now,
            closed_at: None,
            labels: Vec::new(),
            metadata: None,
        }
    }

    /// Format the store id for a project/number pair.
    pub fn format_id(project_id: &str, number: u64) -> String {
        format!("{project_id}-{number}")
    }

    /// Whether the store has assigned this issue a number yet.
    pub fn is_persisted(&self) -> bool {
        self.number > 0 && !self.id.is_empty()
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set status and keep `closed_at` consistent with it.
    pub fn set_status(&mut self, status: String) {
        let closing = is_closed_status(&status);
        self.status = status;
        match (closing, self.closed_at) {
            (true, None) => self.closed_at = Some(Utc::now()),
            (false, Some(_)) => self.closed_at = None,
            _ => {}
        }
        self.touch_updated_at();
    }

    /// Check the tracker's rules.
    ///
    /// `assignable` answers whether a directory user id may be assigned
    /// issues in this issue's project.
    pub fn validate(&self, assignable: impl Fn(&str) -> bool) -> Vec<IssueValidationError> {
        let mut errors = Vec::new();

        let title_length = self.title.trim().chars().count();
        if title_length == 0 {
            errors.push(IssueValidationError::TitleBlank);
        } else if title_length > MAX_TITLE_LENGTH {
            errors.push(IssueValidationError::TitleTooLong {
                length: title_length,
            });
        }
        if self.project_id.trim().is_empty() {
            errors.push(IssueValidationError::ProjectBlank);
        }
        if self.status.trim().is_empty() {
            errors.push(IssueValidationError::StatusBlank);
        }
        if !self.assignee.is_empty() && !assignable(&self.assignee) {
            errors.push(IssueValidationError::AssigneeNotMember {
                assignee: self.assignee.clone(),
            });
        }

        errors
    }

    /// Hash of substantive fields.
    ///
    /// Excludes: id, number, timestamps, metadata. A re-import that
    /// produces the same hash leaves the stored issue untouched.
    pub fn content_hash(&self) -> ContentHash {
        let due = self.due_date.map(|d| d.to_string());
        ContentHash::builder()
            .field("project_id", &self.project_id)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("status", &self.status)
            .field("priority", &self.priority)
            .field_opt("due_date", due.as_deref())
            .field("author", &self.author)
            .field("assignee", &self.assignee)
            .field("modified_author", &self.modified_author)
            .field_int("labels", self.labels.len() as i64)
            .field("label_set", &self.labels.join("\u{1f}"))
            .finish()
    }
}

fn is_closed_status(status: &str) -> bool {
    matches!(
        status.to_ascii_lowercase().as_str(),
        "closed" | "resolved" | "done"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(_: &str) -> bool {
        true
    }

    #[test]
    fn new_issue_is_unpersisted_with_defaults() {
        let issue = Issue::new("demo", "Clash in level 2");
        assert!(!issue.is_persisted());
        assert_eq!(issue.status, DEFAULT_STATUS);
        assert_eq!(issue.priority, DEFAULT_PRIORITY);
        assert!(issue.validate(always).is_empty());
    }

    #[test]
    fn blank_title_is_reported() {
        let issue = Issue::new("demo", "   ");
        assert_eq!(issue.validate(always), vec![IssueValidationError::TitleBlank]);
    }

    #[test]
    fn overlong_title_is_reported() {
        let issue = Issue::new("demo", "x".repeat(MAX_TITLE_LENGTH + 1));
        assert_eq!(
            issue.validate(always),
            vec![IssueValidationError::TitleTooLong {
                length: MAX_TITLE_LENGTH + 1
            }]
        );
    }

    #[test]
    fn unassignable_assignee_is_reported() {
        let mut issue = Issue::new("demo", "Door clash");
        issue.assignee = "u-1".to_string();
        let errors = issue.validate(|_| false);
        assert_eq!(
            errors,
            vec![IssueValidationError::AssigneeNotMember {
                assignee: "u-1".to_string()
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            "assignee is not a member of the project: u-1"
        );
    }

    #[test]
    fn closing_status_sets_and_clears_closed_at() {
        let mut issue = Issue::new("demo", "Slab opening");
        issue.set_status("Closed".to_string());
        assert!(issue.closed_at.is_some());
        issue.set_status("open".to_string());
        assert!(issue.closed_at.is_none());
    }

    #[test]
    fn content_hash_ignores_volatile_fields() {
        let mut a = Issue::new("demo", "Duct clash");
        let mut b = a.clone();
        b.id = "demo-9".to_string();
        b.number = 9;
        b.touch_updated_at();
        assert_eq!(a.content_hash(), b.content_hash());

        a.description = "changed".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn issue_parses_minimal_json_line() {
        let raw = r#"{"id":"demo-1","project_id":"demo","number":1,"title":"Beam"}"#;
        let issue: Issue = serde_json::from_str(raw).expect("minimal issue should parse");
        assert_eq!(issue.status, DEFAULT_STATUS);
        assert!(issue.topic_uuid.is_none());
    }
}
