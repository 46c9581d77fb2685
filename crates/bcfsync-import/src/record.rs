//! Typed records extracted from topic entries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Everything the pipeline needs from one topic descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecord {
    pub uuid: Uuid,
    pub title: String,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub assignee: Option<String>,
    pub modified_author: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Non-blank labels in document order, deduplicated.
    pub labels: Vec<String>,
    pub viewpoint_count: usize,
    pub comments_count: usize,
    /// Every person token the topic references, token-deduplicated.
    pub people: Vec<String>,
    /// The subset of `people` recognized as mail addresses.
    pub mail_addresses: Vec<String>,
}

impl TopicRecord {
    /// A record with only identity and title set.
    pub fn new(uuid: Uuid, title: impl Into<String>) -> Self {
        Self {
            uuid,
            title: title.into(),
            priority: None,
            status: None,
            description: None,
            author: None,
            assignee: None,
            modified_author: None,
            due_date: None,
            labels: Vec::new(),
            viewpoint_count: 0,
            comments_count: 0,
            people: Vec::new(),
            mail_addresses: Vec::new(),
        }
    }
}

/// A listing row: the record plus the entry it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub entry: String,
    #[serde(flatten)]
    pub record: TopicRecord,
}
