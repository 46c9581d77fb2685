//! Entry Extractor: one topic entry in, one [`TopicRecord`] out.

use bcfsync_directory::is_mail_address;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::record::TopicRecord;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("entry is not valid UTF-8")]
    Encoding(#[source] std::str::Utf8Error),

    #[error("malformed markup")]
    Markup(#[source] quick_xml::DeError),

    #[error("markup has no Topic element")]
    MissingTopic,

    #[error("topic Guid is missing or not a UUID: {0:?}")]
    InvalidGuid(String),
}

/// Turns the bytes of one topic entry into a typed record.
///
/// Implementations must be pure functions of the entry so listing and
/// synchronization see the same record.
pub trait EntryExtractor {
    fn extract(&self, entry_name: &str, bytes: &[u8]) -> Result<TopicRecord, ExtractError>;
}

/// Extractor for BCF 2.x `markup.bcf` documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupExtractor;

#[derive(Debug, Deserialize)]
struct MarkupDocument {
    #[serde(rename = "Topic")]
    topic: Option<TopicElement>,
    #[serde(rename = "Comment", default)]
    comments: Vec<CommentElement>,
    #[serde(rename = "Viewpoints", default)]
    viewpoints: Vec<ViewpointElement>,
}

#[derive(Debug, Deserialize)]
struct TopicElement {
    #[serde(rename = "@Guid", default)]
    guid: Option<String>,
    #[serde(rename = "@TopicStatus", default)]
    status: Option<String>,
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Priority", default)]
    priority: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "CreationAuthor", default)]
    creation_author: Option<String>,
    #[serde(rename = "ModifiedAuthor", default)]
    modified_author: Option<String>,
    #[serde(rename = "AssignedTo", default)]
    assigned_to: Option<String>,
    #[serde(rename = "DueDate", default)]
    due_date: Option<String>,
    #[serde(rename = "Labels", default)]
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CommentElement {
    #[serde(rename = "Author", default)]
    author: Option<String>,
    #[serde(rename = "ModifiedAuthor", default)]
    modified_author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ViewpointElement {
    #[serde(rename = "@Guid", default)]
    #[allow(dead_code)]
    guid: Option<String>,
}

impl EntryExtractor for MarkupExtractor {
    fn extract(&self, _entry_name: &str, bytes: &[u8]) -> Result<TopicRecord, ExtractError> {
        let text = std::str::from_utf8(bytes).map_err(ExtractError::Encoding)?;
        let text = text.trim_start_matches('\u{feff}');
        let document: MarkupDocument = quick_xml::de::from_str(text).map_err(ExtractError::Markup)?;
        let topic = document.topic.ok_or(ExtractError::MissingTopic)?;

        let guid = topic.guid.as_deref().map(str::trim).unwrap_or_default();
        let uuid = Uuid::parse_str(guid).map_err(|_| ExtractError::InvalidGuid(guid.to_string()))?;

        let author = non_blank(topic.creation_author);
        let modified_author = non_blank(topic.modified_author);
        let assignee = non_blank(topic.assigned_to);

        let mut people: Vec<String> = Vec::new();
        let comment_people = document
            .comments
            .iter()
            .flat_map(|c| [c.author.clone(), c.modified_author.clone()]);
        let candidates = [author.clone(), modified_author.clone(), assignee.clone()]
            .into_iter()
            .chain(comment_people);
        for token in candidates.filter_map(non_blank) {
            if !people.contains(&token) {
                people.push(token);
            }
        }
        let mail_addresses = people
            .iter()
            .filter(|token| is_mail_address(token))
            .cloned()
            .collect();

        let mut labels: Vec<String> = Vec::new();
        for label in topic.labels.into_iter().filter_map(|l| non_blank(Some(l))) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        Ok(TopicRecord {
            uuid,
            title: non_blank(topic.title).unwrap_or_default(),
            priority: non_blank(topic.priority),
            status: non_blank(topic.status),
            description: non_blank(topic.description),
            author,
            assignee,
            modified_author,
            due_date: non_blank(topic.due_date).as_deref().and_then(parse_due_date),
            labels,
            viewpoint_count: document.viewpoints.len(),
            comments_count: document.comments.len(),
            people,
            mail_addresses,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// RFC 3339 date-time, naive date-time, or plain date; anything else is
/// treated as "no due date".
fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.date_naive());
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(at.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID: &str = "2a2b4f3e-6d1c-4c1e-9a55-0d6a4a0b1c11";

    fn markup(topic_body: &str, tail: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<Markup xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Header><File IfcProject="0M6o7Znnv7hxsbWgeu7oQq"><Filename>tower.ifc</Filename></File></Header>
  <Topic Guid="{GUID}" TopicType="Clash" TopicStatus="Open">
{topic_body}
  </Topic>
{tail}
</Markup>"#
        )
    }

    #[test]
    fn extracts_topic_fields_and_people() {
        let xml = markup(
            r#"    <ReferenceLink>https://example.com/ref</ReferenceLink>
    <Title> Duct clashes with beam </Title>
    <Priority>High</Priority>
    <Labels>MEP</Labels>
    <Labels>Structure</Labels>
    <CreationDate>2024-03-01T09:00:00Z</CreationDate>
    <CreationAuthor>a@example.com</CreationAuthor>
    <ModifiedAuthor>Jane Doe</ModifiedAuthor>
    <DueDate>2024-05-01T00:00:00+02:00</DueDate>
    <AssignedTo>b@example.com</AssignedTo>
    <Description>Level 3, grid C4</Description>"#,
            r#"  <Comment Guid="c1">
    <Date>2024-03-02T10:00:00Z</Date>
    <Author>a@example.com</Author>
    <Comment>Please check</Comment>
    <Viewpoint Guid="v1"/>
  </Comment>
  <Comment Guid="c2">
    <Date>2024-03-03T10:00:00Z</Date>
    <Author>C@Example.com</Author>
    <Comment>Checked</Comment>
    <ModifiedAuthor>Site Office</ModifiedAuthor>
  </Comment>
  <Viewpoints Guid="v1"><Viewpoint>viewpoint.bcfv</Viewpoint><Snapshot>snapshot.png</Snapshot></Viewpoints>"#,
        );

        let record = MarkupExtractor
            .extract("t/markup.bcf", xml.as_bytes())
            .expect("markup should extract");

        assert_eq!(record.uuid.to_string(), GUID);
        assert_eq!(record.title, "Duct clashes with beam");
        assert_eq!(record.priority.as_deref(), Some("High"));
        assert_eq!(record.status.as_deref(), Some("Open"));
        assert_eq!(record.description.as_deref(), Some("Level 3, grid C4"));
        assert_eq!(record.author.as_deref(), Some("a@example.com"));
        assert_eq!(record.assignee.as_deref(), Some("b@example.com"));
        assert_eq!(record.modified_author.as_deref(), Some("Jane Doe"));
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(record.labels, vec!["MEP", "Structure"]);
        assert_eq!(record.comments_count, 2);
        assert_eq!(record.viewpoint_count, 1);
        assert_eq!(
            record.people,
            vec![
                "a@example.com",
                "Jane Doe",
                "b@example.com",
                "C@Example.com",
                "Site Office"
            ]
        );
        assert_eq!(
            record.mail_addresses,
            vec!["a@example.com", "b@example.com", "C@Example.com"]
        );
    }

    #[test]
    fn empty_optional_elements_read_as_none() {
        let xml = markup("    <Title>Minimal</Title>\n    <Description/>", "");
        let record = MarkupExtractor
            .extract("t/markup.bcf", xml.as_bytes())
            .expect("markup should extract");
        assert_eq!(record.description, None);
        assert_eq!(record.due_date, None);
        assert!(record.labels.is_empty());
        assert!(record.people.is_empty());
        assert_eq!(record.comments_count, 0);
    }

    #[test]
    fn labels_are_trimmed_and_deduplicated() {
        let xml = markup(
            "    <Title>Labelled</Title>\n    <Labels> MEP </Labels>\n    <Labels/>\n    \
             <Labels>MEP</Labels>\n    <Labels>Fire</Labels>",
            "",
        );
        let record = MarkupExtractor
            .extract("t/markup.bcf", xml.as_bytes())
            .expect("markup should extract");
        assert_eq!(record.labels, vec!["MEP", "Fire"]);
    }

    #[test]
    fn invalid_guid_is_rejected() {
        let xml = r#"<Markup><Topic Guid="not-a-uuid"><Title>x</Title></Topic></Markup>"#;
        let err = MarkupExtractor
            .extract("t/markup.bcf", xml.as_bytes())
            .expect_err("bad guid must fail");
        assert!(matches!(err, ExtractError::InvalidGuid(guid) if guid == "not-a-uuid"));
    }

    #[test]
    fn missing_topic_is_rejected() {
        let err = MarkupExtractor
            .extract("t/markup.bcf", b"<Markup><Header/></Markup>")
            .expect_err("no topic must fail");
        assert!(matches!(err, ExtractError::MissingTopic));
    }

    #[test]
    fn non_utf8_is_rejected() {
        let err = MarkupExtractor
            .extract("t/markup.bcf", &[0xff, 0xfe, 0x00])
            .expect_err("binary must fail");
        assert!(matches!(err, ExtractError::Encoding(_)));
    }

    #[test]
    fn due_date_accepts_plain_dates() {
        assert_eq!(parse_due_date("2024-12-24"), NaiveDate::from_ymd_opt(2024, 12, 24));
        assert_eq!(
            parse_due_date("2024-12-24T08:30:00"),
            NaiveDate::from_ymd_opt(2024, 12, 24)
        );
        assert_eq!(parse_due_date("next week"), None);
    }
}
