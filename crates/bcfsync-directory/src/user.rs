//! Directory accounts, memberships and roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mail::mail_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    /// Provisioned by an import; has not logged in yet.
    Invited,
    Locked,
}

impl UserStatus {
    /// Whether the account occupies a license seat.
    pub fn holds_seat(self) -> bool {
        !matches!(self, UserStatus::Locked)
    }
}

/// A user's relation to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
}

/// An account in the directory, identified by its mail address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub login: String,
    pub mail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub firstname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lastname: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memberships: Vec<Membership>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl DirectoryUser {
    /// An invited account for `mail`, named after the mail's local part.
    pub fn invited(id: impl Into<String>, mail: &str) -> Self {
        let mail = mail.trim().to_string();
        let local = mail.split('@').next().unwrap_or_default();
        let mut names = local.splitn(2, ['.', '_']);
        let firstname = names.next().map(capitalize).unwrap_or_default();
        let lastname = names.next().map(capitalize).unwrap_or_default();
        Self {
            id: id.into(),
            login: mail.clone(),
            mail,
            firstname,
            lastname,
            admin: false,
            status: UserStatus::Invited,
            memberships: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Case-insensitive comparison key of the account's mail.
    pub fn mail_key(&self) -> String {
        mail_key(&self.mail)
    }

    pub fn membership(&self, project_id: &str) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|membership| membership.project_id == project_id)
    }

    pub fn is_member_of(&self, project_id: &str) -> bool {
        self.membership(project_id).is_some()
    }

    /// Display name, falling back to the login.
    pub fn name(&self) -> String {
        let full = format!("{} {}", self.firstname, self.lastname);
        let full = full.trim();
        if full.is_empty() {
            self.login.clone()
        } else {
            full.to_string()
        }
    }
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
