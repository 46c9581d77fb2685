//! In-memory directory snapshot and its mutation rules.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::mail::{is_mail_address, mail_key};
use crate::user::{DirectoryUser, Membership, Role};

/// Errors raised by directory lookups and mutations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory I/O error: {0}")]
    Io(String),

    #[error("directory parse error: {0}")]
    Parse(String),

    #[error("directory serialization error: {0}")]
    Serialize(String),

    #[error("directory lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("not a valid mail address: {0}")]
    InvalidMail(String),

    #[error("mail address already taken: {0}")]
    MailTaken(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("at least one role is required to grant a membership")]
    NoRoles,
}

/// Users, roles and known projects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    #[serde(default)]
    pub users: BTreeMap<String, DirectoryUser>,
    #[serde(default)]
    pub roles: BTreeMap<String, Role>,
}

impl Directory {
    /// A directory with the stock `member` and `reader` roles.
    pub fn with_default_roles() -> Self {
        let mut directory = Self::default();
        for (id, name) in [("member", "Member"), ("reader", "Reader")] {
            directory.roles.insert(
                id.to_string(),
                Role {
                    id: id.to_string(),
                    name: name.to_string(),
                },
            );
        }
        directory
    }

    pub fn user(&self, id: &str) -> Option<&DirectoryUser> {
        self.users.get(id)
    }

    pub fn user_by_mail(&self, mail: &str) -> Option<&DirectoryUser> {
        let key = mail_key(mail);
        self.users.values().find(|user| user.mail_key() == key)
    }

    /// Users whose mail key is in `mail_keys` (already lower-cased).
    ///
    /// Memberships travel with each user, so callers can partition by
    /// project without a second lookup.
    pub fn users_by_mail_keys(&self, mail_keys: &BTreeSet<String>) -> Vec<DirectoryUser> {
        self.users
            .values()
            .filter(|user| mail_keys.contains(&user.mail_key()))
            .cloned()
            .collect()
    }

    /// Accounts occupying a license seat.
    pub fn active_user_count(&self) -> usize {
        self.users
            .values()
            .filter(|user| user.status.holds_seat())
            .count()
    }

    /// Insert a fully-formed account. Mail must be valid and unused.
    pub fn add_user(&mut self, user: DirectoryUser) -> Result<&DirectoryUser, DirectoryError> {
        if !is_mail_address(user.mail.trim()) {
            return Err(DirectoryError::InvalidMail(user.mail));
        }
        if self.user_by_mail(&user.mail).is_some() {
            return Err(DirectoryError::MailTaken(user.mail));
        }
        let id = user.id.clone();
        Ok(self.users.entry(id).or_insert(user))
    }

    /// Create an invited account bound to `mail`.
    pub fn provision_user(&mut self, mail: &str) -> Result<&DirectoryUser, DirectoryError> {
        let id = Uuid::new_v4().to_string();
        self.add_user(DirectoryUser::invited(id, mail))
    }

    /// Grant `user_id` membership in `project_id` with `role_ids`.
    ///
    /// An existing membership gains any roles it lacks.
    pub fn add_membership(
        &mut self,
        user_id: &str,
        project_id: &str,
        role_ids: &[String],
    ) -> Result<Membership, DirectoryError> {
        if role_ids.is_empty() {
            return Err(DirectoryError::NoRoles);
        }
        if let Some(unknown) = role_ids.iter().find(|id| !self.roles.contains_key(*id)) {
            return Err(DirectoryError::UnknownRole(unknown.clone()));
        }

        let user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::UserNotFound(user_id.to_string()))?;

        let index = match user
            .memberships
            .iter()
            .position(|m| m.project_id == project_id)
        {
            Some(index) => index,
            None => {
                user.memberships.push(Membership {
                    project_id: project_id.to_string(),
                    role_ids: Vec::new(),
                });
                user.memberships.len() - 1
            }
        };

        let membership = &mut user.memberships[index];
        for role_id in role_ids {
            if !membership.role_ids.contains(role_id) {
                membership.role_ids.push(role_id.clone());
            }
        }
        Ok(membership.clone())
    }
}
