//! Caller-supplied import options.

use serde::{Deserialize, Serialize};

pub const INVITE_ACTION: &str = "invite";
pub const ADD_ACTION: &str = "add";
pub const ANONYMIZE_ACTION: &str = "anonymize";

/// What to do about the people an archive references.
///
/// Field names follow the wire names callers send (`unknownMailsAction`,
/// ...). Any action value other than the recognized one means "do
/// nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_mails_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_mails_invite_role_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_members_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_members_add_role_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_people_action: Option<String>,
}

impl ImportOptions {
    pub fn invite_unknown(mut self, role_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.unknown_mails_action = Some(INVITE_ACTION.to_string());
        self.unknown_mails_invite_role_ids = role_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_non_members(
        mut self,
        role_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.non_members_action = Some(ADD_ACTION.to_string());
        self.non_members_add_role_ids = role_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn anonymize_invalid(mut self) -> Self {
        self.invalid_people_action = Some(ANONYMIZE_ACTION.to_string());
        self
    }

    /// Roles to grant invited users, when invitation is requested.
    pub fn invite_role_ids(&self) -> Option<&[String]> {
        action_roles(
            self.unknown_mails_action.as_deref(),
            INVITE_ACTION,
            &self.unknown_mails_invite_role_ids,
        )
    }

    /// Roles to grant known non-members, when enrolment is requested.
    pub fn non_member_role_ids(&self) -> Option<&[String]> {
        action_roles(
            self.non_members_action.as_deref(),
            ADD_ACTION,
            &self.non_members_add_role_ids,
        )
    }

    pub fn anonymizes_invalid_people(&self) -> bool {
        self.invalid_people_action.as_deref() == Some(ANONYMIZE_ACTION)
    }

    /// Whether the gate has any directory work to do.
    pub fn requests_directory_changes(&self) -> bool {
        self.invite_role_ids().is_some() || self.non_member_role_ids().is_some()
    }
}

fn action_roles<'a>(action: Option<&str>, expected: &str, roles: &'a [String]) -> Option<&'a [String]> {
    (action == Some(expected) && !roles.is_empty()).then_some(roles)
}
