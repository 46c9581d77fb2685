//! Invitation Gate: the only place that mutates the directory during an
//! import.

use bcfsync_directory::DirectoryUser;
use serde::Serialize;
use std::io::{Read, Seek};

use crate::directory::{SeatLicense, UserDirectory};
use crate::error::ImportError;
use crate::options::ImportOptions;
use crate::reconcile::ParticipantReconciler;

/// Directory changes one gate run made.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOutcome {
    /// Accounts provisioned for unknown mails.
    pub invited: Vec<DirectoryUser>,
    /// Known non-members added to the project.
    pub enrolled: Vec<DirectoryUser>,
}

impl GateOutcome {
    pub fn is_empty(&self) -> bool {
        self.invited.is_empty() && self.enrolled.is_empty()
    }
}

pub struct InvitationGate<'a> {
    directory: &'a dyn UserDirectory,
    license: &'a dyn SeatLicense,
}

impl<'a> InvitationGate<'a> {
    pub fn new(directory: &'a dyn UserDirectory, license: &'a dyn SeatLicense) -> Self {
        Self { directory, license }
    }

    /// Provision unknown mails and enrol non-members as `options` asks.
    ///
    /// Does nothing unless an action and at least one role are given.
    /// Authorization is checked before the license, and both before any
    /// directory write. A provisioning failure aborts the run and leaves
    /// accounts created earlier in the same run in place.
    ///
    /// The reconciler's cache is stale afterwards; the caller clears it.
    pub fn run<R: Read + Seek>(
        &self,
        reconciler: &mut ParticipantReconciler<'_, R>,
        actor_id: &str,
        options: &ImportOptions,
    ) -> Result<GateOutcome, ImportError> {
        let invite_roles = options.invite_role_ids();
        let enrol_roles = options.non_member_role_ids();
        if invite_roles.is_none() && enrol_roles.is_none() {
            return Ok(GateOutcome::default());
        }

        self.authorize(actor_id)?;

        let project_id = reconciler.project_id().to_string();
        let mut outcome = GateOutcome::default();

        if let Some(role_ids) = invite_roles {
            let active_users = self.directory.active_user_count()?;
            if !self.license.seats_available(active_users) && !self.license.fail_open() {
                return Err(ImportError::SeatLimitExceeded { active_users });
            }

            let unknown = reconciler.unknown_mails()?;
            for mail in unknown.iter() {
                let user = self.directory.provision_user(mail)?;
                self.directory
                    .add_membership(&user.id, &project_id, role_ids)?;
                tracing::info!(user = %user.id, project = %project_id, "provisioned directory user");
                tracing::debug!(user = %user.id, mail = %user.mail, "provisioned mail address");
                outcome.invited.push(user);
            }
        }

        if let Some(role_ids) = enrol_roles {
            let non_members = reconciler.non_members()?;
            for user in non_members.iter() {
                self.directory
                    .add_membership(&user.id, &project_id, role_ids)?;
                tracing::info!(user = %user.id, project = %project_id, "added project member");
                outcome.enrolled.push(user.clone());
            }
        }

        Ok(outcome)
    }

    fn authorize(&self, actor_id: &str) -> Result<(), ImportError> {
        match self.directory.user(actor_id)? {
            Some(actor) if actor.admin => Ok(()),
            _ => Err(ImportError::Unauthorized {
                actor: actor_id.to_string(),
            }),
        }
    }
}
