//! Directory and license capabilities the pipeline depends on.

use bcfsync_directory::{
    Directory, DirectoryError, DirectoryFile, DirectoryUser, Membership, SeatPolicy,
};
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// The user directory and project-membership store.
///
/// Mutating methods take `&self`; implementations serialize their own
/// writes so a lookup after a mutation sees it.
pub trait UserDirectory {
    fn user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

    /// Users whose lower-cased mail is in `mail_keys`, with memberships.
    fn users_by_mails(
        &self,
        mail_keys: &BTreeSet<String>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError>;

    fn active_user_count(&self) -> Result<usize, DirectoryError>;

    fn provision_user(&self, mail: &str) -> Result<DirectoryUser, DirectoryError>;

    fn add_membership(
        &self,
        user_id: &str,
        project_id: &str,
        role_ids: &[String],
    ) -> Result<Membership, DirectoryError>;
}

/// The licensing service.
pub trait SeatLicense {
    fn seats_available(&self, active_users: usize) -> bool;

    /// Whether provisioning may exceed the limit anyway.
    fn fail_open(&self) -> bool;
}

impl SeatLicense for SeatPolicy {
    fn seats_available(&self, active_users: usize) -> bool {
        SeatPolicy::seats_available(self, active_users)
    }

    fn fail_open(&self) -> bool {
        self.fail_open
    }
}

impl UserDirectory for DirectoryFile {
    fn user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        DirectoryFile::user(self, id)
    }

    fn users_by_mails(
        &self,
        mail_keys: &BTreeSet<String>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        self.users_by_mail_keys(mail_keys)
    }

    fn active_user_count(&self) -> Result<usize, DirectoryError> {
        DirectoryFile::active_user_count(self)
    }

    fn provision_user(&self, mail: &str) -> Result<DirectoryUser, DirectoryError> {
        DirectoryFile::provision_user(self, mail)
    }

    fn add_membership(
        &self,
        user_id: &str,
        project_id: &str,
        role_ids: &[String],
    ) -> Result<Membership, DirectoryError> {
        DirectoryFile::add_membership(self, user_id, project_id, role_ids)
    }
}

/// In-process directory, for embedding and tests.
impl UserDirectory for Mutex<Directory> {
    fn user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        let directory = self.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(directory.user(id).cloned())
    }

    fn users_by_mails(
        &self,
        mail_keys: &BTreeSet<String>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let directory = self.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(directory.users_by_mail_keys(mail_keys))
    }

    fn active_user_count(&self) -> Result<usize, DirectoryError> {
        let directory = self.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(directory.active_user_count())
    }

    fn provision_user(&self, mail: &str) -> Result<DirectoryUser, DirectoryError> {
        let mut directory = self.lock().unwrap_or_else(PoisonError::into_inner);
        directory.provision_user(mail).cloned()
    }

    fn add_membership(
        &self,
        user_id: &str,
        project_id: &str,
        role_ids: &[String],
    ) -> Result<Membership, DirectoryError> {
        let mut directory = self.lock().unwrap_or_else(PoisonError::into_inner);
        directory.add_membership(user_id, project_id, role_ids)
    }
}
