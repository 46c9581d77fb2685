//! JSON snapshot persistence with lock-scoped mutation.

use bcfsync_fsio::{FileLock, LockError};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::directory::{Directory, DirectoryError};
use crate::user::{DirectoryUser, Membership};

pub fn directory_lock_path(snapshot: &Path) -> PathBuf {
    bcfsync_fsio::lock_path(snapshot)
}

/// A directory snapshot on disk.
///
/// Reads load the snapshot fresh each time; writes hold the lock for the
/// whole load/mutate/save cycle, so concurrent provisioning never loses
/// an account.
#[derive(Debug, Clone)]
pub struct DirectoryFile {
    path: PathBuf,
}

impl DirectoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot. A missing file is an empty directory with the
    /// default roles.
    pub fn load(&self) -> Result<Directory, DirectoryError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Directory::with_default_roles());
            }
            Err(e) => {
                return Err(DirectoryError::Io(format!("{}: {e}", self.path.display())));
            }
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| DirectoryError::Parse(format!("{}: {e}", self.path.display())))
    }

    /// Write the snapshot via temp file + rename.
    pub fn save(&self, directory: &Directory) -> Result<(), DirectoryError> {
        let payload = serde_json::to_vec_pretty(directory)
            .map_err(|e| DirectoryError::Serialize(e.to_string()))?;
        bcfsync_fsio::write_atomic(&self.path, &payload)
            .map_err(|e| DirectoryError::Io(e.to_string()))
    }

    /// Run one lock-scoped mutation; the snapshot is saved only when the
    /// mutator succeeds.
    pub fn mutate<T>(
        &self,
        mutator: impl FnOnce(&mut Directory) -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        let _guard = FileLock::acquire(&self.path).map_err(|err| match err {
            LockError::Busy { lock_path } => DirectoryError::LockBusy { lock_path },
            LockError::Io { lock_path, message } => {
                DirectoryError::Io(format!("{lock_path}: {message}"))
            }
        })?;
        let mut directory = self.load()?;
        let value = mutator(&mut directory)?;
        self.save(&directory)?;
        Ok(value)
    }

    pub fn user(&self, id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(self.load()?.user(id).cloned())
    }

    pub fn users_by_mail_keys(
        &self,
        mail_keys: &BTreeSet<String>,
    ) -> Result<Vec<DirectoryUser>, DirectoryError> {
        Ok(self.load()?.users_by_mail_keys(mail_keys))
    }

    pub fn active_user_count(&self) -> Result<usize, DirectoryError> {
        Ok(self.load()?.active_user_count())
    }

    pub fn add_user(&self, user: DirectoryUser) -> Result<DirectoryUser, DirectoryError> {
        self.mutate(|directory| directory.add_user(user).cloned())
    }

    pub fn provision_user(&self, mail: &str) -> Result<DirectoryUser, DirectoryError> {
        self.mutate(|directory| directory.provision_user(mail).cloned())
    }

    pub fn add_membership(
        &self,
        user_id: &str,
        project_id: &str,
        role_ids: &[String],
    ) -> Result<Membership, DirectoryError> {
        self.mutate(|directory| directory.add_membership(user_id, project_id, role_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_snapshot(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("bcfsync-dir-{prefix}-{}-{unique}", std::process::id()))
            .join("directory.json")
    }

    #[test]
    fn missing_snapshot_loads_default_roles() {
        let file = DirectoryFile::new(temp_snapshot("missing"));
        let directory = file.load().expect("missing snapshot is empty");
        assert!(directory.users.is_empty());
        assert!(directory.roles.contains_key("member"));
    }

    #[test]
    fn provisioning_persists_across_reloads() {
        let path = temp_snapshot("persist");
        let file = DirectoryFile::new(&path);

        let user = file.provision_user("new@example.com").expect("provision");
        file.add_membership(&user.id, "tower", &["member".to_string()])
            .expect("membership");

        let reloaded = DirectoryFile::new(&path);
        let stored = reloaded
            .user(&user.id)
            .expect("load")
            .expect("user should persist");
        assert!(stored.is_member_of("tower"));
        assert_eq!(reloaded.active_user_count().expect("count"), 1);
        assert!(!directory_lock_path(&path).exists());
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn mutation_leaves_only_the_snapshot_behind() {
        let path = temp_snapshot("clean");
        let file = DirectoryFile::new(&path);
        file.provision_user("a@example.com").expect("provision");
        file.provision_user("b@example.com").expect("provision");

        let parent = path.parent().expect("temp dir");
        let names: Vec<_> = fs::read_dir(parent)
            .expect("list")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["directory.json"]);
        let _ = fs::remove_dir_all(parent);
    }

    #[test]
    fn failed_mutation_leaves_snapshot_untouched() {
        let path = temp_snapshot("rollback");
        let file = DirectoryFile::new(&path);
        file.provision_user("a@example.com").expect("provision");

        let err = file
            .provision_user("A@example.com")
            .expect_err("duplicate must fail");
        assert!(matches!(err, DirectoryError::MailTaken(_)));
        assert_eq!(file.load().expect("load").users.len(), 1);
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn busy_lock_fails_closed() {
        let path = temp_snapshot("busy");
        let lock = directory_lock_path(&path);
        fs::create_dir_all(lock.parent().expect("lock parent")).expect("mkdir");
        fs::write(&lock, "pid=0\n").expect("lock should write");

        let err = DirectoryFile::new(&path)
            .provision_user("a@example.com")
            .expect_err("busy lock must fail");
        assert!(matches!(err, DirectoryError::LockBusy { .. }));
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }
}
