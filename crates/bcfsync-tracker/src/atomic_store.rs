//! Lock-scoped atomic mutation of the issues JSONL file.
//!
//! Every write that allocates issue numbers goes through
//! [`mutate_store_jsonl`], so two writers can never hand out the same
//! number for one project.

use crate::{IssueStore, IssueStoreError};
use bcfsync_fsio::{FileLock, LockError};
use std::path::{Path, PathBuf};

/// `<issues>.lock`, created exclusively while a mutation runs.
pub fn issue_lock_path(issues_path: &Path) -> PathBuf {
    bcfsync_fsio::lock_path(issues_path)
}

#[derive(Debug, thiserror::Error)]
pub enum AtomicStoreMutationError<E> {
    #[error("issues file lock busy: {lock_path}")]
    LockBusy { lock_path: String },

    #[error("failed to acquire issues file lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },

    #[error(transparent)]
    Store(IssueStoreError),

    #[error("{0}")]
    Mutation(E),
}

/// Execute one lock-scoped mutation against an issues JSONL path.
///
/// The mutator returns `(value, changed)`; `changed=true` persists the
/// store before the lock is released.
pub fn mutate_store_jsonl<T, E, F>(
    path: impl AsRef<Path>,
    mutator: F,
) -> Result<T, AtomicStoreMutationError<E>>
where
    F: FnOnce(&mut IssueStore) -> Result<(T, bool), E>,
{
    let path = path.as_ref();
    let _guard = FileLock::acquire(path).map_err(|err| match err {
        LockError::Busy { lock_path } => AtomicStoreMutationError::LockBusy { lock_path },
        LockError::Io { lock_path, message } => {
            AtomicStoreMutationError::LockIo { lock_path, message }
        }
    })?;

    let mut store = IssueStore::load_jsonl(path).map_err(AtomicStoreMutationError::Store)?;
    let (value, changed) = mutator(&mut store).map_err(AtomicStoreMutationError::Mutation)?;
    if changed {
        store
            .save_jsonl(path)
            .map_err(AtomicStoreMutationError::Store)?;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Issue;
    use std::fs;
    use std::convert::Infallible;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_issues_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("bcfsync-atomic-{prefix}-{}-{unique}", std::process::id()))
            .join("issues.jsonl")
    }

    #[test]
    fn changed_mutation_persists_and_releases_lock() {
        let path = temp_issues_path("persist");
        let number = mutate_store_jsonl::<_, IssueStoreError, _>(&path, |store| {
            let saved = store.save_issue(Issue::new("alpha", "first"))?.number;
            Ok((saved, true))
        })
        .expect("mutation should succeed");
        assert_eq!(number, 1);
        assert!(!issue_lock_path(&path).exists());

        let store = IssueStore::load_jsonl(&path).expect("reload");
        assert_eq!(store.len(), 1);
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }

    #[test]
    fn unchanged_mutation_does_not_write() {
        let path = temp_issues_path("readonly");
        let count = mutate_store_jsonl::<_, Infallible, _>(&path, |store| Ok((store.len(), false)))
            .expect("read-only mutation should succeed");
        assert_eq!(count, 0);
        assert!(!path.exists());
    }

    #[test]
    fn busy_lock_fails_closed() {
        let path = temp_issues_path("busy");
        let lock = issue_lock_path(&path);
        fs::create_dir_all(lock.parent().expect("lock parent")).expect("mkdir");
        fs::write(&lock, "pid=0\n").expect("stale lock should write");

        let err = mutate_store_jsonl::<(), Infallible, _>(&path, |_| Ok(((), true)))
            .expect_err("busy lock must fail");
        assert!(matches!(err, AtomicStoreMutationError::LockBusy { .. }));
        let _ = fs::remove_dir_all(path.parent().expect("temp dir"));
    }
}
