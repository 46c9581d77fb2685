//! Participant Reconciler: derived participant sets for one archive scope.
//!
//! Every accessor computes its set once and hands out the same `Arc` on
//! later calls until [`ParticipantReconciler::clear_cache`] runs. Values a
//! caller already holds are never touched by a clear.
//!
//! The set arithmetic lives in free functions so it can be checked
//! without an archive or a directory.

use bcfsync_directory::{DirectoryUser, mail_key};
use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::sync::Arc;

use crate::archive::{TopicArchive, TopicEntry};
use crate::directory::UserDirectory;
use crate::error::ImportError;
use crate::extractor::EntryExtractor;
use crate::record::{TopicRecord, TopicSummary};

#[derive(Default)]
struct Memo {
    listing: Option<Arc<[TopicSummary]>>,
    all_people: Option<Arc<BTreeSet<String>>>,
    all_mails: Option<Arc<BTreeSet<String>>>,
    known_users: Option<Arc<[DirectoryUser]>>,
    unknown_mails: Option<Arc<BTreeSet<String>>>,
    members: Option<Arc<[DirectoryUser]>>,
    non_members: Option<Arc<[DirectoryUser]>>,
    invalid_people: Option<Arc<BTreeSet<String>>>,
}

/// Owns the open archive for one listing or import.
pub struct ParticipantReconciler<'a, R> {
    archive: TopicArchive<R>,
    project_id: String,
    extractor: &'a dyn EntryExtractor,
    directory: &'a dyn UserDirectory,
    memo: Memo,
}

impl<'a, R: Read + Seek> ParticipantReconciler<'a, R> {
    pub fn new(
        archive: TopicArchive<R>,
        project_id: impl Into<String>,
        extractor: &'a dyn EntryExtractor,
        directory: &'a dyn UserDirectory,
    ) -> Self {
        Self {
            archive,
            project_id: project_id.into(),
            extractor,
            directory,
            memo: Memo::default(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn archive_label(&self) -> &str {
        self.archive.label()
    }

    pub fn entries(&self) -> &[TopicEntry] {
        self.archive.topic_entries()
    }

    /// Read and extract one entry.
    pub fn extract(&mut self, entry: &TopicEntry) -> Result<TopicRecord, ImportError> {
        let bytes = self.archive.read_entry(entry)?;
        self.extractor
            .extract(entry.name(), &bytes)
            .map_err(|source| ImportError::ExtractionFailed {
                entry: entry.name().to_string(),
                source,
            })
    }

    /// One summary per topic entry, in enumeration order.
    ///
    /// The first entry that fails to extract aborts the listing.
    pub fn listing(&mut self) -> Result<Arc<[TopicSummary]>, ImportError> {
        if let Some(cached) = &self.memo.listing {
            return Ok(Arc::clone(cached));
        }
        let entries = self.archive.topic_entries().to_vec();
        let mut summaries = Vec::with_capacity(entries.len());
        for entry in &entries {
            let record = self.extract(entry)?;
            summaries.push(TopicSummary {
                entry: entry.name().to_string(),
                record,
            });
        }
        let listing: Arc<[TopicSummary]> = summaries.into();
        self.memo.listing = Some(Arc::clone(&listing));
        Ok(listing)
    }

    pub fn all_people(&mut self) -> Result<Arc<BTreeSet<String>>, ImportError> {
        if let Some(cached) = &self.memo.all_people {
            return Ok(Arc::clone(cached));
        }
        let people = Arc::new(collect_people(&self.listing()?));
        self.memo.all_people = Some(Arc::clone(&people));
        Ok(people)
    }

    pub fn all_mails(&mut self) -> Result<Arc<BTreeSet<String>>, ImportError> {
        if let Some(cached) = &self.memo.all_mails {
            return Ok(Arc::clone(cached));
        }
        let mails = Arc::new(collect_mails(&self.listing()?));
        self.memo.all_mails = Some(Arc::clone(&mails));
        Ok(mails)
    }

    /// Directory users matching some mail of the archive, memberships
    /// included.
    pub fn known_users(&mut self) -> Result<Arc<[DirectoryUser]>, ImportError> {
        if let Some(cached) = &self.memo.known_users {
            return Ok(Arc::clone(cached));
        }
        let keys: BTreeSet<String> = self.all_mails()?.iter().map(|m| mail_key(m)).collect();
        let users = if keys.is_empty() {
            Vec::new()
        } else {
            self.directory
                .users_by_mails(&keys)?
                .into_iter()
                .filter(|user| keys.contains(&user.mail_key()))
                .collect()
        };
        let users: Arc<[DirectoryUser]> = users.into();
        self.memo.known_users = Some(Arc::clone(&users));
        Ok(users)
    }

    pub fn unknown_mails(&mut self) -> Result<Arc<BTreeSet<String>>, ImportError> {
        if let Some(cached) = &self.memo.unknown_mails {
            return Ok(Arc::clone(cached));
        }
        let mails = self.all_mails()?;
        let known = self.known_users()?;
        let unknown = Arc::new(unknown_mails(&mails, &known));
        self.memo.unknown_mails = Some(Arc::clone(&unknown));
        Ok(unknown)
    }

    pub fn members(&mut self) -> Result<Arc<[DirectoryUser]>, ImportError> {
        Ok(self.partition()?.0)
    }

    pub fn non_members(&mut self) -> Result<Arc<[DirectoryUser]>, ImportError> {
        Ok(self.partition()?.1)
    }

    /// People tokens that are not mail addresses.
    pub fn invalid_people(&mut self) -> Result<Arc<BTreeSet<String>>, ImportError> {
        if let Some(cached) = &self.memo.invalid_people {
            return Ok(Arc::clone(cached));
        }
        let people = self.all_people()?;
        let mails = self.all_mails()?;
        let invalid = Arc::new(invalid_people(&people, &mails));
        self.memo.invalid_people = Some(Arc::clone(&invalid));
        Ok(invalid)
    }

    /// Forget every derived set; the next access recomputes from the
    /// archive and the directory.
    pub fn clear_cache(&mut self) {
        self.memo = Memo::default();
        tracing::debug!(archive = %self.archive.label(), "participant cache cleared");
    }

    fn partition(&mut self) -> Result<(Arc<[DirectoryUser]>, Arc<[DirectoryUser]>), ImportError> {
        if let (Some(members), Some(non_members)) = (&self.memo.members, &self.memo.non_members) {
            return Ok((Arc::clone(members), Arc::clone(non_members)));
        }
        let known = self.known_users()?;
        let (members, non_members) = partition_members(&known, &self.project_id);
        let members: Arc<[DirectoryUser]> = members.into();
        let non_members: Arc<[DirectoryUser]> = non_members.into();
        self.memo.members = Some(Arc::clone(&members));
        self.memo.non_members = Some(Arc::clone(&non_members));
        Ok((members, non_members))
    }
}

/// Every people and mail token of every summary.
pub fn collect_people(summaries: &[TopicSummary]) -> BTreeSet<String> {
    summaries
        .iter()
        .flat_map(|s| s.record.people.iter().chain(&s.record.mail_addresses))
        .filter(|token| !token.is_empty())
        .cloned()
        .collect()
}

/// Mail addresses of every summary, one per case-insensitive address.
///
/// The spelling seen first in enumeration order is kept.
pub fn collect_mails(summaries: &[TopicSummary]) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut mails = BTreeSet::new();
    for mail in summaries.iter().flat_map(|s| &s.record.mail_addresses) {
        if !mail.is_empty() && seen.insert(mail_key(mail)) {
            mails.insert(mail.clone());
        }
    }
    mails
}

/// `all_mails` minus the mails of `known_users`, compared lower-cased.
pub fn unknown_mails(all_mails: &BTreeSet<String>, known_users: &[DirectoryUser]) -> BTreeSet<String> {
    let known: BTreeSet<String> = known_users.iter().map(DirectoryUser::mail_key).collect();
    all_mails
        .iter()
        .filter(|mail| !known.contains(&mail_key(mail)))
        .cloned()
        .collect()
}

/// Split `known_users` into `(members, non_members)` of `project_id`.
pub fn partition_members(
    known_users: &[DirectoryUser],
    project_id: &str,
) -> (Vec<DirectoryUser>, Vec<DirectoryUser>) {
    known_users
        .iter()
        .cloned()
        .partition(|user| user.is_member_of(project_id))
}

/// `all_people` minus `all_mails`.
///
/// Mail tokens are removed case-insensitively, so a second spelling of an
/// address already in `all_mails` is not reported as invalid.
pub fn invalid_people(all_people: &BTreeSet<String>, all_mails: &BTreeSet<String>) -> BTreeSet<String> {
    let mail_keys: BTreeSet<String> = all_mails.iter().map(|m| mail_key(m)).collect();
    all_people
        .iter()
        .filter(|token| !all_mails.contains(*token) && !mail_keys.contains(&mail_key(token)))
        .cloned()
        .collect()
}
