//! Archive Reader: scoped read access to the topic entries of a BCF zip.
//!
//! The archive is held for one listing or import and released when the
//! [`TopicArchive`] drops, on success and error paths alike.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

/// Entries whose name ends with this are topic descriptors.
pub const TOPIC_DESCRIPTOR_SUFFIX: &str = "markup.bcf";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive unreadable")]
    Unreadable(#[source] ZipError),

    #[error("failed to read archive entry {name}")]
    Entry {
        name: String,
        #[source]
        source: ZipError,
    },
}

/// One topic descriptor inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    index: usize,
    name: String,
}

impl TopicEntry {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An opened archive plus its topic entries in enumeration order.
pub struct TopicArchive<R> {
    label: String,
    zip: ZipArchive<R>,
    entries: Vec<TopicEntry>,
}

impl TopicArchive<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ArchiveError::Unreadable(ZipError::Io(e)))?;
        Self::from_reader(path.display().to_string(), file)
    }
}

impl<R: Read + Seek> TopicArchive<R> {
    /// Open an archive from any seekable source; `label` names it in
    /// errors and logs.
    pub fn from_reader(label: impl Into<String>, reader: R) -> Result<Self, ArchiveError> {
        let mut zip = ZipArchive::new(reader).map_err(ArchiveError::Unreadable)?;

        let mut entries = Vec::new();
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index).map_err(ArchiveError::Unreadable)?;
            if file.is_dir() || !file.name().ends_with(TOPIC_DESCRIPTOR_SUFFIX) {
                continue;
            }
            entries.push(TopicEntry {
                index,
                name: file.name().to_string(),
            });
        }

        Ok(Self {
            label: label.into(),
            zip,
            entries,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Topic entries in archive enumeration order (not sorted).
    pub fn topic_entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    /// Decompress one entry fully into memory.
    pub fn read_entry(&mut self, entry: &TopicEntry) -> Result<Vec<u8>, ArchiveError> {
        let entry_error = |source: ZipError| ArchiveError::Entry {
            name: entry.name.clone(),
            source,
        };
        let mut file = self.zip.by_index(entry.index).map_err(entry_error)?;
        let mut bytes = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut bytes)
            .map_err(|e| entry_error(ZipError::Io(e)))?;
        Ok(bytes)
    }
}

/// Upper bound on the buffer reserved up front for one entry. The declared
/// size comes from the archive and is not trusted beyond this.
const MAX_PREALLOCATION: usize = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(MAX_PREALLOCATION)
        .min(MAX_PREALLOCATION)
}
