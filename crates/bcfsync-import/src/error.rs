//! Fatal import errors.
//!
//! Per-topic validation problems are not errors here; they travel inside
//! [`crate::ImportOutcome`].

use bcfsync_directory::DirectoryError;
use std::error::Error as StdError;

use crate::archive::ArchiveError;
use crate::extractor::ExtractError;
use crate::materializer::MaterializeError;

/// A failure that aborts a whole listing or import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to extract topic entry {entry}")]
    ExtractionFailed {
        entry: String,
        #[source]
        source: ExtractError,
    },

    #[error("user {actor} is not allowed to add users to the directory or project")]
    Unauthorized { actor: String },

    #[error("license seat limit reached ({active_users} active users)")]
    SeatLimitExceeded { active_users: usize },

    /// Directory lookup or provisioning failed; the directory's own error
    /// is the triggering cause.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("failed to synchronize topic entry {entry}")]
    Materialize {
        entry: String,
        #[source]
        source: MaterializeError,
    },
}

impl ImportError {
    pub fn is_archive_unreadable(&self) -> bool {
        matches!(self, ImportError::Archive(ArchiveError::Unreadable(_)))
    }
}

/// An [`ImportError`] tagged with the archive it happened in.
#[derive(Debug, thiserror::Error)]
#[error("import of {archive} failed: {source}")]
pub struct ImportFailure {
    pub archive: String,
    #[source]
    pub source: ImportError,
}

impl ImportFailure {
    /// The untouched pipeline error, for matching on its kind.
    pub fn error(&self) -> &ImportError {
        &self.source
    }

    pub fn into_error(self) -> ImportError {
        self.source
    }
}

/// Render `error` and every `source()` below it as `a: b: c`.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        if !rendered.ends_with(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        current = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_includes_every_cause_once() {
        let failure = ImportFailure {
            archive: "site.bcf".to_string(),
            source: ImportError::ExtractionFailed {
                entry: "a/markup.bcf".to_string(),
                source: ExtractError::MissingTopic,
            },
        };
        assert_eq!(
            error_chain(&failure),
            "import of site.bcf failed: failed to extract topic entry a/markup.bcf: \
             markup has no Topic element"
        );
    }

    #[test]
    fn failure_exposes_original_error() {
        let failure = ImportFailure {
            archive: "site.bcf".to_string(),
            source: ImportError::Unauthorized {
                actor: "u-7".to_string(),
            },
        };
        assert!(matches!(failure.error(), ImportError::Unauthorized { actor } if actor == "u-7"));
    }
}
