use crate::config::{DEFAULT_CONFIG, LoadedConfig};
use crate::support::{exit_with_error, print_json, yes_no};
use bcfsync_directory::{Directory, DirectoryFile};
use bcfsync_tracker::IssueStore;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOutcome {
    pub config_path: PathBuf,
    pub issues_path: PathBuf,
    pub directory_path: PathBuf,
    pub created_config: bool,
    pub created_issues_file: bool,
    pub created_directory_file: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to create {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path exists but is not a {expected}: {path}")]
    WrongKind { path: String, expected: &'static str },

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Issues(#[from] bcfsync_tracker::IssueStoreError),

    #[error(transparent)]
    Directory(#[from] bcfsync_directory::DirectoryError),
}

/// Create `<dir>/.bcfsync/` with a default config and empty stores.
///
/// Existing files are left alone; store paths come from the config that
/// ends up on disk.
pub fn init_layout(dir: impl AsRef<Path>) -> Result<InitOutcome, InitError> {
    let state_dir = dir.as_ref().join(".bcfsync");
    if state_dir.exists() && !state_dir.is_dir() {
        return Err(InitError::WrongKind {
            path: state_dir.display().to_string(),
            expected: "directory",
        });
    }
    create_dir(&state_dir)?;

    let config_path = state_dir.join("config.toml");
    let created_config = !config_path.exists();
    if created_config {
        fs::write(&config_path, DEFAULT_CONFIG).map_err(|source| InitError::Create {
            path: config_path.display().to_string(),
            source,
        })?;
    }
    let config = LoadedConfig::load(&config_path)?;

    let issues_path = config.issues_path();
    let created_issues_file = !issues_path.exists();
    if created_issues_file {
        if let Some(parent) = issues_path.parent() {
            create_dir(parent)?;
        }
        IssueStore::default().save_jsonl(&issues_path)?;
    } else if !issues_path.is_file() {
        return Err(InitError::WrongKind {
            path: issues_path.display().to_string(),
            expected: "file",
        });
    }

    let directory_path = config.directory_path();
    let created_directory_file = !directory_path.exists();
    if created_directory_file {
        if let Some(parent) = directory_path.parent() {
            create_dir(parent)?;
        }
        DirectoryFile::new(&directory_path).save(&Directory::with_default_roles())?;
    }

    Ok(InitOutcome {
        config_path,
        issues_path,
        directory_path,
        created_config,
        created_issues_file,
        created_directory_file,
    })
}

fn create_dir(path: &Path) -> Result<(), InitError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| InitError::Create {
        path: path.display().to_string(),
        source,
    })
}

pub fn run(dir: String, json_output: bool) {
    let outcome = init_layout(&dir).unwrap_or_else(|e| exit_with_error(&e));

    if json_output {
        print_json(&serde_json::json!({
            "action": "init",
            "outcome": outcome,
        }));
        return;
    }

    println!("bcfsync init {dir}");
    println!();
    println!("  config: {}", outcome.config_path.display());
    println!("  issues: {}", outcome.issues_path.display());
    println!("  directory: {}", outcome.directory_path.display());
    println!("  created config: {}", yes_no(outcome.created_config));
    println!("  created issues file: {}", yes_no(outcome.created_issues_file));
    println!(
        "  created directory file: {}",
        yes_no(outcome.created_directory_file)
    );
}
