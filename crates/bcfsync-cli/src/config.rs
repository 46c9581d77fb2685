//! `config.toml`: store locations, license policy and import defaults.
//!
//! Relative store paths resolve against the directory holding the config
//! file, so a checked-in `.bcfsync/` works from any working directory.

use bcfsync_directory::SeatPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# bcfsync configuration

[store]
# Relative paths resolve against this file's directory.
issues = "issues.jsonl"
directory = "directory.json"

[license]
# user_limit = 25      # absent means unlimited
fail_open = false

[import]
invite_role_ids = ["member"]
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub license: SeatPolicy,
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub issues: PathBuf,
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            issues: PathBuf::from("issues.jsonl"),
            directory: PathBuf::from("directory.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub invite_role_ids: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            invite_role_ids: vec!["member".to_string()],
        }
    }
}

/// A parsed config plus the directory its relative paths hang off.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub base: PathBuf,
    pub exists: bool,
    pub config: Config,
}

impl LoadedConfig {
    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let (config, exists) = match fs::read_to_string(&path) {
            Ok(text) => {
                let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
                (config, true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Config::default(), false),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            path,
            base,
            exists,
            config,
        })
    }

    pub fn issues_path(&self) -> PathBuf {
        self.resolve(&self.config.store.issues)
    }

    pub fn directory_path(&self) -> PathBuf {
        self.resolve(&self.config.store.directory)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}
