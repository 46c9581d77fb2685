use bcfsync_directory::DirectoryFile;
use bcfsync_import::{ImportError, ImportFailure, error_chain};
use serde::Serialize;
use std::error::Error;
use tracing_subscriber::EnvFilter;

use crate::config::LoadedConfig;

/// Log to stderr so `--json` stdout stays machine-readable.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print `error: <message: cause: ...>` and exit 1.
pub fn exit_with_error(error: &(dyn Error + 'static)) -> ! {
    eprintln!("error: {}", error_chain(error));
    std::process::exit(1);
}

pub fn load_config_or_exit(path: &str) -> LoadedConfig {
    let config = LoadedConfig::load(path).unwrap_or_else(|e| exit_with_error(&e));
    tracing::debug!(
        path = %config.path.display(),
        exists = config.exists,
        issues = %config.issues_path().display(),
        directory = %config.directory_path().display(),
        "config loaded"
    );
    config
}

pub fn directory_file(config: &LoadedConfig) -> DirectoryFile {
    DirectoryFile::new(config.directory_path())
}

pub fn print_json<T: Serialize + ?Sized>(payload: &T) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => exit_with_error(&e),
    }
}

pub fn yes_no(ok: bool) -> &'static str {
    if ok { "yes" } else { "no" }
}

/// `a, b, c` or `-` for nothing.
pub fn join_or_dash<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

/// Report a pipeline error with the archive it concerns and exit 1.
pub fn exit_import_failure(archive: &str, source: ImportError) -> ! {
    exit_with_error(&ImportFailure {
        archive: archive.to_string(),
        source,
    })
}
