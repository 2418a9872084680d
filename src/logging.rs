//! Tracing subscriber setup for hosts.
//!
//! The crate itself only emits `tracing` events. Hosts that have no
//! subscriber of their own can install one with [`setup_tracing`]: console
//! output, plus a plain-text log file when one is configured. The filter
//! comes from `RUST_LOG`, falling back to [`LogConfig::default_directive`].

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log file, truncated on setup. `None` logs to the console only.
    pub file: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_directive: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { file: None, default_directive: "info".into() }
    }
}

impl LogConfig {
    /// Also log to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Change the fallback filter.
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }
}

fn open_log_file(config: &LogConfig) -> Option<File> {
    let path = config.file.as_ref()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("hudlayer: couldn't create log directory {}: {e}", parent.display());
            return None;
        }
    }

    match File::create(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("hudlayer: couldn't create log file {}: {e}", path.display());
            None
        },
    }
}

/// Install the global subscriber.
///
/// Never fails: a log file that can't be created, or a subscriber that is
/// already installed, is reported on stderr and the host keeps running.
/// Returns whether the subscriber was installed.
pub fn setup_tracing(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let file_layer = open_log_file(config).map(|file| {
        fmt::layer()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer().event_format(
                fmt::format()
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_names(true),
            ),
        )
        .with(file_layer)
        .with(filter)
        .try_init();

    match installed {
        Ok(()) => true,
        Err(e) => {
            eprintln!("hudlayer: couldn't install tracing subscriber: {e}");
            false
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory can't be opened as a log file.
        let config = LogConfig::default().with_file(dir.path());
        assert!(open_log_file(&config).is_none());
    }

    #[test]
    fn test_second_setup_is_not_fatal() {
        let config = LogConfig::default().with_default_directive("debug");
        setup_tracing(&config);
        assert!(!setup_tracing(&config));
    }
}
