//! Process-wide tracing setup
//!
//! Console events go to stderr so `--json` output on stdout stays parseable.
//! When `logging.file` is set, a second layer appends plain-text events at
//! `logging.file_level` to that file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use treesync_core::config::LoggingConfig;

/// Console level from the command-line flags, falling back to the config
pub fn console_level(config: &LoggingConfig, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "warn".to_string();
    }
    match verbose {
        0 => config.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber; `RUST_LOG` overrides the console level
pub fn init(config: &LoggingConfig, verbose: u8, quiet: bool) {
    let level = console_level(config, verbose, quiet);
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let mut file_error = None;
    let file_layer = config.file.as_deref().and_then(|path| match open_log_file(path) {
        Ok(file) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(&config.file_level)),
        ),
        Err(e) => {
            file_error = Some(format!("{}: {e}", path.display()));
            None
        }
    });

    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init();

    if let Some(error) = file_error {
        warn!(error = %error, "Log file unavailable, logging to console only");
    }
}
