use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::WrapErr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "TEAMPICK_LOG";

const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Send log records to `log_path`. The terminal belongs to the picker, so
/// nothing is ever written to stdout or stderr.
pub fn init_tracing(log_path: &Path) -> color_eyre::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .wrap_err_with(|| format!("Failed to open log file '{}'", log_path.display()))?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    tracing::info!(path = %log_path.display(), "file logging enabled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Only one test may install the global subscriber.
    #[test]
    fn test_init_tracing_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teampick.log");
        init_tracing(&path).unwrap();
        tracing::warn!("scopes missing");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("file logging enabled"));
        assert!(contents.contains("scopes missing"));
        assert!(init_tracing(&path).is_err());
    }
}
