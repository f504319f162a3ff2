//! Tracing subscriber setup for the binaries

use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "trackifly=info";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Human-readable logs on stderr, filtered by `RUST_LOG`.
pub fn init_cli() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_DIRECTIVES))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}

/// Daily-rolling JSON logs under `log_dir`, for processes whose stdout is a
/// protocol channel.
pub fn init_file(log_dir: &Path, file_prefix: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);

    tracing_subscriber::registry()
        .with(env_filter("trackifly=debug,reqwest=info"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .try_init()?;

    tracing::info!(log_dir = %log_dir.display(), "File logging initialized");
    Ok(())
}
