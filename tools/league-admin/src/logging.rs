//! Logging and tracing setup

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, prelude::*, util::SubscriberInitExt, EnvFilter};

/// Initialize logging with the configured filter and format.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn initialize_logging(level: &str, format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // Logs go to stderr so command output stays pipeable
    let fmt_layer = match format {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(false)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed(),
        _ => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    Ok(())
}
