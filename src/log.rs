use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{ReportError, Result};

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over
/// the verbosity flag.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|error| ReportError::Logging(error.to_string()))
}
