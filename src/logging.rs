//! Logger bootstrap for the `gp` binary.
//!
//! Diagnostics go to stderr. The level comes from `RUST_LOG` and defaults to
//! `warn` so normal command output stays clean.

use std::sync::OnceLock;

use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};

const DEFAULT_LEVEL: &str = "warn";

static LOGGER: OnceLock<LoggerHandle> = OnceLock::new();

/// Start logging once per process. Later calls are no-ops.
pub fn init_logging() -> Result<(), FlexiLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let handle = Logger::try_with_env_or_str(DEFAULT_LEVEL)?
        .log_to_stderr()
        .format(flexi_logger::default_format)
        .start()?;
    let _ = LOGGER.set(handle);
    log::debug!(
        "event=start version={} level_env={}",
        env!("CARGO_PKG_VERSION"),
        std::env::var("RUST_LOG").unwrap_or_default()
    );
    Ok(())
}
