//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Diagnostics (missing files, unknown regions, skipped fits) go to stderr so
//! the report on stdout stays clean.
//!
//! - default: `warn`
//! - `-v`: `info`, `-vv`: `debug`, `-vvv`: `trace`
//! - `RUST_LOG` overrides the verbosity flag when set

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

pub fn level_for_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Call once per process.
pub fn init_logging(verbosity: u8) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity).as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::new(4, format!("Failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for_verbosity(0), Level::WARN);
        assert_eq!(level_for_verbosity(1), Level::INFO);
        assert_eq!(level_for_verbosity(2), Level::DEBUG);
        assert_eq!(level_for_verbosity(9), Level::TRACE);
    }
}
