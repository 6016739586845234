//! Shared logging setup for the dbsetup binary.

use crate::Result;
use tracing_subscriber::EnvFilter;

/// Maps CLI verbosity flags to a maximum log level.
///
/// `quiet` wins over any verbosity: only errors are shown.
pub const fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Initializes structured logging based on verbosity level.
///
/// A `RUST_LOG` directive, when set, takes precedence over the flags.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Example
/// ```rust,no_run
/// use dbsetup_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            crate::error::DbSetupError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    // Logging can only be initialized once per test process, so only the
    // level mapping is checked here.
    use super::level_for;

    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }
}
