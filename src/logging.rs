//! `tracing` subscriber setup for the `eos` binary.
//!
//! The library only emits events (`debug!` for fit progress, `warn!` for
//! advisories); installing a subscriber is the binary's job.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

use crate::error::AppError;

/// Level for a `-v` count; `quiet` silences everything.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| AppError::new(2, format!("Failed to create log file '{}': {e}", path.display())))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_thread_ids(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::new(2, format!("Failed to initialise logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, warn};

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_filter(0, false), LevelFilter::WARN);
        assert_eq!(level_filter(1, false), LevelFilter::INFO);
        assert_eq!(level_filter(2, false), LevelFilter::DEBUG);
        assert_eq!(level_filter(7, false), LevelFilter::TRACE);
        assert_eq!(level_filter(3, true), LevelFilter::OFF);
    }

    #[test]
    fn file_layer_captures_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eos.log");
        let file = File::create(&path).unwrap();
        let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
        let subscriber = tracing_subscriber::registry().with(LevelFilter::DEBUG).with(layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!(v0 = 12.0, "Equation of state fitted.");
            warn!("the minimum volume of a fitted parabola is not in your volumes");
        });

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Equation of state fitted."));
        assert!(content.contains("WARN"));
    }
}
