//! Command line front ends
//!
//! Shared by the `xhs` and `xhs-server` binaries.

pub mod commands;
pub mod server;

use crate::config::settings::LoggingSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber
///
/// `RUST_LOG` wins when set; otherwise the configured level is used, raised
/// to `debug` by `--verbose` or `logging.verbose`.
pub fn init_logging(logging: &LoggingSettings, verbose: bool) {
    let default_level = if verbose || logging.verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
