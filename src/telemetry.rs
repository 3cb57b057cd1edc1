//! Logging setup.
//!
//! [`build_dispatch`] creates the subscriber once at program start; the
//! resulting [`Dispatch`] is handed to the [`Engine`](crate::engine::Engine)
//! instead of being installed as a process-wide default.

use tracing::{Dispatch, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// * `json`: emit newline-delimited JSON instead of human-readable lines.
/// * `level`: verbosity when `RUST_LOG` is not set.
pub fn build_dispatch(json: bool, level: Level) -> Dispatch {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json()),
        )
    } else {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    }
}
