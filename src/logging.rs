//! Process-level logging setup.
//!
//! Nothing in this crate installs a subscriber on its own. Call [`init`]
//! once from process startup (CLI `main`, test harness) before opening
//! connections.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a compact fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// Returns `false` when a global subscriber is already installed, which
/// makes repeated calls harmless.
pub fn init(default_level: &str) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .try_init()
        .is_ok()
}
