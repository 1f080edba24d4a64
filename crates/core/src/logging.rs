//! Tracing bootstrap shared by every frontend.
//!
//! One-time, thread-safe initialization of the global subscriber. Filtering
//! follows `RUST_LOG`; output goes to stderr so stdout stays a clean record
//! stream for listings and reports.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// Call once at program startup; subsequent calls are ignored. Defaults to
/// warnings and errors when `RUST_LOG` is unset.
pub fn init() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

        tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
    });
}
