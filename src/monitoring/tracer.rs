/*!
 * Tracing Setup
 * Structured logging for scope lifecycles, allocators and the pool
 *
 * Environment variables:
 * - `RUST_LOG`: log filter (default: info)
 * - `NATIVE_MEMORY_TRACE_JSON`: JSON output when `1` or `true`
 */

use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TRACE_JSON_ENV: &str = "NATIVE_MEMORY_TRACE_JSON";

/// Whether JSON output was requested through the environment
pub fn json_requested() -> bool {
    std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Install the global tracing subscriber
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one is left alone.
pub fn init_tracing() -> bool {
    // RUST_LOG wins; fall back to info so lifecycle events stay quiet
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json_requested() {
        // JSON output for log shippers, one event per line
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        // Compact human-readable output for development
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    // try_init fails when tests or the host already installed a subscriber
    if installed {
        info!(json = json_requested(), "native memory tracing initialized");
    }
    installed
}
