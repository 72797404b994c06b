//! `tracing-subscriber` initialization.
//!
//! Grounded in the teacher's own subscriber setup (`tracing_subscriber::fmt::
//! init()` in its `examples/scenario_example.rs`), extended to honor
//! `RUST_LOG` via `EnvFilter` and to offer the JSON-formatted variant the
//! teacher's `Cargo.toml` already pulls in the `json` feature for.

use tracing_subscriber::EnvFilter;

/// Initialize a human-readable subscriber, honoring `RUST_LOG` (default
/// `info`). Call once near the start of a binary's `main`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Initialize a JSON-formatted subscriber, for deployments that ship logs to
/// a collector rather than a terminal.
pub fn init_json() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
