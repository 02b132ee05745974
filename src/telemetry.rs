//! Tracing subscriber setup for binaries, demos, and tests.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! embedding application's call. [`init`] wires the usual stack — `RUST_LOG`
//! env filter, fmt layer, and an [`ErrorLayer`] so span traces attach to
//! errors — and is safe to call more than once (subsequent calls are no-ops).

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default subscriber. Filter via `RUST_LOG`, defaulting to
/// `aerosense=info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aerosense=info"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(ErrorLayer::default())
        .try_init();

    if result.is_err() {
        tracing::trace!("subscriber already installed");
    }
}
