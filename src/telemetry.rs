//! Logging setup shared by the binaries.
//!
//! The subscriber goes in before configuration is read so that config
//! fallbacks and clamps are visible; the configured `log_level` is swapped
//! in afterwards through a reload handle.

use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

pub const DEFAULT_FILTER: &str = "conference_bot=info";

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Parse filter directives, falling back to [`DEFAULT_FILTER`] when they are invalid.
pub fn filter_from(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn layered(initial: EnvFilter) -> (impl Subscriber + Send + Sync, FilterHandle) {
    let (filter, handle) = reload::Layer::new(initial);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));
    (subscriber, handle)
}

/// Install the global subscriber, filtered by `RUST_LOG` or the default.
pub fn init() -> FilterHandle {
    let initial = std::env::var("RUST_LOG")
        .map(|v| filter_from(&v))
        .unwrap_or_else(|_| filter_from(DEFAULT_FILTER));
    let (subscriber, handle) = layered(initial);
    subscriber.init();
    handle
}

/// Switch to the configured filter once configuration is loaded.
pub fn apply_level(handle: &FilterHandle, directives: &str) {
    if let Err(e) = handle.reload(filter_from(directives)) {
        tracing::warn!("Failed to apply log level '{}': {}", directives, e);
    }
}
