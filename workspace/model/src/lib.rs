pub mod entities;
pub mod error;
pub mod seed;
pub mod storage;
pub mod store;

pub use entities::prelude::*;
pub use entities::time_range::history_start;
pub use error::StorageError;
pub use storage::{JsonFileStorage, MemoryStorage, StateStorage};
pub use store::{Colorizer, PolygonStore, StoreEvent, SubscriptionId};

// Re-export tracing for use in this crate
pub use tracing;

/// Installs the global tracing subscriber.
///
/// `default_filter` is used when `RUST_LOG` is not set, e.g.
/// `"geoweather=info,compute=info"`. Logs go to stderr so rendered views on
/// stdout stay clean.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();
}
