//! Common types shared between the polygon store, the compute layer and the CLI.
//! These structs describe rules, coordinates, datasets and the archive API
//! payloads so every crate agrees on the same shapes.

mod archive;
mod dataset;
mod geo;
mod rule;

pub use archive::{ArchiveQuery, ArchiveResponse, format_api_date};
pub use dataset::{Dataset, Granularity};
pub use geo::{LatLng, parse_finite};
pub use rule::{ColorRule, Operator, ParseOperatorError};

/// Color used for regions without a fetched value, still loading, or with no
/// matching rule.
pub const NO_DATA_COLOR: &str = "#9ca3af";

/// Color given to a freshly added rule.
pub const NEW_RULE_COLOR: &str = "#ffffff";

/// Storage key under which the dashboard snapshot is persisted.
pub const STORAGE_NAME: &str = "geo-dashboard-storage-v2";
