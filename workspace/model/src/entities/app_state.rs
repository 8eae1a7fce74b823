use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::region::Region;
use super::time_range::TimeRange;

/// Everything the dashboard persists: all regions keyed by id plus the
/// selected time range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub polygons: BTreeMap<String, Region>,
    #[serde(default)]
    pub time_range: TimeRange,
}

impl AppState {
    pub fn region(&self, id: &str) -> Option<&Region> {
        self.polygons.get(id)
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.polygons.values()
    }

    /// Ids of regions waiting for a fetch to complete.
    pub fn loading_ids(&self) -> Vec<String> {
        self.polygons
            .values()
            .filter(|r| r.is_loading)
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}
