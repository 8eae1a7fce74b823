//! Text renderings of the dashboard.
//!
//! Both views keep one rendered row per region and only re-render the rows
//! named by store events, so a finished fetch for one region never touches
//! the others.

pub mod dashboard;
pub mod map;

use common::Dataset;
use model::{PolygonStore, Region, StoreEvent};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{Receiver, channel};
use tracing::trace;

pub use dashboard::{DashboardControl, DashboardView};
pub use map::{DrawEvent, MapView};

/// A row that was re-rendered. `line` is `None` once the region is gone.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub id: String,
    pub line: Option<String>,
}

type RenderRow = fn(&Region, Dataset) -> String;

/// Rendered rows keyed by region id.
pub struct RowCache {
    render: RenderRow,
    rows: BTreeMap<String, String>,
    dirty: BTreeSet<String>,
    events: Receiver<StoreEvent>,
}

impl RowCache {
    /// Subscribes to `store` and marks every existing region dirty.
    pub fn attach(store: &mut PolygonStore, render: RenderRow) -> Self {
        let (tx, events) = channel();
        store.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        Self {
            render,
            rows: BTreeMap::new(),
            dirty: store.state().polygons.keys().cloned().collect(),
            events,
        }
    }

    fn drain_events(&mut self, store: &PolygonStore) {
        while let Ok(event) = self.events.try_recv() {
            match event.region_id() {
                Some(id) => {
                    self.dirty.insert(id.to_string());
                }
                None => {
                    // Whole-state change: old rows may vanish, new ones appear
                    self.dirty.extend(self.rows.keys().cloned());
                    self.dirty.extend(store.state().polygons.keys().cloned());
                }
            }
        }
    }

    /// Re-renders the dirty rows and returns the ones whose text changed.
    pub fn take_dirty(&mut self, store: &PolygonStore) -> Vec<RowChange> {
        self.drain_events(store);

        let mut changes = Vec::new();
        for id in std::mem::take(&mut self.dirty) {
            match store.region(&id) {
                Some(region) => {
                    let line = (self.render)(region, store.dataset());
                    if self.rows.get(&id) == Some(&line) {
                        continue;
                    }
                    trace!("Row '{}' re-rendered", id);
                    self.rows.insert(id.clone(), line.clone());
                    changes.push(RowChange { id, line: Some(line) });
                }
                None => {
                    if self.rows.remove(&id).is_some() {
                        changes.push(RowChange { id, line: None });
                    }
                }
            }
        }
        changes
    }

    /// Current rows in region id order. Call [`RowCache::take_dirty`] first
    /// to pick up pending changes.
    pub fn rows(&self) -> impl Iterator<Item = &str> {
        self.rows.values().map(String::as_str)
    }
}

/// One decimal plus unit, e.g. `27.3°C`.
pub(crate) fn format_value(value: f64, dataset: Dataset) -> String {
    format!("{:.1}{}", value, dataset.unit())
}
