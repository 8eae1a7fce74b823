//! The polygon store: single source of truth for all regions, their rules,
//! fetched values and the selected time range.
//!
//! Every mutation runs to completion synchronously: it updates the state,
//! writes the snapshot and then notifies subscribers with a [`StoreEvent`]
//! naming exactly what changed. Mutations on ids that no longer exist are
//! silent no-ops, which is what makes late fetch completions for deleted
//! regions harmless.

use chrono::{DateTime, Utc};
use common::{ColorRule, Dataset, LatLng, NEW_RULE_COLOR, Operator};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace};

use crate::entities::app_state::AppState;
use crate::entities::region::{Region, RulePatch};
use crate::entities::time_range::TimeRange;
use crate::error::Result;
use crate::seed::default_regions;
use crate::storage::StateStorage;

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A region was drawn or seeded.
    RegionAdded(String),
    /// A region's vertices changed; its cached value is stale.
    ShapeChanged(String),
    /// Name, rules, loading flag or fetched result of a region changed.
    RegionChanged(String),
    RegionRemoved(String),
    /// A new time range was selected; every region is loading again.
    TimeRangeChanged(TimeRange),
    /// The whole state was replaced.
    Reset,
}

impl StoreEvent {
    /// The region this event is about, if it concerns a single region.
    pub fn region_id(&self) -> Option<&str> {
        match self {
            StoreEvent::RegionAdded(id)
            | StoreEvent::ShapeChanged(id)
            | StoreEvent::RegionChanged(id)
            | StoreEvent::RegionRemoved(id) => Some(id),
            StoreEvent::TimeRangeChanged(_) | StoreEvent::Reset => None,
        }
    }
}

/// Handle returned by [`PolygonStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Maps a measurement and a rule set to a display color.
pub type Colorizer = Arc<dyn Fn(f64, &[ColorRule]) -> String + Send + Sync>;

type Subscriber = Box<dyn FnMut(&StoreEvent) + Send>;

pub struct PolygonStore {
    state: AppState,
    dataset: Dataset,
    storage: Box<dyn StateStorage>,
    colorizer: Option<Colorizer>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for PolygonStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolygonStore")
            .field("state", &self.state)
            .field("dataset", &self.dataset)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl PolygonStore {
    /// Wraps an existing state. Nothing is written until the first mutation.
    pub fn new(state: AppState, dataset: Dataset, storage: Box<dyn StateStorage>) -> Self {
        Self {
            state,
            dataset,
            storage,
            colorizer: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Restores the last snapshot from `storage`, seeding the default regions
    /// and time range if the dashboard has never been used.
    pub fn open<S>(storage: S, dataset: Dataset, now: DateTime<Utc>) -> Result<Self>
    where
        S: StateStorage + 'static,
    {
        let state = storage.load()?.unwrap_or_default();
        debug!("Opened store with {} regions", state.polygons.len());
        let mut store = Self::new(state, dataset, Box::new(storage));
        store.seed_defaults(now);
        Ok(store)
    }

    /// Sets the function used to recolor a region when its rules change after
    /// a value was fetched.
    pub fn with_colorizer(mut self, colorizer: Colorizer) -> Self {
        self.colorizer = Some(colorizer);
        self
    }

    /// Registers `subscriber` to be called after every effective mutation.
    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        trace!(?id, "Subscriber registered");
        id
    }

    /// Removes a subscriber. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.state.polygons.get(id)
    }

    pub fn time_range(&self) -> TimeRange {
        self.state.time_range
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Inserts a freshly drawn region. An existing region with the same id is
    /// replaced.
    pub fn add_region(&mut self, id: &str, vertices: Vec<LatLng>) {
        let region = Region::new(id, vertices, self.dataset);
        info!("Adding region '{}' with {} vertices", id, region.vertices.len());
        self.state.polygons.insert(id.to_string(), region);
        self.commit(StoreEvent::RegionAdded(id.to_string()));
    }

    /// Replaces a region's vertices and marks it loading, since the cached
    /// value belongs to the old shape.
    pub fn update_shape(&mut self, id: &str, vertices: Vec<LatLng>) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            debug!("Ignoring shape update for missing region '{}'", id);
            return;
        };
        region.vertices = vertices;
        region.mark_loading();
        debug!("Region '{}' reshaped", id);
        self.commit(StoreEvent::ShapeChanged(id.to_string()));
    }

    pub fn remove_region(&mut self, id: &str) {
        if self.state.polygons.remove(id).is_none() {
            debug!("Ignoring removal of missing region '{}'", id);
            return;
        }
        info!("Removed region '{}'", id);
        self.commit(StoreEvent::RegionRemoved(id.to_string()));
    }

    pub fn rename_region(&mut self, id: &str, name: &str) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            return;
        };
        if region.name == name {
            return;
        }
        region.name = name.to_string();
        self.commit(StoreEvent::RegionChanged(id.to_string()));
    }

    /// Appends a blank rule (`= 0`, white) and returns its generated id.
    pub fn add_rule(&mut self, id: &str) -> Option<String> {
        let region = self.state.polygons.get_mut(id)?;
        let rule_id = loop {
            let candidate = generate_rule_id();
            if region.rule(&candidate).is_none() {
                break candidate;
            }
        };
        region
            .rules
            .push(ColorRule::new(rule_id.clone(), Operator::Eq, 0.0, NEW_RULE_COLOR));
        debug!("Added rule '{}' to region '{}'", rule_id, id);
        self.recolor(id);
        self.commit(StoreEvent::RegionChanged(id.to_string()));
        Some(rule_id)
    }

    pub fn update_rule(&mut self, id: &str, rule_id: &str, patch: RulePatch) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            return;
        };
        let Some(rule) = region.rules.iter_mut().find(|r| r.id == rule_id) else {
            debug!("Ignoring update of missing rule '{}' in region '{}'", rule_id, id);
            return;
        };
        if !patch.apply(rule) {
            return;
        }
        self.recolor(id);
        self.commit(StoreEvent::RegionChanged(id.to_string()));
    }

    pub fn remove_rule(&mut self, id: &str, rule_id: &str) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            return;
        };
        let before = region.rules.len();
        region.rules.retain(|r| r.id != rule_id);
        if region.rules.len() == before {
            return;
        }
        self.recolor(id);
        self.commit(StoreEvent::RegionChanged(id.to_string()));
    }

    /// Records a completed fetch and clears the loading flag. No-op if the
    /// region was deleted while the fetch was in flight.
    pub fn set_region_result(&mut self, id: &str, value: Option<f64>, color: &str) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            debug!("Dropping result for missing region '{}'", id);
            return;
        };
        region.fetched_value = value;
        region.color = color.to_string();
        region.is_loading = false;
        debug!("Region '{}' result {:?} -> {}", id, value, color);
        self.commit(StoreEvent::RegionChanged(id.to_string()));
    }

    /// No-op if the region does not exist.
    pub fn set_region_loading(&mut self, id: &str, is_loading: bool) {
        let Some(region) = self.state.polygons.get_mut(id) else {
            return;
        };
        if region.is_loading == is_loading {
            return;
        }
        if is_loading {
            region.mark_loading();
        } else {
            region.is_loading = false;
        }
        self.commit(StoreEvent::RegionChanged(id.to_string()));
    }

    /// Marks every region loading so all values are fetched again.
    pub fn invalidate_all(&mut self) {
        let ids: Vec<String> = self.state.polygons.keys().cloned().collect();
        for id in ids {
            self.set_region_loading(&id, true);
        }
    }

    /// Selects a new time range. Every existing region becomes loading, since
    /// its value belongs to the previous range. Selecting the current range
    /// again changes nothing.
    pub fn set_time_range(&mut self, range: TimeRange) {
        if self.state.time_range == range {
            return;
        }
        info!(
            "Time range set to {} .. {}",
            range.start_date(),
            range.end_date()
        );
        self.state.time_range = range;
        for region in self.state.polygons.values_mut() {
            region.mark_loading();
        }
        self.commit(StoreEvent::TimeRangeChanged(range));
    }

    /// Drops every region and starts over with the defaults.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        info!("Resetting dashboard state");
        self.state = AppState::default();
        self.seed_defaults(now);
        self.commit(StoreEvent::Reset);
    }

    /// Seeds the default regions into an empty map and the last day into an
    /// unset time range.
    fn seed_defaults(&mut self, now: DateTime<Utc>) {
        if self.state.time_range.is_unset() {
            self.state.time_range = TimeRange::last_day(now);
            debug!("Initialised time range to the last day");
            self.persist();
        }
        if self.state.polygons.is_empty() {
            info!("Seeding default regions");
            for (id, vertices) in default_regions() {
                self.add_region(id, vertices);
            }
        }
    }

    fn recolor(&mut self, id: &str) {
        let Some(colorizer) = &self.colorizer else {
            return;
        };
        let Some(region) = self.state.polygons.get_mut(id) else {
            return;
        };
        if region.is_loading {
            return;
        }
        if let Some(value) = region.fetched_value {
            region.color = colorizer(value, &region.rules);
        }
    }

    fn commit(&mut self, event: StoreEvent) {
        self.persist();
        trace!(?event, subscribers = self.subscribers.len(), "Notifying subscribers");
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.state) {
            error!("Failed to write dashboard snapshot: {}", e);
        }
    }
}

/// Nine lowercase base-36 characters.
fn generate_rule_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
