//! Keeps fetched values in step with the polygon store.
//!
//! The [`Synchronizer`] subscribes to store events and runs one fetch task per
//! loading region. Tasks are keyed by region id: starting a new fetch for a
//! region aborts the previous one, and every result carries the generation it
//! was started with, so a late result for an outdated shape or time range is
//! discarded instead of overwriting a newer one.
//!
//! Fetch tasks never touch the store. Results are applied by whoever drives
//! the synchronizer, one at a time, so store mutations never interleave.

use common::{NO_DATA_COLOR, format_api_date};
use model::{PolygonStore, StoreEvent, SubscriptionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::{AbortHandle, JoinError, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, trace};

use crate::geometry::centroid;
use crate::rules::evaluate;
use crate::weather::WeatherSource;

/// Result of one fetch task.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub region_id: String,
    pub generation: u64,
    pub value: Option<f64>,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    task: AbortHandle,
}

pub struct Synchronizer {
    source: Arc<dyn WeatherSource>,
    tasks: JoinSet<FetchOutcome>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
    events_tx: UnboundedSender<StoreEvent>,
    events_rx: UnboundedReceiver<StoreEvent>,
    subscription: Option<SubscriptionId>,
}

impl Synchronizer {
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            source,
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
            next_generation: 0,
            events_tx,
            events_rx,
            subscription: None,
        }
    }

    /// Starts listening to `store`. Regions that are already loading are
    /// picked up by the next [`Synchronizer::process_events`].
    pub fn attach(&mut self, store: &mut PolygonStore) {
        if self.subscription.is_some() {
            return;
        }
        let tx = self.events_tx.clone();
        let id = store.subscribe(move |event| {
            // Receiver lives as long as the synchronizer
            let _ = tx.send(event.clone());
        });
        self.subscription = Some(id);
    }

    /// Stops listening to `store` and aborts every pending fetch.
    pub fn detach(&mut self, store: &mut PolygonStore) {
        if let Some(id) = self.subscription.take() {
            store.unsubscribe(id);
        }
        self.cancel_all();
    }

    /// True when no fetch is pending.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Ids of regions with a fetch in flight, sorted.
    pub fn pending(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Reacts to everything the store reported since the last call, then makes
    /// sure every loading region has a fetch running.
    pub fn process_events(&mut self, store: &PolygonStore) {
        while let Ok(event) = self.events_rx.try_recv() {
            trace!(?event, "Store event");
            match event {
                StoreEvent::RegionAdded(id) | StoreEvent::ShapeChanged(id) => {
                    self.start_fetch(store, &id);
                }
                StoreEvent::RegionRemoved(id) => self.cancel(&id),
                StoreEvent::TimeRangeChanged(_) | StoreEvent::Reset => {
                    // Everything in flight was started for the old range or state
                    self.cancel_all();
                }
                StoreEvent::RegionChanged(_) => {}
            }
        }
        self.schedule_pending(store);
    }

    /// Starts a fetch for every loading region that has none running.
    pub fn schedule_pending(&mut self, store: &PolygonStore) {
        for id in store.state().loading_ids() {
            if !self.in_flight.contains_key(&id) {
                self.start_fetch(store, &id);
            }
        }
    }

    /// Waits for the next fetch task to finish. Returns `None` when no task
    /// is left, including aborted ones.
    pub async fn join_next(&mut self) -> Option<Result<FetchOutcome, JoinError>> {
        self.tasks.join_next().await
    }

    /// Applies a finished fetch task to the store.
    pub fn handle_joined(&mut self, joined: Result<FetchOutcome, JoinError>, store: &mut PolygonStore) {
        match joined {
            Ok(outcome) => self.apply(outcome, store),
            Err(e) if e.is_cancelled() => trace!("Superseded fetch cancelled"),
            Err(e) => {
                error!("Fetch task failed: {}", e);
                let failed = e.id();
                let region = self
                    .in_flight
                    .iter()
                    .find(|(_, f)| f.task.id() == failed)
                    .map(|(id, _)| id.clone());
                if let Some(region_id) = region {
                    self.in_flight.remove(&region_id);
                    store.set_region_result(&region_id, None, NO_DATA_COLOR);
                }
            }
        }
    }

    /// Drives the store until every loading region has its result.
    pub async fn run_until_idle(&mut self, store: &mut PolygonStore) {
        loop {
            self.process_events(store);
            let Some(joined) = self.join_next().await else {
                break;
            };
            self.handle_joined(joined, store);
        }
        debug!("Synchronizer idle");
    }

    /// Writes a result back if it is the latest for its region.
    fn apply(&mut self, outcome: FetchOutcome, store: &mut PolygonStore) {
        let latest = self.in_flight.get(&outcome.region_id).map(|f| f.generation);
        if latest != Some(outcome.generation) {
            debug!(
                "Discarding stale result for '{}' (generation {}, latest {:?})",
                outcome.region_id, outcome.generation, latest
            );
            return;
        }
        self.in_flight.remove(&outcome.region_id);

        let Some(region) = store.region(&outcome.region_id) else {
            return;
        };
        // Color from the rules as they are now, not when the fetch started
        let color = match outcome.value {
            Some(value) => evaluate(value, &region.rules),
            None => NO_DATA_COLOR.to_string(),
        };
        info!(
            "Region '{}' -> {:?} ({})",
            outcome.region_id, outcome.value, color
        );
        store.set_region_result(&outcome.region_id, outcome.value, &color);
    }

    /// Starts a fetch for `id`, superseding any fetch already running for it.
    fn start_fetch(&mut self, store: &PolygonStore, id: &str) {
        let Some(region) = store.region(id) else {
            self.cancel(id);
            return;
        };
        if let Some(previous) = self.in_flight.remove(id) {
            debug!("Superseding fetch {} for '{}'", previous.generation, id);
            previous.task.abort();
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let center = centroid(&region.vertices);
        let range = store.time_range();
        let start_date = format_api_date(range.start_date());
        let end_date = format_api_date(range.end_date());
        debug!(
            "Fetching '{}' at {:.2},{:.2} for {} .. {}",
            id, center.lat, center.lng, start_date, end_date
        );

        let source = self.source.clone();
        let region_id = id.to_string();
        let span = info_span!("fetch", region = %id, generation);
        let task = self.tasks.spawn(
            async move {
                let value = source
                    .fetch_average(center.lat, center.lng, &start_date, &end_date)
                    .await;
                FetchOutcome {
                    region_id,
                    generation,
                    value,
                }
            }
            .instrument(span),
        );
        self.in_flight
            .insert(id.to_string(), InFlight { generation, task });
    }

    fn cancel(&mut self, id: &str) {
        if let Some(previous) = self.in_flight.remove(id) {
            debug!("Cancelling fetch {} for '{}'", previous.generation, id);
            previous.task.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (_, previous) in self.in_flight.drain() {
            previous.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use common::{ColorRule, Dataset, LatLng, Operator};
    use model::seed::rectangle;
    use model::{AppState, MemoryStorage, RulePatch, TimeRange};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Returns a fixed value per rounded latitude, optionally waiting on a gate.
    #[derive(Default)]
    struct ScriptedSource {
        values: HashMap<String, f64>,
        calls: Mutex<Vec<(String, String, String, String)>>,
        gate: Option<Arc<Notify>>,
        slow_lat: Option<String>,
    }

    impl ScriptedSource {
        fn with(values: &[(f64, f64)]) -> Self {
            Self {
                values: values.iter().map(|(lat, v)| (format!("{:.2}", lat), *v)).collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, String, String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WeatherSource for ScriptedSource {
        async fn fetch_average(&self, lat: f64, lng: f64, start_date: &str, end_date: &str) -> Option<f64> {
            let key = format!("{:.2}", lat);
            self.calls.lock().unwrap().push((
                key.clone(),
                format!("{:.2}", lng),
                start_date.to_string(),
                end_date.to_string(),
            ));
            if self.slow_lat.as_deref() == Some(key.as_str()) {
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
            }
            self.values.get(&key).copied()
        }
    }

    fn store_with(regions: &[(&str, Vec<LatLng>)]) -> PolygonStore {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let mut store = PolygonStore::new(
            AppState {
                time_range: TimeRange::last_day(now),
                ..Default::default()
            },
            Dataset::Temperature2m,
            Box::new(MemoryStorage::new()),
        );
        for (id, vertices) in regions {
            store.add_region(id, vertices.clone());
        }
        store
    }

    #[tokio::test]
    async fn test_loading_regions_are_fetched_and_colored() {
        let source = Arc::new(ScriptedSource::with(&[(22.5, 27.0), (1.5, 5.0)]));
        let mut store = store_with(&[
            ("India", rectangle(8.0, 68.0, 37.0, 97.0)),
            ("Cold", rectangle(1.0, 1.0, 2.0, 2.0)),
            ("Nowhere", rectangle(50.0, 0.0, 51.0, 1.0)),
        ]);
        let mut sync = Synchronizer::new(source.clone());
        sync.attach(&mut store);

        sync.run_until_idle(&mut store).await;

        let india = store.region("India").unwrap();
        assert!(!india.is_loading);
        assert_eq!(india.fetched_value, Some(27.0));
        assert_eq!(india.color, "#ef4444");

        let cold = store.region("Cold").unwrap();
        assert_eq!(cold.fetched_value, Some(5.0));
        assert_eq!(cold.color, "#3b82f6");

        let nowhere = store.region("Nowhere").unwrap();
        assert!(!nowhere.is_loading);
        assert_eq!(nowhere.fetched_value, None);
        assert_eq!(nowhere.color, NO_DATA_COLOR);

        assert!(sync.is_idle());
        assert_eq!(source.calls().len(), 3);
        let india_call = source.calls().into_iter().find(|c| c.0 == "22.50").unwrap();
        assert_eq!(india_call.1, "82.50");
        assert_eq!(india_call.2, "2024-06-14");
        assert_eq!(india_call.3, "2024-06-15");
    }

    #[tokio::test]
    async fn test_time_range_change_refetches_every_region() {
        let source = Arc::new(ScriptedSource::with(&[(22.5, 27.0), (1.5, 5.0)]));
        let mut store = store_with(&[
            ("India", rectangle(8.0, 68.0, 37.0, 97.0)),
            ("Cold", rectangle(1.0, 1.0, 2.0, 2.0)),
        ]);
        let mut sync = Synchronizer::new(source.clone());
        sync.attach(&mut store);
        sync.run_until_idle(&mut store).await;

        let start = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        store.set_time_range(TimeRange::from_dates(start, end));
        assert!(store.state().regions().all(|r| r.is_loading));

        sync.run_until_idle(&mut store).await;
        assert!(store.state().regions().all(|r| !r.is_loading));

        let calls = source.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[2..].iter().all(|c| c.2 == "2024-06-01" && c.3 == "2024-06-07"));
    }

    #[tokio::test]
    async fn test_reshape_supersedes_in_flight_fetch() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource {
            gate: Some(gate.clone()),
            slow_lat: Some("1.50".to_string()),
            ..ScriptedSource::with(&[(1.5, 5.0), (30.0, 27.0)])
        });
        let mut store = store_with(&[("r", rectangle(1.0, 1.0, 2.0, 2.0))]);
        let mut sync = Synchronizer::new(source.clone());
        sync.attach(&mut store);

        // First fetch blocks on the gate
        sync.process_events(&store);
        assert_eq!(sync.pending(), vec!["r".to_string()]);

        // Reshape while the first fetch is still running
        store.update_shape("r", rectangle(29.0, 1.0, 31.0, 2.0));
        sync.run_until_idle(&mut store).await;

        let region = store.region("r").unwrap();
        assert_eq!(region.fetched_value, Some(27.0));
        assert_eq!(region.color, "#ef4444");
        assert!(sync.is_idle());
    }

    #[tokio::test]
    async fn test_stale_outcome_is_discarded() {
        let source = Arc::new(ScriptedSource::with(&[(1.5, 5.0)]));
        let mut store = store_with(&[("r", rectangle(1.0, 1.0, 2.0, 2.0))]);
        let mut sync = Synchronizer::new(source);
        sync.attach(&mut store);
        sync.process_events(&store);

        // A result from an older generation arrives after a newer fetch started
        sync.handle_joined(
            Ok(FetchOutcome {
                region_id: "r".to_string(),
                generation: 999,
                value: Some(99.0),
            }),
            &mut store,
        );
        assert!(store.region("r").unwrap().is_loading);
        assert_eq!(store.region("r").unwrap().fetched_value, None);

        sync.run_until_idle(&mut store).await;
        assert_eq!(store.region("r").unwrap().fetched_value, Some(5.0));
    }

    #[tokio::test]
    async fn test_removed_region_fetch_is_cancelled() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource {
            gate: Some(gate.clone()),
            slow_lat: Some("1.50".to_string()),
            ..ScriptedSource::with(&[(1.5, 5.0)])
        });
        let mut store = store_with(&[("r", rectangle(1.0, 1.0, 2.0, 2.0))]);
        let mut sync = Synchronizer::new(source);
        sync.attach(&mut store);
        sync.process_events(&store);
        assert!(!sync.is_idle());

        store.remove_region("r");
        tokio::time::timeout(Duration::from_secs(5), sync.run_until_idle(&mut store))
            .await
            .expect("cancelled fetch should not keep the synchronizer busy");
        assert!(store.region("r").is_none());
        assert!(sync.is_idle());
    }

    #[tokio::test]
    async fn test_color_uses_rules_current_at_completion() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource {
            gate: Some(gate.clone()),
            slow_lat: Some("1.50".to_string()),
            ..ScriptedSource::with(&[(1.5, 5.0)])
        });
        let mut store = store_with(&[("r", rectangle(1.0, 1.0, 2.0, 2.0))]);
        let mut sync = Synchronizer::new(source);
        sync.attach(&mut store);
        sync.process_events(&store);

        // Rule edited while the fetch is in flight
        store.update_rule(
            "r",
            "1",
            RulePatch {
                color: Some("#abcdef".to_string()),
                ..Default::default()
            },
        );
        sync.process_events(&store);

        // Stored permit releases the gated fetch whenever it reaches the gate
        gate.notify_one();
        sync.run_until_idle(&mut store).await;

        assert_eq!(store.region("r").unwrap().color, "#abcdef");
    }

    #[tokio::test]
    async fn test_detach_stops_reacting() {
        let source = Arc::new(ScriptedSource::with(&[(1.5, 5.0)]));
        let mut store = store_with(&[]);
        let mut sync = Synchronizer::new(source.clone());
        sync.attach(&mut store);
        sync.detach(&mut store);

        store.add_region("r", rectangle(1.0, 1.0, 2.0, 2.0));
        // Only the explicit pending scan starts a fetch now
        assert!(sync.is_idle());
        sync.run_until_idle(&mut store).await;
        assert_eq!(store.region("r").unwrap().fetched_value, Some(5.0));
    }

    #[test]
    fn test_outcome_rules_scenario() {
        let rules = vec![
            ColorRule::new("1", Operator::Lt, 10.0, "blue"),
            ColorRule::new("2", Operator::Ge, 10.0, "green"),
            ColorRule::new("3", Operator::Ge, 25.0, "red"),
        ];
        assert_eq!(evaluate(27.0, &rules), "red");
        assert_eq!(evaluate(5.0, &rules), "blue");
        assert_eq!(evaluate(10.0, &rules), "green");
    }
}
