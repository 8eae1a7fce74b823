use anyhow::{Context, Result};
use chrono::Utc;
use compute::sync::Synchronizer;
use model::{JsonFileStorage, PolygonStore};
use tracing::{debug, info};

use crate::config::Settings;
use crate::views::{DashboardView, MapView, RowChange};

/// Everything a command works on: the store, the fetch driver and both views,
/// all subscribed to the same store.
pub struct App {
    pub store: PolygonStore,
    pub sync: Synchronizer,
    pub map: MapView,
    pub dashboard: DashboardView,
}

impl App {
    /// Opens the persisted dashboard described by `settings`.
    pub fn open(settings: &Settings) -> Result<Self> {
        let storage = JsonFileStorage::in_dir(&settings.data_dir);
        info!("Using snapshot {}", storage.path().display());

        let store = PolygonStore::open(storage, settings.dataset, Utc::now())
            .context("Failed to load the dashboard snapshot")?
            .with_colorizer(compute::colorizer());
        let sync = compute::default_synchronizer(&settings.client_config())
            .context("Failed to create the archive client")?;

        Ok(Self::from_parts(store, sync, settings.max_history_days))
    }

    /// Wires the synchronizer and the views to `store`.
    pub fn from_parts(mut store: PolygonStore, mut sync: Synchronizer, max_history_days: u32) -> Self {
        sync.attach(&mut store);
        let map = MapView::attach(&mut store);
        let dashboard = DashboardView::attach(&mut store, max_history_days);
        debug!("App ready with {} regions", store.state().polygons.len());
        Self {
            store,
            sync,
            map,
            dashboard,
        }
    }

    /// Waits until every loading region has its value.
    pub async fn settle(&mut self) {
        self.sync.run_until_idle(&mut self.store).await;
    }

    /// Starts fetches for whatever the last mutations made stale.
    pub fn schedule(&mut self) {
        self.sync.process_events(&self.store);
    }

    /// Map rows that changed since the last call.
    pub fn take_map_changes(&mut self) -> Vec<RowChange> {
        self.map.take_dirty(&self.store)
    }

    /// Dashboard panels that changed since the last call.
    pub fn take_dashboard_changes(&mut self) -> Vec<RowChange> {
        self.dashboard.take_dirty(&self.store)
    }

    /// Dashboard followed by the map.
    pub fn render(&mut self) -> String {
        let dashboard = self.dashboard.render(&self.store);
        let map = self.map.render(&self.store);
        format!("{}\n{}", dashboard, map)
    }
}
