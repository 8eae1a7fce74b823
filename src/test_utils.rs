#[cfg(test)]
pub mod test_utils {
    use async_trait::async_trait;
    use common::{Dataset, LatLng};
    use compute::sync::Synchronizer;
    use compute::weather::WeatherSource;
    use model::{AppState, MemoryStorage, PolygonStore};
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    use crate::app::App;

    /// Requests seen by a [`LatitudeSource`]: `(lat, lng, start_date, end_date)`.
    pub type Calls = Arc<Mutex<Vec<(f64, f64, String, String)>>>;

    /// Weather source whose "measurement" is the requested latitude, or no
    /// data for latitudes below -60.
    pub struct LatitudeSource {
        calls: Calls,
    }

    #[async_trait]
    impl WeatherSource for LatitudeSource {
        async fn fetch_average(&self, lat: f64, lng: f64, start_date: &str, end_date: &str) -> Option<f64> {
            self.calls
                .lock()
                .unwrap()
                .push((lat, lng, start_date.to_string(), end_date.to_string()));
            (lat >= -60.0).then_some(lat)
        }
    }

    pub fn latitude_source() -> (Arc<dyn WeatherSource>, Calls) {
        let calls = Calls::default();
        (Arc::new(LatitudeSource { calls: calls.clone() }), calls)
    }

    /// App over an in-memory snapshot of `state`, colored like production.
    pub fn app_with(source: Arc<dyn WeatherSource>, state: AppState) -> App {
        let storage = MemoryStorage::with_state(&state).unwrap();
        let store = PolygonStore::new(state, Dataset::Temperature2m, Box::new(storage))
            .with_colorizer(compute::colorizer());
        App::from_parts(store, Synchronizer::new(source), 30)
    }

    /// App with no regions.
    pub fn idle_app() -> App {
        let (source, _) = latitude_source();
        app_with(source, AppState::default())
    }

    /// One-degree square with its south-west corner at `(lat, lng)`.
    pub fn square(lat: f64, lng: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(lat, lng),
            LatLng::new(lat + 1.0, lng),
            LatLng::new(lat + 1.0, lng + 1.0),
            LatLng::new(lat, lng + 1.0),
        ]
    }

    /// Initialize tracing for tests with output to STDERR.
    ///
    /// The log level is read from RUST_LOG and defaults to WARN. The returned
    /// guard removes the subscriber when dropped.
    pub fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let log_level = std::env::var("RUST_LOG")
            .ok()
            .and_then(|level| level.parse::<Level>().ok())
            .unwrap_or(Level::WARN);

        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}
