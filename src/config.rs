use anyhow::{Context, Result};
use common::Dataset;
use compute::weather::{ClientConfig, DEFAULT_ARCHIVE_URL};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Filter used when neither `RUST_LOG` nor `log_filter` is set.
pub const DEFAULT_LOG_FILTER: &str = "geoweather=info,compute=info,model=info";

/// Runtime settings.
///
/// Layered from lowest to highest precedence: built-in defaults, an optional
/// `geoweather.toml` in the working directory, an explicitly passed file, and
/// `GEOWEATHER_*` environment variables (a `.env` file is loaded first).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Open-Meteo archive endpoint.
    pub archive_url: String,
    /// Metric every region is measured and colored by.
    pub dataset: Dataset,
    /// Directory holding the persisted dashboard snapshot.
    pub data_dir: PathBuf,
    /// How far back the time range may reach, in days.
    pub max_history_days: u32,
    /// Per-request timeout. Unset means requests may take as long as they need.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Lifetime of cached archive responses. Zero disables the cache.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub log_filter: String,
}

impl Settings {
    /// Loads settings, reading `path` on top of the defaults when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let default_dir = default_data_dir();
        trace!("Default data directory: {}", default_dir.display());

        let mut builder = Config::builder()
            .set_default("archive_url", DEFAULT_ARCHIVE_URL)?
            .set_default("dataset", Dataset::default().metric())?
            .set_default("data_dir", default_dir.to_string_lossy().to_string())?
            .set_default("max_history_days", 30_i64)?
            .set_default("cache_ttl_secs", 3600_i64)?
            .set_default("cache_capacity", 1000_i64)?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?
            .add_source(File::with_name("geoweather").required(false));

        if let Some(path) = path {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix("GEOWEATHER").try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;

        debug!("Settings loaded: {:?}", settings);
        Ok(settings)
    }

    /// Settings of the archive client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.archive_url.clone(),
            dataset: self.dataset,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_capacity: self.cache_capacity,
        }
    }
}

/// Per-user data directory, or the working directory when the platform has
/// none.
fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "geoweather")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
