//! Historical weather lookups.
//!
//! A [`WeatherSource`] turns a coordinate and an inclusive date range into a
//! single averaged measurement. Failures never reach the caller: they are
//! logged and reported as "no data".

use async_trait::async_trait;
use common::{ArchiveQuery, ArchiveResponse, Dataset};
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, error, instrument, trace};

use crate::error::{ComputeError, Result};

/// Public Open-Meteo historical archive endpoint.
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Source of averaged historical measurements.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Average of the valid samples at `(lat, lng)` between `start_date` and
    /// `end_date` (`YYYY-MM-DD`, inclusive), or `None` if there is no data or
    /// the lookup failed.
    async fn fetch_average(&self, lat: f64, lng: f64, start_date: &str, end_date: &str) -> Option<f64>;
}

/// Settings of an [`OpenMeteoClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub dataset: Dataset,
    /// Whole-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    /// How long a fetched average is reused. Zero disables the cache.
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARCHIVE_URL.to_string(),
            dataset: Dataset::default(),
            timeout: None,
            cache_ttl: Duration::from_secs(3600),
            cache_capacity: 1000,
        }
    }
}

/// [`WeatherSource`] backed by the Open-Meteo archive API.
///
/// Successful lookups are cached per rounded coordinate and date range, so
/// regions whose centroids fall into the same 0.01° cell share one request.
#[derive(Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
    dataset: Dataset,
    cache: Option<Cache<ArchiveQuery, Option<f64>>>,
}

impl OpenMeteoClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ComputeError::Config("archive URL is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let cache = if config.cache_ttl.is_zero() {
            None
        } else {
            Some(
                Cache::builder()
                    .max_capacity(config.cache_capacity)
                    .time_to_live(config.cache_ttl)
                    .build(),
            )
        };

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            dataset: config.dataset,
            cache,
        })
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Issues the request and parses the body.
    async fn request(&self, query: &ArchiveQuery) -> Result<ArchiveResponse> {
        debug!("GET {} {:?}", self.base_url, query.params());

        let response = self
            .http
            .get(&self.base_url)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ComputeError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        trace!("Response received, parsing JSON");
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Looks up the average for `query`, going to the network on a cache miss.
    pub async fn average(&self, query: &ArchiveQuery) -> Result<Option<f64>> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(query).await {
                debug!("Cache hit for {},{}", query.latitude, query.longitude);
                return Ok(hit);
            }
        }

        let average = self.request(query).await?.average(self.dataset);

        if let Some(cache) = &self.cache {
            cache.insert(query.clone(), average).await;
        }
        Ok(average)
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    #[instrument(skip(self), fields(metric = self.dataset.metric()))]
    async fn fetch_average(&self, lat: f64, lng: f64, start_date: &str, end_date: &str) -> Option<f64> {
        let query = ArchiveQuery::new(lat, lng, start_date, end_date, self.dataset);
        match self.average(&query).await {
            Ok(value) => {
                debug!("Average {} for {},{}: {:?}", self.dataset.metric(), query.latitude, query.longitude, value);
                value
            }
            Err(e) => {
                error!("Failed to fetch {} data: {}", self.dataset.metric(), e);
                None
            }
        }
    }
}
