//! Request and response shapes of the historical weather archive API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::dataset::{Dataset, Granularity};

/// Formats a date the way the archive API expects it (`YYYY-MM-DD`).
pub fn format_api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Query parameters of a single archive request.
///
/// Coordinates are kept as 2-decimal strings, which is also what makes two
/// nearby centroids share the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArchiveQuery {
    pub latitude: String,
    pub longitude: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip)]
    pub dataset: Dataset,
}

impl ArchiveQuery {
    pub fn new(lat: f64, lng: f64, start_date: &str, end_date: &str, dataset: Dataset) -> Self {
        Self {
            latitude: format!("{:.2}", lat),
            longitude: format!("{:.2}", lng),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            dataset,
        }
    }

    /// Query string pairs in the order they are sent.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("latitude", self.latitude.clone()),
            ("longitude", self.longitude.clone()),
            ("start_date", self.start_date.clone()),
            ("end_date", self.end_date.clone()),
            (self.dataset.granularity().key(), self.dataset.metric().to_string()),
        ];
        // Daily aggregates need an explicit timezone
        if self.dataset.granularity() == Granularity::Daily {
            params.push(("timezone", "UTC".to_string()));
        }
        params
    }
}

/// Archive response body. Only the series blocks are modelled; everything
/// else the API returns (elevation, units, ...) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub hourly: Option<Map<String, Value>>,
    #[serde(default)]
    pub daily: Option<Map<String, Value>>,
}

impl ArchiveResponse {
    /// Returns the samples of `dataset`, one entry per time step, `None` for
    /// missing values. Returns `None` if the series is not present at all.
    pub fn samples(&self, dataset: Dataset) -> Option<Vec<Option<f64>>> {
        let block = match dataset.granularity() {
            Granularity::Hourly => self.hourly.as_ref(),
            Granularity::Daily => self.daily.as_ref(),
        }?;
        let series = block.get(dataset.metric())?.as_array()?;
        let samples: Vec<Option<f64>> = series.iter().map(Value::as_f64).collect();
        trace!(
            metric = dataset.metric(),
            total = samples.len(),
            missing = samples.iter().filter(|s| s.is_none()).count(),
            "Extracted archive samples"
        );
        Some(samples)
    }

    /// Arithmetic mean of the non-null samples of `dataset`, or `None` if there
    /// are no valid samples.
    pub fn average(&self, dataset: Dataset) -> Option<f64> {
        let valid: Vec<f64> = self.samples(dataset)?.into_iter().flatten().collect();
        if valid.is_empty() {
            return None;
        }
        Some(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_rounds_coordinates() {
        let query = ArchiveQuery::new(22.5, 82.456, "2024-05-01", "2024-05-02", Dataset::Temperature2m);
        let params = query.params();
        assert_eq!(params[0], ("latitude", "22.50".to_string()));
        assert_eq!(params[1], ("longitude", "82.46".to_string()));
        assert_eq!(params[4], ("hourly", "temperature_2m".to_string()));
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_daily_query_adds_timezone() {
        let query = ArchiveQuery::new(0.0, 0.0, "2024-05-01", "2024-05-02", Dataset::PrecipitationSum);
        let params = query.params();
        assert!(params.contains(&("daily", "precipitation_sum".to_string())));
        assert!(params.contains(&("timezone", "UTC".to_string())));
    }

    #[test]
    fn test_average_skips_nulls() {
        let body = r#"{
            "latitude": 22.5,
            "hourly": {
                "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00"],
                "temperature_2m": [20.0, null, 30.0]
            }
        }"#;
        let response: ArchiveResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.average(Dataset::Temperature2m), Some(25.0));
    }

    #[test]
    fn test_average_absent_without_valid_samples() {
        let all_null: ArchiveResponse =
            serde_json::from_str(r#"{"hourly": {"temperature_2m": [null, null]}}"#).unwrap();
        assert_eq!(all_null.average(Dataset::Temperature2m), None);

        let empty: ArchiveResponse =
            serde_json::from_str(r#"{"hourly": {"temperature_2m": []}}"#).unwrap();
        assert_eq!(empty.average(Dataset::Temperature2m), None);

        let missing: ArchiveResponse = serde_json::from_str(r#"{"error": true}"#).unwrap();
        assert_eq!(missing.average(Dataset::Temperature2m), None);
    }

    #[test]
    fn test_format_api_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_api_date(date), "2024-03-07");
    }
}
