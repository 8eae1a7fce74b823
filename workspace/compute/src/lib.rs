pub mod error;
pub mod geometry;
pub mod rules;
pub mod sync;
pub mod weather;

use std::sync::Arc;

use sync::Synchronizer;
use weather::{ClientConfig, OpenMeteoClient};

/// Returns a synchronizer backed by the Open-Meteo archive client, which is
/// what the dashboard uses outside of tests.
pub fn default_synchronizer(config: &ClientConfig) -> error::Result<Synchronizer> {
    let client = OpenMeteoClient::new(config)?;
    Ok(Synchronizer::new(Arc::new(client)))
}

/// The rule evaluator packaged for [`model::PolygonStore::with_colorizer`].
pub fn colorizer() -> model::Colorizer {
    Arc::new(|value: f64, rules: &[common::ColorRule]| rules::evaluate(value, rules))
}
