use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for LatLng {
    type Err = String;

    /// Parses `"lat,lng"`, e.g. `"37.5,-122.25"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lat,lng', got '{}'", s))?;
        let lat = parse_finite(lat).map_err(|e| format!("invalid latitude: {}", e))?;
        let lng = parse_finite(lng).map_err(|e| format!("invalid longitude: {}", e))?;
        Ok(Self { lat, lng })
    }
}

/// Parses a number, rejecting `NaN` and infinities. JSON has no encoding for
/// them, so they could never be read back from a snapshot.
pub fn parse_finite(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("'{}' is not a number: {}", s, e))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", s));
    }
    Ok(value)
}
