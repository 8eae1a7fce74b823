use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::rule::{ColorRule, Operator};

/// Sampling granularity of an archive variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    /// Query parameter name and response key used by the archive API.
    pub fn key(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

/// Weather variables a region can be colored by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dataset {
    #[default]
    #[serde(rename = "temperature_2m")]
    Temperature2m,
    #[serde(rename = "precipitation_sum")]
    PrecipitationSum,
    #[serde(rename = "wind_speed_10m_max")]
    WindSpeed10mMax,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [
        Dataset::Temperature2m,
        Dataset::PrecipitationSum,
        Dataset::WindSpeed10mMax,
    ];

    /// Archive variable name, also used as the configuration key.
    pub fn metric(self) -> &'static str {
        match self {
            Dataset::Temperature2m => "temperature_2m",
            Dataset::PrecipitationSum => "precipitation_sum",
            Dataset::WindSpeed10mMax => "wind_speed_10m_max",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dataset::Temperature2m => "Temperature",
            Dataset::PrecipitationSum => "Precipitation",
            Dataset::WindSpeed10mMax => "Max Wind Speed",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Dataset::Temperature2m => "°C",
            Dataset::PrecipitationSum => "mm",
            Dataset::WindSpeed10mMax => "km/h",
        }
    }

    pub fn granularity(self) -> Granularity {
        match self {
            Dataset::Temperature2m => Granularity::Hourly,
            Dataset::PrecipitationSum | Dataset::WindSpeed10mMax => Granularity::Daily,
        }
    }

    /// The three rules every new region starts with.
    pub fn default_rules(self) -> Vec<ColorRule> {
        match self {
            Dataset::Temperature2m => vec![
                ColorRule::new("1", Operator::Lt, 10.0, "#3b82f6"),
                ColorRule::new("2", Operator::Ge, 10.0, "#22c55e"),
                ColorRule::new("3", Operator::Ge, 25.0, "#ef4444"),
            ],
            Dataset::PrecipitationSum => vec![
                ColorRule::new("1", Operator::Eq, 0.0, "#fde68a"),
                ColorRule::new("2", Operator::Gt, 0.0, "#60a5fa"),
                ColorRule::new("3", Operator::Gt, 5.0, "#2563eb"),
            ],
            Dataset::WindSpeed10mMax => vec![
                ColorRule::new("1", Operator::Lt, 10.0, "#a7f3d0"),
                ColorRule::new("2", Operator::Ge, 10.0, "#facc15"),
                ColorRule::new("3", Operator::Ge, 30.0, "#f97316"),
            ],
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metric())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.metric() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = Dataset::ALL.iter().map(|d| d.metric()).collect();
                format!("unknown dataset '{}', expected one of {}", s, known.join(", "))
            })
    }
}
