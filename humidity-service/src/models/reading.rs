use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body returned by the sensor API.
///
/// Only `humidity` is interpreted; any other fields the sensor reports are
/// kept as-is so the cached reading mirrors what upstream sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityReading {
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HumidityReading {
    pub fn new(humidity: f64) -> Self {
        Self {
            humidity: Some(humidity),
            extra: Map::new(),
        }
    }

    /// True when a value is present and strictly below `threshold`.
    pub fn is_below(&self, threshold: f64) -> bool {
        self.humidity.is_some_and(|h| h < threshold)
    }
}

/// Body of `GET /humidity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumidityResponse {
    pub humidity: Option<f64>,
}

impl From<&HumidityReading> for HumidityResponse {
    fn from(reading: &HumidityReading) -> Self {
        Self {
            humidity: reading.humidity,
        }
    }
}
