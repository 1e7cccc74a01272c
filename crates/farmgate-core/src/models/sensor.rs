//! Sensor reading and analysis result models

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys of an inbound reading that carry metadata rather than a measurement
const METADATA_KEYS: [&str; 3] = ["sensor_id", "location", "timestamp"];

/// One multi-parameter sensor capture
///
/// Deserialized from the flat JSON object the telemetry source submits, e.g.
/// `{"temperature": "28.5", "humidity": 60, "sensor_id": "esp32-1"}`.
/// Every non-metadata value is coerced to `f64`; anything that does not
/// parse becomes `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct SensorReading {
    /// Parameter name to measured value
    pub values: BTreeMap<String, f64>,
    /// Sensor identifier, if the source supplied one
    pub sensor_id: Option<String>,
    /// Location label, if the source supplied one
    pub location: Option<String>,
    /// Capture time
    pub captured_at: DateTime<Utc>,
}

impl SensorReading {
    /// Create an empty reading captured now
    pub fn new() -> Self {
        Self {
            values: BTreeMap::new(),
            sensor_id: None,
            location: None,
            captured_at: Utc::now(),
        }
    }

    /// Builder: set a parameter value
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder: set the sensor identifier
    pub fn with_sensor_id(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    /// Builder: set the location label
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Get a parameter value if the reading carries it
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for SensorReading {
    fn from(map: Map<String, Value>) -> Self {
        let mut reading = SensorReading::new();

        for (key, value) in map {
            match key.as_str() {
                "sensor_id" => reading.sensor_id = value_as_label(&value),
                "location" => reading.location = value_as_label(&value),
                "timestamp" => {
                    if let Some(ts) = parse_timestamp(&value) {
                        reading.captured_at = ts;
                    }
                }
                _ => {
                    reading.values.insert(key, coerce_f64(&value));
                }
            }
        }

        reading
    }
}

impl From<SensorReading> for Map<String, Value> {
    fn from(reading: SensorReading) -> Self {
        let mut map = Map::new();
        for (name, value) in reading.values {
            map.insert(name, Value::from(value));
        }
        if let Some(sensor_id) = reading.sensor_id {
            map.insert("sensor_id".to_string(), Value::String(sensor_id));
        }
        if let Some(location) = reading.location {
            map.insert("location".to_string(), Value::String(location));
        }
        map.insert(
            "timestamp".to_string(),
            Value::from(reading.captured_at.timestamp()),
        );
        map
    }
}

/// Whether a key of an inbound reading is metadata rather than a measurement
pub fn is_metadata_key(key: &str) -> bool {
    METADATA_KEYS.contains(&key)
}

/// Coerce an untyped JSON value into a finite `f64`.
///
/// Numbers pass through; strings are parsed from their leading numeric
/// prefix (`"28.5C"` is `28.5`); everything else, and any non-finite result,
/// is `0.0`.
pub fn coerce_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_leading_float(s).unwrap_or(0.0),
        _ => 0.0,
    };
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Parse the longest numeric prefix of a string
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    // Optional exponent, only consumed when complete
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn value_as_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts unix seconds, unix milliseconds, or an RFC 3339 string
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            // Anything past year ~2286 in seconds is really milliseconds
            if raw > 9_999_999_999 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Unit label for a well-known sensor parameter
pub fn unit_for_parameter(parameter: &str) -> &'static str {
    match parameter {
        "temperature" => "°C",
        "humidity" => "%",
        "soil_moisture" => "%",
        "ph_level" => "pH",
        "light" => "lux",
        "pressure" => "hPa",
        _ => "",
    }
}

/// Result of analysing one sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Echo of the input, one value per parameter
    pub averages: BTreeMap<String, f64>,
    /// Signed direction per parameter (positive is improving)
    pub trends: BTreeMap<String, f64>,
    /// Human-readable alerts, never empty
    pub alerts: Vec<String>,
    /// Overall health in `[0.0, 1.0]`
    pub health_score: f64,
}

impl AnalysisResult {
    /// Zero-score result carrying a single error alert.
    ///
    /// Used as the fallback payload when the gateway could not complete a
    /// sensor submission.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self {
            averages: BTreeMap::new(),
            trends: BTreeMap::new(),
            alerts: vec![format!("Error: {}", message)],
            health_score: 0.0,
        }
    }
}
