//! Threshold-based analysis of a single sensor reading.
//!
//! Each agronomic parameter is judged on its own against fixed bands; the
//! only interaction between parameters is that their penalties accumulate
//! into one health score and their alerts into one list.
//!
//! The `trends` map is a sign heuristic computed from the reading's distance
//! to a comfort band. It is not a time derivative: only one reading is seen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{AnalysisResult, SensorReading};

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const SOIL_MOISTURE: &str = "soil_moisture";
pub const PH_LEVEL: &str = "ph_level";

/// Parameters the engine scores, in reporting order
pub const SCORED_PARAMETERS: [&str; 4] = [TEMPERATURE, HUMIDITY, SOIL_MOISTURE, PH_LEVEL];

/// Alert emitted when nothing breaches a threshold
pub const NOMINAL_ALERT: &str = "All parameters within optimal range";

/// Recommendations appended after the per-parameter ones
pub const CLOSING_RECOMMENDATIONS: [&str; 2] = [
    "Continue regular monitoring of all parameters",
    "Document trends for seasonal analysis",
];

/// Recommendations returned when a submission could not be processed
pub const FAILURE_RECOMMENDATIONS: [&str; 2] = [
    "Check connection to load balancer",
    "Verify sensor data format",
];

/// Alert and penalty band for one parameter.
///
/// Penalties are in hundredths so the score arithmetic stays exact.
struct AlertBand {
    parameter: &'static str,
    low: f64,
    high: f64,
    low_alert: &'static str,
    high_alert: &'static str,
    penalty: u32,
}

const ALERT_BANDS: [AlertBand; 4] = [
    AlertBand {
        parameter: TEMPERATURE,
        low: 15.0,
        high: 35.0,
        low_alert: "Low temperature detected - frost protection may be needed",
        high_alert: "High temperature detected - consider cooling measures",
        penalty: 20,
    },
    AlertBand {
        parameter: HUMIDITY,
        low: 40.0,
        high: 80.0,
        low_alert: "Low humidity - consider irrigation",
        high_alert: "High humidity - monitor for fungal diseases",
        penalty: 15,
    },
    AlertBand {
        parameter: SOIL_MOISTURE,
        low: 25.0,
        high: 70.0,
        low_alert: "Low soil moisture - irrigation recommended",
        high_alert: "High soil moisture - check drainage",
        penalty: 20,
    },
    AlertBand {
        parameter: PH_LEVEL,
        low: 5.5,
        high: 8.0,
        low_alert: "pH level outside optimal range",
        high_alert: "pH level outside optimal range",
        penalty: 15,
    },
];

/// Advice band for one parameter
struct AdviceBand {
    parameter: &'static str,
    low: f64,
    high: f64,
    below: &'static str,
    above: &'static str,
    optimal: &'static str,
}

const ADVICE_BANDS: [AdviceBand; 4] = [
    AdviceBand {
        parameter: TEMPERATURE,
        low: 20.0,
        high: 30.0,
        below: "Consider greenhouse protection or heating",
        above: "Provide shade or cooling during peak hours",
        optimal: "Temperature conditions are optimal",
    },
    AdviceBand {
        parameter: HUMIDITY,
        low: 50.0,
        high: 75.0,
        below: "Increase irrigation frequency or use misting systems",
        above: "Improve ventilation to reduce humidity",
        optimal: "Humidity levels are appropriate",
    },
    AdviceBand {
        parameter: SOIL_MOISTURE,
        low: 30.0,
        high: 60.0,
        below: "Increase irrigation - soil is getting dry",
        above: "Reduce watering and check drainage systems",
        optimal: "Soil moisture is at optimal levels",
    },
    AdviceBand {
        parameter: PH_LEVEL,
        low: 6.0,
        high: 7.5,
        below: "Consider adding lime to raise pH levels",
        above: "Consider adding sulfur or organic matter to lower pH",
        optimal: "pH levels are optimal for most crops",
    },
];

/// Engine configuration
///
/// `defaults` supplies values for scored parameters a reading does not
/// carry. Without an entry, a missing parameter reads as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub defaults: BTreeMap<String, f64>,
}

impl AnalysisConfig {
    /// Builder: set a default for one parameter
    pub fn with_default(mut self, parameter: impl Into<String>, value: f64) -> Self {
        self.defaults.insert(parameter.into(), value);
        self
    }
}

/// Scores sensor readings against fixed agronomic thresholds
#[derive(Debug, Clone, Default)]
pub struct SensorAnalysisEngine {
    config: AnalysisConfig,
}

impl SensorAnalysisEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Value of a parameter, falling back to the configured default, then zero
    fn value(&self, reading: &SensorReading, parameter: &str) -> f64 {
        reading
            .value(parameter)
            .or_else(|| self.config.defaults.get(parameter).copied())
            .unwrap_or(0.0)
    }

    /// Analyse one reading
    pub fn analyze(&self, reading: &SensorReading) -> AnalysisResult {
        let mut averages = reading.values.clone();
        let mut trends: BTreeMap<String, f64> =
            reading.values.keys().map(|k| (k.clone(), 0.0)).collect();

        for parameter in SCORED_PARAMETERS {
            let value = self.value(reading, parameter);
            averages.insert(parameter.to_string(), value);
            trends.insert(parameter.to_string(), trend(parameter, value));
        }

        let mut alerts = Vec::new();
        let mut penalty: u32 = 0;

        for band in &ALERT_BANDS {
            let value = self.value(reading, band.parameter);
            if value > band.high {
                alerts.push(band.high_alert.to_string());
            } else if value < band.low {
                alerts.push(band.low_alert.to_string());
            }
            if value < band.low || value > band.high {
                penalty += band.penalty;
            }
        }

        if alerts.is_empty() {
            alerts.push(NOMINAL_ALERT.to_string());
        }

        let health_score = (100u32.saturating_sub(penalty)) as f64 / 100.0;

        AnalysisResult {
            averages,
            trends,
            alerts,
            health_score: health_score.clamp(0.0, 1.0),
        }
    }

    /// Ordered recommendations for one reading
    pub fn recommendations(&self, reading: &SensorReading) -> Vec<String> {
        let mut recommendations: Vec<String> = ADVICE_BANDS
            .iter()
            .map(|band| {
                let value = self.value(reading, band.parameter);
                if value < band.low {
                    band.below
                } else if value > band.high {
                    band.above
                } else {
                    band.optimal
                }
                .to_string()
            })
            .collect();

        recommendations.extend(CLOSING_RECOMMENDATIONS.iter().map(|r| r.to_string()));
        recommendations
    }
}

/// Signed trend heuristic for one parameter
fn trend(parameter: &str, value: f64) -> f64 {
    match parameter {
        TEMPERATURE => {
            if value > 30.0 {
                -0.2
            } else if value < 20.0 {
                0.3
            } else {
                0.1
            }
        }
        HUMIDITY => {
            if value > 70.0 {
                -0.1
            } else if value < 50.0 {
                0.2
            } else {
                0.0
            }
        }
        SOIL_MOISTURE => {
            if value < 30.0 {
                -0.3
            } else if value > 60.0 {
                0.1
            } else {
                0.0
            }
        }
        PH_LEVEL => {
            if (value - 6.5).abs() > 1.0 {
                -0.1
            } else {
                0.05
            }
        }
        _ => 0.0,
    }
}

/// Grade a health score for the analysis summary
pub fn grade(health_score: f64) -> &'static str {
    if health_score > 0.8 {
        "excellent"
    } else if health_score > 0.6 {
        "good"
    } else if health_score > 0.4 {
        "fair"
    } else {
        "poor"
    }
}

/// One-line summary of an analysis
pub fn summary(result: &AnalysisResult) -> String {
    format!(
        "Analysis of agricultural sensor data shows {} growing conditions.",
        grade(result.health_score)
    )
}
