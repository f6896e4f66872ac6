use serde::{Deserialize, Serialize};
use std::fmt;

use super::readings::{Batch, Reading};
use crate::config::{TEMPERATURE_LIMIT_C, VIBRATION_LIMIT_MM_S};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricType {
    Temperature,
    Vibration,
}

impl MetricType {
    pub fn label(&self) -> &'static str {
        match self {
            MetricType::Temperature => "temperature",
            MetricType::Vibration => "vibration",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MetricType::Temperature => "°C",
            MetricType::Vibration => "mm/s",
        }
    }

    pub fn value_of(&self, reading: &Reading) -> f64 {
        match self {
            MetricType::Temperature => reading.temperature_celsius,
            MetricType::Vibration => reading.vibration_mm_s,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub machine_id: String,
    pub metric: MetricType,
    pub value: f64,
}

/// Upper limits; a value strictly above its limit is an anomaly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    temperature: f64,
    vibration: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE_LIMIT_C,
            vibration: VIBRATION_LIMIT_MM_S,
        }
    }
}

impl Thresholds {
    pub fn limit(&self, metric: MetricType) -> f64 {
        match metric {
            MetricType::Temperature => self.temperature,
            MetricType::Vibration => self.vibration,
        }
    }

    pub fn exceeds(&self, metric: MetricType, value: f64) -> bool {
        value > self.limit(metric)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    thresholds: Thresholds,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Alerts in batch order; temperature is checked before vibration.
    pub fn evaluate(&self, batch: &Batch) -> Vec<Alert> {
        batch
            .iter()
            .flat_map(|reading| {
                [MetricType::Temperature, MetricType::Vibration]
                    .into_iter()
                    .filter_map(move |metric| {
                        let value = metric.value_of(reading);
                        self.thresholds.exceeds(metric, value).then(|| Alert {
                            machine_id: reading.machine_id.clone(),
                            metric,
                            value,
                        })
                    })
            })
            .collect()
    }
}
