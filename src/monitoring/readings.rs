use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{TEMPERATURE_RANGE_C, VIBRATION_RANGE_MM_S};
use crate::errors::{MonitorError, MonitorResult};
use crate::utils::round2;

/// One sample from one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub machine_id: String,
    pub temperature_celsius: f64,
    pub vibration_mm_s: f64,
}

impl Reading {
    pub fn new(machine_id: impl Into<String>, temperature_celsius: f64, vibration_mm_s: f64) -> Self {
        Self {
            machine_id: machine_id.into(),
            temperature_celsius,
            vibration_mm_s,
        }
    }
}

/// Readings produced in one cycle, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    readings: Vec<Reading>,
}

impl Batch {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reading> {
        self.readings.iter()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Reading;
    type IntoIter = std::slice::Iter<'a, Reading>;

    fn into_iter(self) -> Self::IntoIter {
        self.readings.iter()
    }
}

pub fn machine_id(index: usize) -> String {
    format!("MAQ{}", index)
}

/// Anything that can hand the cycle a fresh batch of `n` readings.
pub trait ReadingSource {
    fn generate(&mut self, n: usize) -> MonitorResult<Batch>;
}

/// Simulated fleet: uniform random temperature and vibration per machine.
pub struct SimulatedFleet {
    rng: StdRng,
}

impl SimulatedFleet {
    /// A fixed `seed` replays the same sequence of batches.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl ReadingSource for SimulatedFleet {
    fn generate(&mut self, n: usize) -> MonitorResult<Batch> {
        if n == 0 {
            return Err(MonitorError::InvalidInput(
                "batch size must be positive".to_string(),
            ));
        }

        let (t_min, t_max) = TEMPERATURE_RANGE_C;
        let (v_min, v_max) = VIBRATION_RANGE_MM_S;

        let readings = (1..=n)
            .map(|i| {
                let temperature = round2(self.rng.gen_range(t_min..=t_max));
                let vibration = round2(self.rng.gen_range(v_min..=v_max));
                Reading::new(machine_id(i), temperature, vibration)
            })
            .collect();

        Ok(Batch::new(readings))
    }
}
