pub mod settings;

pub use settings::{
    generate_default_config, DashboardSettings, LoggingSettings, SamplingSettings, Settings,
    StorageSettings,
};

/// Readings generated per cycle.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Pause between two cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STORE_PATH: &str = "sensor_readings.csv";
pub const DEFAULT_DASHBOARD_QUEUE: usize = 4;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_DASHBOARD_LOG_FILE: &str = "machine-monitor.log";

// Alert thresholds. A reading is anomalous only when strictly above.
pub const TEMPERATURE_LIMIT_C: f64 = 80.0;
pub const VIBRATION_LIMIT_MM_S: f64 = 10.0;

// Simulated sensor ranges (inclusive).
pub const TEMPERATURE_RANGE_C: (f64, f64) = (50.0, 100.0);
pub const VIBRATION_RANGE_MM_S: (f64, f64) = (5.0, 15.0);
