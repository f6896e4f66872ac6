pub mod cli;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod errors;
pub mod monitoring;
pub mod storage;
pub mod utils;

// Re-exports
pub use crate::core::{CycleDriver, CycleReport, CycleTag};
pub use crate::config::Settings;
pub use dashboard::{DashboardFrame, DashboardHandle};
pub use errors::{MonitorError, StorageError};
pub use monitoring::{Alert, AnomalyDetector, Batch, MetricType, Reading, ReadingSource, SimulatedFleet, Summary};
pub use storage::{AppendOutcome, CsvStore, ReadingSink};
