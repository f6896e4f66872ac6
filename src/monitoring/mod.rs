pub mod anomaly_detection;
pub mod readings;
pub mod report;

pub use anomaly_detection::{Alert, AnomalyDetector, MetricType, Thresholds};
pub use readings::{Batch, Reading, ReadingSource, SimulatedFleet};
pub use report::{summarize, Summary};
