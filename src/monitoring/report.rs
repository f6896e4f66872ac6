//! Cycle statistics and the human-readable console report.

use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;

use super::anomaly_detection::Alert;
use super::readings::Batch;
use crate::core::CycleTag;
use crate::errors::{MonitorError, MonitorResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean_temperature: f64,
    pub mean_vibration: f64,
    pub alert_count: usize,
}

pub fn summarize(batch: &Batch, alerts: &[Alert]) -> MonitorResult<Summary> {
    if batch.is_empty() {
        return Err(MonitorError::InvalidInput(
            "cannot summarize an empty batch".to_string(),
        ));
    }

    let count = batch.len() as f64;
    let (temperature_sum, vibration_sum) = batch.iter().fold((0.0, 0.0), |(t, v), r| {
        (t + r.temperature_celsius, v + r.vibration_mm_s)
    });

    Ok(Summary {
        mean_temperature: temperature_sum / count,
        mean_vibration: vibration_sum / count,
        alert_count: alerts.len(),
    })
}

pub fn write_banner(out: &mut dyn Write, tag: &CycleTag) -> io::Result<()> {
    writeln!(out, "\n{}: generating new readings...", tag)
}

pub fn write_alerts(out: &mut dyn Write, alerts: &[Alert]) -> io::Result<()> {
    writeln!(out, "\nAnomaly alerts:")?;
    for alert in alerts {
        writeln!(
            out,
            "{} machine {} critical {} of {:.2}",
            "ALERT:".red().bold(),
            alert.machine_id,
            alert.metric,
            alert.value
        )?;
    }
    Ok(())
}

pub fn write_summary(out: &mut dyn Write, summary: &Summary) -> io::Result<()> {
    writeln!(out, "\n--- Summary Report ---")?;
    writeln!(out, "Average temperature: {:.2} °C", summary.mean_temperature)?;
    writeln!(out, "Average vibration: {:.2} mm/s", summary.mean_vibration)?;
    writeln!(out, "Total alerts: {}", summary.alert_count)
}

pub fn write_saved(out: &mut dyn Write, path: &Path) -> io::Result<()> {
    writeln!(out, "\nData saved to '{}'.", path.display())
}

pub fn write_store_locked(out: &mut dyn Write, path: &Path) -> io::Result<()> {
    writeln!(
        out,
        "{} '{}' is open in another program. Close it and try again.",
        "Error:".yellow().bold(),
        path.display()
    )
}
