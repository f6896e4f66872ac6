use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{CycleCounter, CycleTag};
use crate::config::Settings;
use crate::dashboard::DashboardHandle;
use crate::errors::{MonitorError, MonitorResult};
use crate::monitoring::report::{self, summarize, Summary};
use crate::monitoring::{Alert, AnomalyDetector, ReadingSource, SimulatedFleet};
use crate::storage::{CsvStore, ReadingSink};

/// What one cycle produced, for callers and tests.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub tag: CycleTag,
    pub readings: usize,
    pub alerts: Vec<Alert>,
    pub summary: Summary,
    pub persisted: bool,
    pub rendered: bool,
}

pub struct CycleDriver<R, S> {
    source: R,
    detector: AnomalyDetector,
    sink: S,
    dashboard: Option<DashboardHandle>,
    out: Box<dyn Write + Send>,
    batch_size: usize,
    interval: Duration,
    counter: CycleCounter,
    run_id: Uuid,
}

impl CycleDriver<SimulatedFleet, CsvStore> {
    pub fn from_settings(settings: &Settings) -> MonitorResult<Self> {
        settings.validate()?;
        Self::new(
            SimulatedFleet::new(settings.sampling.seed),
            CsvStore::new(&settings.storage.path),
            settings.sampling.batch_size,
            settings.interval(),
        )
    }
}

impl<R: ReadingSource, S: ReadingSink> CycleDriver<R, S> {
    pub fn new(source: R, sink: S, batch_size: usize, interval: Duration) -> MonitorResult<Self> {
        if batch_size == 0 {
            return Err(MonitorError::InvalidInput(
                "batch size must be positive".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(MonitorError::InvalidInput(
                "cycle interval must be positive".to_string(),
            ));
        }

        Ok(Self {
            source,
            detector: AnomalyDetector::new(),
            sink,
            dashboard: None,
            out: Box::new(io::stdout()),
            batch_size,
            interval,
            counter: CycleCounter::default(),
            run_id: Uuid::new_v4(),
        })
    }

    pub fn with_dashboard(mut self, dashboard: DashboardHandle) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    /// Redirects the console report, stdout by default.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn cycles_started(&self) -> u64 {
        self.counter.issued()
    }

    /// Runs one generate, evaluate, summarize, persist, render pass.
    ///
    /// A locked store is reported and skipped; any other storage failure
    /// is returned and should end the run.
    pub fn run_cycle(&mut self, tag: CycleTag) -> MonitorResult<CycleReport> {
        let out: &mut dyn Write = self.out.as_mut();
        report::write_banner(out, &tag)?;

        let batch = self.source.generate(self.batch_size)?;
        let alerts = self.detector.evaluate(&batch);
        report::write_alerts(out, &alerts)?;

        let summary = summarize(&batch, &alerts)?;
        report::write_summary(out, &summary)?;
        info!(
            cycle = tag.number(),
            readings = batch.len(),
            alerts = summary.alert_count,
            mean_temperature = summary.mean_temperature,
            mean_vibration = summary.mean_vibration,
            "Cycle evaluated"
        );

        let persisted = match self.sink.append(&batch, &tag) {
            Ok(outcome) => {
                debug!(
                    cycle = tag.number(),
                    rows = outcome.rows_written,
                    header = outcome.header_written,
                    "Store updated"
                );
                report::write_saved(out, self.sink.path())?;
                true
            }
            Err(err) if err.is_recoverable() => {
                warn!(cycle = tag.number(), error = %err, "Store locked, batch not persisted");
                report::write_store_locked(out, self.sink.path())?;
                false
            }
            Err(err) => {
                error!(cycle = tag.number(), error = %err, "Store write failed");
                return Err(err.into());
            }
        };
        out.flush()?;

        let readings = batch.len();
        let rendered = match &self.dashboard {
            Some(dashboard) => dashboard.submit(tag, batch),
            None => false,
        };

        Ok(CycleReport {
            tag,
            readings,
            alerts,
            summary,
            persisted,
            rendered,
        })
    }

    /// Runs a cycle immediately and then once per interval until `shutdown`
    /// resolves, `max_cycles` cycles have run, or a cycle fails.
    ///
    /// Returns the number of cycles completed by this call.
    pub async fn run<F>(&mut self, shutdown: F, max_cycles: Option<u64>) -> MonitorResult<u64>
    where
        F: Future<Output = ()>,
    {
        let span = info_span!("monitor", run_id = %self.run_id);
        async {
            info!(
                interval_secs = self.interval.as_secs(),
                batch_size = self.batch_size,
                store = %self.sink.path().display(),
                "Monitor started"
            );

            tokio::pin!(shutdown);
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut completed = 0u64;

            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        info!(cycles = completed, "Shutdown requested");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let tag = self.counter.advance();
                self.run_cycle(tag)?;
                completed += 1;

                if max_cycles.is_some_and(|max| completed >= max) {
                    info!(cycles = completed, "Cycle limit reached");
                    break;
                }
            }

            Ok::<u64, MonitorError>(completed)
        }
        .instrument(span)
        .await
    }
}
