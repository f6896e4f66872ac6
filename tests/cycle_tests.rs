use machine_monitor::errors::MonitorResult;
use machine_monitor::{
    Alert, AppendOutcome, Batch, CsvStore, CycleDriver, CycleTag, DashboardHandle, MetricType,
    MonitorError, Reading, ReadingSink, ReadingSource, SimulatedFleet, StorageError,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);

/// Hands out the same batch every cycle.
struct FixedSource(Batch);

impl ReadingSource for FixedSource {
    fn generate(&mut self, _n: usize) -> MonitorResult<Batch> {
        Ok(self.0.clone())
    }
}

/// Behaves like a store some other program has opened exclusively.
struct LockedSink {
    path: PathBuf,
    attempts: usize,
}

impl ReadingSink for LockedSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, _batch: &Batch, _tag: &CycleTag) -> Result<AppendOutcome, StorageError> {
        self.attempts += 1;
        Err(StorageError::classify(
            &self.path,
            io::Error::from(io::ErrorKind::WouldBlock),
        ))
    }
}

struct BrokenSink(PathBuf);

impl ReadingSink for BrokenSink {
    fn path(&self) -> &Path {
        &self.0
    }

    fn append(&mut self, _batch: &Batch, _tag: &CycleTag) -> Result<AppendOutcome, StorageError> {
        Err(StorageError::classify(
            &self.0,
            io::Error::new(io::ErrorKind::Other, "disk full"),
        ))
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn hot_machine() -> Batch {
    Batch::new(vec![Reading::new("MAQ1", 95.0, 6.0)])
}

#[test]
fn single_hot_reading_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor_readings.csv");
    let console = SharedBuffer::default();

    let mut driver = CycleDriver::new(FixedSource(hot_machine()), CsvStore::new(&path), 1, MINUTE)
        .unwrap()
        .with_output(console.clone());

    let report = driver.run_cycle(CycleTag::new(1)).unwrap();

    assert_eq!(
        report.alerts,
        vec![Alert {
            machine_id: "MAQ1".to_string(),
            metric: MetricType::Temperature,
            value: 95.0,
        }]
    );
    assert_eq!(report.summary.mean_temperature, 95.0);
    assert_eq!(report.summary.mean_vibration, 6.0);
    assert_eq!(report.summary.alert_count, 1);
    assert!(report.persisted);
    assert!(!report.rendered);

    let rows = std::fs::read_to_string(&path).unwrap();
    assert!(rows.ends_with("Reading 1,MAQ1,95.00,6.00\n"));

    let text = console.text();
    assert!(text.contains("Reading 1: generating new readings..."));
    assert!(text.contains("machine MAQ1 critical temperature of 95.00\n"));
    assert!(text.contains("Average temperature: 95.00 °C"));
    assert!(text.contains("Total alerts: 1"));
    assert!(text.contains("Data saved to"));
}

#[test]
fn locked_store_still_reaches_the_dashboard() {
    let console = SharedBuffer::default();
    let (handle, mut frames) = DashboardHandle::channel(4);
    let sink = LockedSink {
        path: PathBuf::from("sensor_readings.csv"),
        attempts: 0,
    };

    let mut driver = CycleDriver::new(FixedSource(hot_machine()), sink, 1, MINUTE)
        .unwrap()
        .with_output(console.clone())
        .with_dashboard(handle);

    let report = driver.run_cycle(CycleTag::new(5)).unwrap();

    assert!(!report.persisted);
    assert!(report.rendered);
    assert_eq!(driver.sink().attempts, 1);

    let frame = frames.try_recv().unwrap();
    assert_eq!(frame.tag, CycleTag::new(5));
    assert_eq!(frame.batch, hot_machine());

    let text = console.text();
    assert!(text.contains("'sensor_readings.csv' is open in another program"));
    assert!(!text.contains("Data saved to"));
}

#[test]
fn other_storage_failures_end_the_cycle() {
    let (handle, mut frames) = DashboardHandle::channel(4);
    let mut driver = CycleDriver::new(
        FixedSource(hot_machine()),
        BrokenSink(PathBuf::from("sensor_readings.csv")),
        1,
        MINUTE,
    )
    .unwrap()
    .with_output(io::sink())
    .with_dashboard(handle);

    let err = driver.run_cycle(CycleTag::new(1)).unwrap_err();

    assert!(matches!(err, MonitorError::Storage(StorageError::Io { .. })));
    assert!(frames.try_recv().is_err());
}

#[test]
fn empty_batch_from_source_is_rejected() {
    let mut driver = CycleDriver::new(
        FixedSource(Batch::default()),
        LockedSink {
            path: PathBuf::from("unused.csv"),
            attempts: 0,
        },
        1,
        MINUTE,
    )
    .unwrap()
    .with_output(io::sink());

    let err = driver.run_cycle(CycleTag::new(1)).unwrap_err();
    assert!(matches!(err, MonitorError::InvalidInput(_)));
    assert_eq!(driver.sink().attempts, 0);
}

#[test]
fn zero_batch_size_or_interval_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::new(dir.path().join("rows.csv"));

    assert!(matches!(
        CycleDriver::new(SimulatedFleet::new(Some(1)), store.clone(), 0, MINUTE),
        Err(MonitorError::InvalidInput(_))
    ));
    assert!(matches!(
        CycleDriver::new(SimulatedFleet::new(Some(1)), store, 10, Duration::ZERO),
        Err(MonitorError::InvalidInput(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn cycles_are_spaced_by_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sensor_readings.csv");
    let (handle, mut frames) = DashboardHandle::channel(8);

    let mut driver = CycleDriver::new(SimulatedFleet::new(Some(3)), CsvStore::new(&path), 10, MINUTE)
        .unwrap()
        .with_output(io::sink())
        .with_dashboard(handle);

    let started = Instant::now();
    let completed = driver
        .run(std::future::pending::<()>(), Some(3))
        .await
        .unwrap();

    assert_eq!(completed, 3);
    assert_eq!(driver.cycles_started(), 3);
    assert_eq!(started.elapsed(), 2 * MINUTE);

    let rows = std::fs::read_to_string(&path).unwrap();
    assert_eq!(rows.lines().count(), 1 + 3 * 10);
    for cycle in 1..=3 {
        assert_eq!(rows.matches(&format!("Reading {},", cycle)).count(), 10);
    }

    let tags: Vec<u64> = std::iter::from_fn(|| frames.try_recv().ok())
        .map(|frame| frame.tag.number())
        .collect();
    assert_eq!(tags, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_wait() {
    let mut driver = CycleDriver::new(
        FixedSource(hot_machine()),
        LockedSink {
            path: PathBuf::from("sensor_readings.csv"),
            attempts: 0,
        },
        1,
        MINUTE,
    )
    .unwrap()
    .with_output(io::sink());

    let started = Instant::now();
    let completed = driver
        .run(tokio::time::sleep(Duration::from_secs(150)), None)
        .await
        .unwrap();

    // Cycles at 0s, 60s and 120s; the signal arrives before the 180s tick.
    assert_eq!(completed, 3);
    assert_eq!(driver.sink().attempts, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(150));
}

#[tokio::test(start_paused = true)]
async fn fatal_storage_error_stops_the_loop() {
    let mut driver = CycleDriver::new(
        FixedSource(hot_machine()),
        BrokenSink(PathBuf::from("sensor_readings.csv")),
        1,
        MINUTE,
    )
    .unwrap()
    .with_output(io::sink());

    let result = driver.run(std::future::pending::<()>(), None).await;

    assert!(matches!(result, Err(MonitorError::Storage(_))));
    assert_eq!(driver.cycles_started(), 1);
}

#[tokio::test(start_paused = true)]
async fn tags_keep_increasing_across_runs() {
    let (handle, mut frames) = DashboardHandle::channel(8);
    let mut driver = CycleDriver::new(
        FixedSource(hot_machine()),
        LockedSink {
            path: PathBuf::from("sensor_readings.csv"),
            attempts: 0,
        },
        1,
        MINUTE,
    )
    .unwrap()
    .with_output(io::sink())
    .with_dashboard(handle);

    driver.run(std::future::pending::<()>(), Some(2)).await.unwrap();
    driver.run(std::future::pending::<()>(), Some(2)).await.unwrap();

    let tags: Vec<u64> = std::iter::from_fn(|| frames.try_recv().ok())
        .map(|frame| frame.tag.number())
        .collect();
    assert_eq!(tags, vec![1, 2, 3, 4]);
}
