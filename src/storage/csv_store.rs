use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{AppendOutcome, ReadingSink};
use crate::core::CycleTag;
use crate::errors::StorageError;
use crate::monitoring::Batch;

pub const HEADER: [&str; 4] = [
    "cycle_tag",
    "machine_id",
    "temperature_celsius",
    "vibration_mm_s",
];

/// Append-only CSV table shared by every run of the monitor.
#[derive(Debug, Clone)]
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> Result<File, StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::classify(parent, e))?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::classify(&self.path, e))
    }

    fn store_error(&self, source: io::Error) -> StorageError {
        StorageError::classify(&self.path, source)
    }
}

/// Writes the optional header and one line per reading, then flushes.
fn write_rows(
    writer: &mut impl Write,
    batch: &Batch,
    tag: &CycleTag,
    with_header: bool,
) -> io::Result<()> {
    if with_header {
        writeln!(writer, "{}", HEADER.join(","))?;
    }
    for reading in batch {
        writeln!(
            writer,
            "{},{},{:.2},{:.2}",
            tag, reading.machine_id, reading.temperature_celsius, reading.vibration_mm_s
        )?;
    }
    writer.flush()
}

impl ReadingSink for CsvStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, batch: &Batch, tag: &CycleTag) -> Result<AppendOutcome, StorageError> {
        let file = self.open()?;
        let is_empty = file.metadata().map_err(|e| self.store_error(e))?.len() == 0;

        // Another process's byte-range lock surfaces here, not at open.
        let mut writer = BufWriter::new(file);
        write_rows(&mut writer, batch, tag, is_empty).map_err(|e| self.store_error(e))?;

        debug!(path = %self.path.display(), cycle = tag.number(), rows = batch.len(), "Batch appended");

        Ok(AppendOutcome {
            rows_written: batch.len(),
            header_written: is_empty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::Reading;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/rows.csv");
        let mut store = CsvStore::new(&path);

        let batch = Batch::new(vec![Reading::new("MAQ1", 81.5, 9.25)]);
        let outcome = store.append(&batch, &CycleTag::new(4)).unwrap();

        assert!(outcome.header_written);
        assert_eq!(outcome.rows_written, 1);
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "cycle_tag,machine_id,temperature_celsius,vibration_mm_s\nReading 4,MAQ1,81.50,9.25\n"
        );
    }

    /// Accepts a few bytes, then refuses like a file another process has locked.
    struct LockedAfter(usize);

    impl Write for LockedAfter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            let n = buf.len().min(self.0);
            self.0 -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn lock_during_write_is_recoverable() {
        let store = CsvStore::new("rows.csv");
        let batch = Batch::new(vec![Reading::new("MAQ1", 81.5, 9.25)]);

        let err = write_rows(&mut LockedAfter(10), &batch, &CycleTag::new(2), true)
            .map_err(|e| store.store_error(e))
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(matches!(err, StorageError::Locked { .. }));
    }

    #[test]
    fn write_rows_emits_header_only_when_asked() {
        let batch = Batch::new(vec![Reading::new("MAQ2", 70.0, 5.5)]);
        let mut out = Vec::new();
        write_rows(&mut out, &batch, &CycleTag::new(3), false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Reading 3,MAQ2,70.00,5.50\n");
    }

    #[test]
    fn directory_in_place_of_store_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvStore::new(dir.path());

        let err = store
            .append(&Batch::new(vec![Reading::new("MAQ1", 60.0, 6.0)]), &CycleTag::new(1))
            .unwrap_err();
        assert!(!err.is_recoverable());
    }
}
