pub mod csv_store;

use std::path::Path;

use crate::core::CycleTag;
use crate::errors::StorageError;
use crate::monitoring::Batch;

pub use csv_store::CsvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    pub rows_written: usize,
    pub header_written: bool,
}

/// Durable destination for each cycle's batch.
///
/// Implementations open, write and release the store inside `append`, so a
/// process stopped between cycles never leaves a half-open handle behind.
pub trait ReadingSink {
    fn path(&self) -> &Path;

    fn append(&mut self, batch: &Batch, tag: &CycleTag) -> Result<AppendOutcome, StorageError>;
}
