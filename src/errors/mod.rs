use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Console output error: {0}")]
    Output(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Failures raised by the persistence sink.
///
/// `Locked` is the only variant the cycle driver treats as recoverable: the
/// cycle keeps going and that batch is simply not written.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("store {} is locked by another process", .path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write store {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Sorts an I/O failure on `path` into lock contention or a hard failure.
    pub fn classify(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if is_lock_contention(&source) {
            StorageError::Locked { path, source }
        } else {
            StorageError::Io { path, source }
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, StorageError::Locked { .. })
    }
}

fn is_lock_contention(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
