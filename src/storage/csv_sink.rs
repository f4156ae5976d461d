//! CSV record sink.
//!
//! Single-writer: only the orchestrator appends. Every append acquires the
//! file, writes one row, flushes and releases it, so a row is on disk once
//! `append` returns.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::storage::StorageError;
use crate::storage::types::{CSV_HEADER, Sample};

/// Destination for cycle samples.
pub trait MetricsSink: Send + Sync {
    /// Prepare the store and write the header.
    ///
    /// Only the first call per sink has an effect.
    fn initialize(&self) -> Result<(), StorageError>;

    /// Durably append one sample.
    fn append(&self, sample: &Sample) -> Result<(), StorageError>;
}

impl<S: MetricsSink + ?Sized> MetricsSink for std::sync::Arc<S> {
    fn initialize(&self) -> Result<(), StorageError> {
        (**self).initialize()
    }

    fn append(&self, sample: &Sample) -> Result<(), StorageError> {
        (**self).append(sample)
    }
}

/// Append-only CSV file sink.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    initialized: AtomicBool,
}

impl CsvSink {
    /// Create a sink writing to `path`. Nothing touches the file until
    /// [`MetricsSink::initialize`] is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn write_header(&self) -> Result<(), StorageError> {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", CSV_HEADER.join(",")).map_err(|e| self.io_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))
    }
}

impl MetricsSink for CsvSink {
    fn initialize(&self) -> Result<(), StorageError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            tracing::debug!(path = %self.path.display(), "CSV sink already initialized");
            return Ok(());
        }

        if let Err(e) = self.write_header() {
            self.initialized.store(false, Ordering::Release);
            return Err(e);
        }

        tracing::info!(path = %self.path.display(), "CSV sink initialized");
        Ok(())
    }

    fn append(&self, sample: &Sample) -> Result<(), StorageError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(StorageError::NotInitialized(self.path.clone()));
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{}", sample.csv_row()).map_err(|e| self.io_error(e))?;
        file.flush().map_err(|e| self.io_error(e))
    }
}
