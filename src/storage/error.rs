//! Storage-specific error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the record file failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `append` was called before `initialize`.
    #[error("sink not initialized: {}", .0.display())]
    NotInitialized(PathBuf),
}
