//! Student record storage.
//!
//! The protocol front end treats storage as an external collaborator behind the
//! [`RecordStore`] trait. Two adapters ship with the server:
//!
//! - [`MemoryStore`] — process-local, lost on exit
//! - [`JsonFileStore`] — one JSON document per collection on disk
//!
//! Store methods are synchronous. Async callers run them on the blocking pool.

mod file;
mod memory;
mod model;
pub mod sample;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use model::{NewStudent, Student, StudentId};

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by record store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read.
    #[error("failed to read collection file {path}: {source}")]
    Read {
        /// Path to the collection file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file could not be written.
    #[error("failed to write collection file {path}: {source}")]
    Write {
        /// Path to the collection file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not contain a valid collection.
    #[error("corrupt collection file {path}: {source}")]
    Corrupt {
        /// Path to the collection file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The collection could not be serialised.
    #[error("failed to encode collection: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Storage operations required by the tool dispatcher.
///
/// Implementations must be safe for concurrent use from several sessions.
pub trait RecordStore: Send + Sync {
    /// Returns every record in store order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_all(&self) -> Result<Vec<Student>, StoreError>;

    /// Returns the first record whose name equals `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn find_by_name(&self, name: &str) -> Result<Option<Student>, StoreError>;

    /// Stores a new record and returns its generated identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be persisted. Nothing is
    /// stored in that case.
    fn insert(&self, student: NewStudent) -> Result<StudentId, StoreError>;

    /// Returns `true` if the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.find_all()?.is_empty())
    }
}
