//! In-memory record store.

use parking_lot::RwLock;

use super::{NewStudent, RecordStore, Student, StoreError, StudentId};

/// A process-local store. Records live until the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<Student>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }
}

impl RecordStore for MemoryStore {
    fn find_all(&self) -> Result<Vec<Student>, StoreError> {
        Ok(self.records.read().clone())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Student>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|student| student.name == name)
            .cloned())
    }

    fn insert(&self, student: NewStudent) -> Result<StudentId, StoreError> {
        let id = StudentId::generate();
        self.records.write().push(student.with_id(id.clone()));
        Ok(id)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.records.read().is_empty())
    }
}
