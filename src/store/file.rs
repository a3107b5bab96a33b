//! JSON file record store.
//!
//! A collection is a single JSON array at `<root>/<database>/<collection>.json`.
//! The file is loaded once on open; every insert rewrites it through a
//! temporary sibling file followed by a rename, so a crash mid-write leaves
//! the previous contents intact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{NewStudent, RecordStore, Student, StoreError, StudentId};

/// A record store persisted as one JSON document per collection.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Vec<Student>>,
}

impl JsonFileStore {
    /// Opens (or prepares to create) the collection file under `root`.
    ///
    /// A missing file is treated as an empty collection; it is created on the
    /// first insert.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn open(root: &Path, database: &str, collection: &str) -> Result<Self, StoreError> {
        let path = root.join(database).join(format!("{collection}.json"));
        let records = load(&path)?;

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "Opened collection file"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Path of the backing collection file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[Student]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_vec_pretty(records).map_err(StoreError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

fn load(path: &Path) -> Result<Vec<Student>, StoreError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&contents).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

impl RecordStore for JsonFileStore {
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
        let mut records = self.records.write();
        records.push(student.with_id(id.clone()));

        if let Err(e) = self.persist(&records) {
            records.pop();
            return Err(e);
        }

        Ok(id)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.records.read().is_empty())
    }
}
