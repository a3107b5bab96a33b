//! Sample records used by `--seed`.

use indexmap::IndexMap;

use super::{NewStudent, RecordStore, StoreError};

const SAMPLE: &[(&str, [f64; 5])] = &[
    ("Juan Pérez", [8.5, 9.0, 7.5, 8.8, 8.2]),
    ("María García", [9.2, 8.7, 9.5, 8.9, 9.1]),
    ("Carlos López", [7.8, 8.2, 8.0, 7.9, 8.5]),
    ("Ana Martínez", [9.5, 9.3, 9.0, 9.4, 9.2]),
    ("Luis Rodríguez", [7.2, 7.8, 7.5, 8.1, 7.9]),
];

const SUBJECTS: [&str; 5] = ["matematicas", "historia", "ciencias", "literatura", "ingles"];

/// Returns the sample student set.
#[must_use]
pub fn students() -> Vec<NewStudent> {
    SAMPLE
        .iter()
        .map(|(name, grades)| {
            let subjects: IndexMap<String, f64> = SUBJECTS
                .iter()
                .zip(grades)
                .map(|(subject, grade)| ((*subject).to_string(), *grade))
                .collect();
            NewStudent::new(*name, subjects)
        })
        .collect()
}

/// Inserts the sample set if the store is empty.
///
/// Returns the number of records inserted.
///
/// # Errors
///
/// Returns the first store error encountered.
pub fn seed(store: &dyn RecordStore) -> Result<usize, StoreError> {
    if !store.is_empty()? {
        return Ok(0);
    }

    let mut inserted = 0;
    for student in students() {
        store.insert(student)?;
        inserted += 1;
    }
    Ok(inserted)
}
