//! Student record types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Store-assigned record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Identifier assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StudentId>,

    /// Display name, used as the lookup key.
    pub name: String,

    /// Grades keyed by subject name.
    #[serde(default)]
    pub subjects: IndexMap<String, f64>,
}

impl Student {
    /// Arithmetic mean of all grades, or `None` when no grades are recorded.
    ///
    /// Each grade is scaled before summing, so the mean of finite grades is
    /// finite even when their total is not.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // subject counts are tiny
    pub fn average(&self) -> Option<f64> {
        if self.subjects.is_empty() {
            return None;
        }
        let count = self.subjects.len() as f64;
        Some(self.subjects.values().map(|grade| grade / count).sum())
    }
}

/// A record that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    /// Display name.
    pub name: String,
    /// Grades keyed by subject name.
    pub subjects: IndexMap<String, f64>,
}

impl NewStudent {
    /// Creates a new unsaved record.
    #[must_use]
    pub fn new(name: impl Into<String>, subjects: IndexMap<String, f64>) -> Self {
        Self {
            name: name.into(),
            subjects,
        }
    }

    /// Attaches an identifier, producing a stored record.
    #[must_use]
    pub fn with_id(self, id: StudentId) -> Student {
        Student {
            id: Some(id),
            name: self.name,
            subjects: self.subjects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_grades() {
        let student = NewStudent::new(
            "Ana",
            IndexMap::from([("math".to_string(), 8.0), ("history".to_string(), 9.0)]),
        )
        .with_id(StudentId::generate());

        let average = student.average().unwrap();
        assert!((average - 8.5).abs() < f64::EPSILON);
    }

    #[test]
    fn average_of_huge_grades_stays_finite() {
        let student = NewStudent::new(
            "Big",
            IndexMap::from([("a".to_string(), 1e308), ("b".to_string(), 1e308)]),
        )
        .with_id(StudentId::generate());

        let average = student.average().unwrap();
        assert!(average.is_finite());
        assert!((average - 1e308).abs() <= 1e308 * f64::EPSILON);
    }

    #[test]
    fn average_without_grades() {
        let student = NewStudent::new("Empty", IndexMap::new()).with_id(StudentId::generate());
        assert!(student.average().is_none());
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(StudentId::generate(), StudentId::generate());
    }

    #[test]
    fn id_omitted_when_absent() {
        let student = Student {
            id: None,
            name: "Luis".to_string(),
            subjects: IndexMap::new(),
        };
        let json = serde_json::to_string(&student).unwrap();
        assert!(!json.contains("\"id\""));
    }
}
