use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key under which one cloud's labels are persisted. Binding the point count
/// into the key means a file whose geometry changed between sessions simply
/// misses its old entry instead of importing a mismatched array.
pub fn storage_key(file_key: &str, point_count: usize) -> String {
    format!("anno:{}:N={}", file_key, point_count)
}

/// Why a persisted label array was rejected.
#[derive(Debug, PartialEq, Eq)]
pub enum ImportError {
    /// Entry length differs from the current point count for that key.
    LengthMismatch { expected: usize, got: usize },
    /// No entry stored under the requested key.
    UnknownKey(String),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { expected, got } => {
                write!(f, "label array length {} does not match point count {}", got, expected)
            }
            Self::UnknownKey(key) => write!(f, "no stored labels under key '{}'", key),
        }
    }
}

impl std::error::Error for ImportError {}

/// Persisted label state across every cloud seen this session: a flat map of
/// [`storage_key`] to one `i32` per point in point order, `-1` meaning
/// unlabeled. Serialized as a single JSON object; `BTreeMap` keeps key order
/// stable across saves. A bad entry affects only its own key.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LabelArchive {
    #[serde(flatten)]
    entries: BTreeMap<String, Vec<i32>>,
}

impl LabelArchive {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Record the exported labels for a key, replacing any previous entry.
    pub fn record(&mut self, key: String, labels: Vec<i32>) {
        self.entries.insert(key, labels);
    }

    /// Stored labels for a key, validated against the expected point count.
    pub fn labels_for(&self, key: &str, point_count: usize) -> Result<&[i32], ImportError> {
        let labels = self
            .entries
            .get(key)
            .ok_or_else(|| ImportError::UnknownKey(key.to_owned()))?;
        if labels.len() != point_count {
            return Err(ImportError::LengthMismatch {
                expected: point_count,
                got: labels.len(),
            });
        }
        Ok(labels)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_encodes_identity_and_count() {
        assert_eq!(storage_key("scans/a.las", 42), "anno:scans/a.las:N=42");
    }

    #[test]
    fn archive_round_trips_through_json() {
        let mut archive = LabelArchive::default();
        archive.record(storage_key("a", 3), vec![-1, 0, 5]);
        archive.record(storage_key("b", 2), vec![1, 1]);

        let restored = LabelArchive::from_json(&archive.to_json().unwrap()).unwrap();
        assert_eq!(restored.labels_for(&storage_key("a", 3), 3).unwrap(), &[-1, 0, 5]);
        assert_eq!(restored.len(), 2);
    }

    #[test]
    fn mismatched_or_missing_entries_are_rejected_per_key() {
        let mut archive = LabelArchive::default();
        archive.record("anno:a:N=3".to_owned(), vec![0, 1, 2]);

        assert_eq!(
            archive.labels_for("anno:a:N=3", 4),
            Err(ImportError::LengthMismatch { expected: 4, got: 3 })
        );
        assert!(matches!(
            archive.labels_for("anno:missing:N=1", 1),
            Err(ImportError::UnknownKey(_))
        ));
        // The good entry is still intact.
        assert!(archive.labels_for("anno:a:N=3", 3).is_ok());
    }
}
