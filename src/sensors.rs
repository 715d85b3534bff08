//! In-memory sensor store.
//!
//! A sensor is one block of text split into paragraphs, each paired with
//! its embedding. Records live in a single map so the raw text and the
//! paragraph data can never drift apart; an intact record always carries
//! at least one embedded paragraph.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// One paragraph of a sensor together with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedParagraph {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A stored sensor: the original (trimmed) text plus its ordered
/// paragraph/embedding pairs. Paragraph order is the split order and is
/// what makes tie-breaking deterministic.
#[derive(Debug, Clone)]
pub struct SensorRecord {
    pub text: String,
    pub paragraphs: Vec<EmbeddedParagraph>,
}

impl SensorRecord {
    /// An intact record has at least one embedded paragraph. A record
    /// without any is the corrupted state callers must be told about.
    pub fn is_intact(&self) -> bool {
        !self.paragraphs.is_empty()
    }
}

/// Outcome of a bulk-create request. The three lists are disjoint and
/// together cover every entry of the batch.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BulkOutcome {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Process-lifetime sensor storage. Not synchronized; the application
/// wraps it in a lock and mutates it as a unit.
#[derive(Debug, Default)]
pub struct SensorStore {
    records: HashMap<String, SensorRecord>,
}

impl SensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any existing one for the same nameId.
    pub fn insert(&mut self, name_id: String, record: SensorRecord) {
        self.records.insert(name_id, record);
    }

    pub fn get(&self, name_id: &str) -> Option<&SensorRecord> {
        self.records.get(name_id)
    }

    pub fn contains(&self, name_id: &str) -> bool {
        self.records.contains_key(name_id)
    }

    /// Whether an intact record exists for this nameId. Bulk create
    /// skips only these; a corrupted record may be recreated.
    pub fn has_intact(&self, name_id: &str) -> bool {
        self.get(name_id).map_or(false, SensorRecord::is_intact)
    }

    /// Remove a record. Absence is not an error; the caller decides what
    /// `None` means.
    pub fn remove(&mut self, name_id: &str) -> Option<SensorRecord> {
        self.records.remove(name_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mapping of nameId to original text for every intact record.
    /// Records violating the paragraph invariant are silently left out of
    /// listings; only similarity checks report them.
    pub fn list(&self) -> BTreeMap<String, String> {
        self.records
            .iter()
            .filter(|(_, record)| record.is_intact())
            .map(|(name_id, record)| (name_id.clone(), record.text.clone()))
            .collect()
    }

    /// Sorted nameIds of intact records, used for not-found hints.
    pub fn known_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_intact())
            .map(|(name_id, _)| name_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// Split sensor text into paragraphs: one per line, trimmed, blanks
/// dropped. Order is preserved.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, paragraphs: &[&str]) -> SensorRecord {
        SensorRecord {
            text: text.to_string(),
            paragraphs: paragraphs
                .iter()
                .map(|p| EmbeddedParagraph {
                    text: p.to_string(),
                    embedding: vec![1.0, 0.0],
                })
                .collect(),
        }
    }

    #[test]
    fn test_split_paragraphs() {
        let text = "first line\n\n  second line  \nthird";
        assert_eq!(
            split_paragraphs(text),
            vec!["first line", "second line", "third"]
        );
    }

    #[test]
    fn test_split_paragraphs_handles_crlf() {
        assert_eq!(split_paragraphs("a\r\nb\r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_split_paragraphs_blank_only() {
        assert!(split_paragraphs("\n \n\t\n").is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let mut store = SensorStore::new();
        store.insert("demo".to_string(), record("old", &["old"]));
        store.insert("demo".to_string(), record("new", &["new", "er"]));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("demo").unwrap().text, "new");
        assert_eq!(store.get("demo").unwrap().paragraphs.len(), 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = SensorStore::new();
        store.insert("demo".to_string(), record("text", &["text"]));

        assert!(store.remove("demo").is_some());
        assert!(store.remove("demo").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_list_excludes_records_without_paragraphs() {
        let mut store = SensorStore::new();
        store.insert("good".to_string(), record("fine", &["fine"]));
        store.insert("broken".to_string(), record("orphaned text", &[]));

        let listing = store.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.get("good").map(String::as_str), Some("fine"));

        assert_eq!(store.known_ids(), vec!["good".to_string()]);
        // the broken record still occupies its slot
        assert!(store.contains("broken"));
    }
}
