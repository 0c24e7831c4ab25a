use async_trait::async_trait;
use dashmap::DashMap;

use super::{Record, RecordType};
use crate::transport::SearchError;

/// Enumerates live records of a record type. Implemented by the host's
/// record store; used by backfill.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn all_records(&self, record_type: &RecordType) -> Result<Vec<Record>, SearchError>;
}

/// Record source over an in-memory snapshot, keyed by lower-cased type name.
///
/// Backs the `migratesearch` manifest and the test suites.
#[derive(Debug)]
pub struct StaticRecordSource {
    records: DashMap<String, Vec<Record>>,
}

impl StaticRecordSource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Append a record under a type name.
    pub fn push(&self, type_name: &str, record: Record) {
        self.records
            .entry(type_name.to_lowercase())
            .or_default()
            .push(record);
    }

    /// Replace every record of a type.
    pub fn set(&self, type_name: &str, records: Vec<Record>) {
        self.records.insert(type_name.to_lowercase(), records);
    }

    /// Number of records held for a type.
    #[must_use]
    pub fn count(&self, type_name: &str) -> usize {
        self.records
            .get(&type_name.to_lowercase())
            .map_or(0, |r| r.len())
    }
}

impl Default for StaticRecordSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn all_records(&self, record_type: &RecordType) -> Result<Vec<Record>, SearchError> {
        Ok(self
            .records
            .get(&record_type.name.to_lowercase())
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_type_is_empty() {
        let source = StaticRecordSource::new();
        let records = source.all_records(&RecordType::new("Nope")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let source = StaticRecordSource::new();
        source.push("Article", Record::new(1).with("title", "a"));
        source.push("article", Record::new(2).with("title", "b"));

        assert_eq!(source.count("ARTICLE"), 2);
        let records = source.all_records(&RecordType::new("Article")).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let source = StaticRecordSource::default();
        source.push("a", Record::new(1));
        source.set("a", vec![Record::new(9)]);
        let records = source.all_records(&RecordType::new("A")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 9);
    }
}
