//! Snapshot manifest for offline rebuilds.
//!
//! One JSON file carries record types, index definitions and the records to
//! load:
//!
//! ```json
//! {
//!   "record_types": [
//!     {"name": "Article", "fields": [
//!       {"name": "title", "classification": "CharField"},
//!       {"name": "comments", "classification": "ManyToOneRel", "reverse_relation": true}
//!     ]}
//!   ],
//!   "indexes": [
//!     {"source": "Article", "allowed_fields": ["title"], "params": {"min_infix_len": "3"}}
//!   ],
//!   "records": {
//!     "Article": [{"id": 1, "values": {"title": "<b>Alice</b>"}}]
//!   }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::record::{Record, RecordType, StaticRecordSource};
use crate::schema::{IndexDefinition, Registry};
use crate::transport::SearchError;

/// One index definition as written in a manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexSpec {
    /// Record type name (case-insensitive)
    pub source: String,
    /// Table name override
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub allowed_fields: Option<Vec<String>>,
    #[serde(default)]
    pub params: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub record_types: Vec<RecordType>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub records: IndexMap<String, Vec<Record>>,
}

/// A manifest turned into live objects.
///
/// `record_types` owns the types the registry's definitions point at; drop
/// it and the definitions lose their source.
#[derive(Debug)]
pub struct LoadedManifest {
    pub record_types: Vec<Arc<RecordType>>,
    pub registry: Arc<Registry>,
    pub records: Arc<StaticRecordSource>,
}

impl Manifest {
    pub fn from_json_str(json: &str) -> Result<Self, SearchError> {
        serde_json::from_str(json).map_err(|e| SearchError::Config(format!("Invalid manifest: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("Cannot read manifest {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Build and freeze the registry and fill the record source.
    pub fn into_loaded(self) -> Result<LoadedManifest, SearchError> {
        let record_types: Vec<Arc<RecordType>> = self.record_types.into_iter().map(Arc::new).collect();

        let definitions = self
            .indexes
            .into_iter()
            .map(|spec| {
                let ty = record_types
                    .iter()
                    .find(|ty| ty.is_named(&spec.source))
                    .ok_or_else(|| {
                        SearchError::Config(format!("index source '{}' is not a declared record type", spec.source))
                    })?;
                let mut definition = IndexDefinition::new(ty);
                if let Some(name) = spec.name {
                    definition = definition.named(name);
                }
                if let Some(fields) = spec.allowed_fields {
                    definition = definition.allowed_fields(fields);
                }
                for (key, value) in spec.params {
                    definition = definition.param(key, value);
                }
                Ok(definition)
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let registry = Arc::new(Registry::new());
        registry.register(definitions)?;
        registry.freeze();

        let records = Arc::new(StaticRecordSource::new());
        for (type_name, batch) in self.records {
            records.set(&type_name, batch);
        }

        Ok(LoadedManifest {
            record_types,
            registry,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "record_types": [
            {"name": "Article", "fields": [
                {"name": "id", "classification": "BigAutoField"},
                {"name": "title", "classification": "CharField"},
                {"name": "comments", "classification": "ManyToOneRel", "reverse_relation": true}
            ]}
        ],
        "indexes": [{"source": "article", "params": {"min_infix_len": "3", "bogus": "x"}}],
        "records": {"Article": [{"id": 1, "values": {"title": "<b>Alice</b>"}}]}
    }"#;

    #[test]
    fn test_load_manifest() {
        let loaded = Manifest::from_json_str(MANIFEST).unwrap().into_loaded().unwrap();
        assert!(loaded.registry.is_frozen());
        assert_eq!(loaded.records.count("article"), 1);

        let def = loaded.registry.get("article").unwrap();
        assert_eq!(
            def.create_table_sql(),
            "CREATE TABLE article(title text) min_infix_len = '3'"
        );
    }

    #[test]
    fn test_unknown_source_type() {
        let json = r#"{"record_types": [], "indexes": [{"source": "Ghost"}]}"#;
        let err = Manifest::from_json_str(json).unwrap().into_loaded().unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_malformed_manifest() {
        assert!(matches!(Manifest::from_json_str("{"), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.json")).unwrap_err();
        assert!(err.to_string().contains("Cannot read manifest"));
    }
}
