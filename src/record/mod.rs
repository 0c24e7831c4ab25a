// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Record-store side of the sync: record types, their field metadata, and
//! live records.
//!
//! The host application owns the real record store. This module only carries
//! what the sync needs from it: per type, the ordered field list with each
//! field's classification and reverse-relation marker; per record, its id and
//! field values by name.

mod source;

pub use source::{RecordSource, StaticRecordSource};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Name of the primary identifier field. Never indexed as a document field.
pub const PRIMARY_KEY: &str = "id";

/// A field value with a declared kind.
///
/// Scalars map to their own variants; objects and arrays (`json` columns)
/// land in `Json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
}

impl FieldValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Float(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

/// Field metadata of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    /// Field class as reported by the record store (e.g. `CharField`).
    pub classification: String,
    /// Reverse side of a relation; excluded from default field sets.
    #[serde(default)]
    pub reverse_relation: bool,
}

impl FieldMeta {
    pub fn new(name: impl Into<String>, classification: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classification: classification.into(),
            reverse_relation: false,
        }
    }

    pub fn reverse(name: impl Into<String>, classification: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classification: classification.into(),
            reverse_relation: true,
        }
    }
}

/// A record type of the relational store (a table / model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldMeta>,
}

impl RecordType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field (builder style).
    pub fn field(mut self, name: impl Into<String>, classification: impl Into<String>) -> Self {
        self.fields.push(FieldMeta::new(name, classification));
        self
    }

    /// Add a reverse-relation field (builder style).
    pub fn reverse_field(mut self, name: impl Into<String>, classification: impl Into<String>) -> Self {
        self.fields.push(FieldMeta::reverse(name, classification));
        self
    }

    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Case-insensitive name comparison, as used for migration matching.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// One live record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(default)]
    pub values: IndexMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            values: IndexMap::new(),
        }
    }

    /// Set a field value (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Value of a field; `None` when the record does not carry it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_builder() {
        let ty = RecordType::new("Article")
            .field("id", "BigAutoField")
            .field("title", "CharField")
            .reverse_field("comments", "ManyToOneRel");

        assert_eq!(ty.fields.len(), 3);
        assert!(ty.get_field("comments").unwrap().reverse_relation);
        assert!(!ty.get_field("title").unwrap().reverse_relation);
        assert!(ty.is_named("article"));
        assert!(ty.is_named("ARTICLE"));
    }

    #[test]
    fn test_field_value_untagged_json() {
        let record = Record::new(7)
            .with("title", "Hello")
            .with("views", 3i64)
            .with("rating", 4.5)
            .with("published", true);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["values"]["title"], "Hello");
        assert_eq!(json["values"]["views"], 3);
        assert_eq!(json["values"]["published"], true);

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_json_values_round_trip() {
        let record = Record::new(9)
            .with("meta", serde_json::json!({"k": 1, "tags": ["a", "b"]}))
            .with("scores", serde_json::json!([1, 2]));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["values"]["meta"]["tags"][1], "b");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(
            back.get("meta"),
            Some(&FieldValue::Json(serde_json::json!({"k": 1, "tags": ["a", "b"]})))
        );
        // Scalars keep their own variants
        let scalar: FieldValue = serde_json::from_value(serde_json::json!(3)).unwrap();
        assert_eq!(scalar, FieldValue::Int(3));
    }

    #[test]
    fn test_field_value_order_preserved() {
        let record = Record::new(1).with("b", "2").with("a", "1");
        let keys: Vec<_> = record.values.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("x").to_string(), "x");
        assert_eq!(FieldValue::Int(5).to_string(), "5");
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::Json(serde_json::json!({"k": 1})).to_string(), r#"{"k":1}"#);
    }
}
