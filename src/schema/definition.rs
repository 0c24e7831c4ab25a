//! Index definitions
//!
//! An [`IndexDefinition`] describes one index table mirroring a record type.
//!
//! # Generated DDL
//!
//! ```text
//! CREATE TABLE article(title text, body text, views int) min_infix_len = '3' morphology = 'stem_en'
//! DROP TABLE IF EXISTS article
//! ```

use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use super::field_types::FieldTypeMap;
use crate::record::{RecordType, PRIMARY_KEY};
use crate::transport::SearchError;

/// Table parameters forwarded to `CREATE TABLE`. Anything else is dropped.
pub const ALLOWED_TABLE_PARAMS: &[&str] = &[
    "type",
    "engine",
    "morphology",
    "min_word_len",
    "min_prefix_len",
    "min_infix_len",
    "ngram_len",
    "ngram_chars",
    "charset_table",
    "blend_chars",
    "stopwords",
    "wordforms",
    "exceptions",
    "html_strip",
    "html_remove_elements",
    "index_exact_words",
    "expand_keywords",
    "rt_mem_limit",
];

/// One `(field, column type)` pair of the table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: String,
    pub column_type: &'static str,
}

impl std::fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.column_type)
    }
}

/// Index definition bound (weakly) to a record type.
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    table_name: String,
    source: Option<Weak<RecordType>>,
    allowed_fields: Option<Vec<String>>,
    table_params: IndexMap<String, String>,
}

impl IndexDefinition {
    /// Definition mirroring `record_type`; the table is named after the type.
    pub fn new(record_type: &Arc<RecordType>) -> Self {
        Self {
            table_name: record_type.name.to_lowercase(),
            source: Some(Arc::downgrade(record_type)),
            allowed_fields: None,
            table_params: IndexMap::new(),
        }
    }

    /// Definition with no source record type. It can be registered and
    /// queried, but migrations and sync hooks never touch it.
    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            table_name: name.into().to_lowercase(),
            source: None,
            allowed_fields: None,
            table_params: IndexMap::new(),
        }
    }

    /// Override the table name (lower-cased).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into().to_lowercase();
        self
    }

    /// Restrict indexing to these fields, in this order.
    pub fn allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add an extra table parameter. Unknown keys are kept here but never emitted.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.table_params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The mirrored record type, if set and still alive.
    #[must_use]
    pub fn source_type(&self) -> Option<Arc<RecordType>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    /// Whether the definition was declared with a source type at all.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Resolved list of indexed fields.
    ///
    /// Explicit `allowed_fields` win; otherwise every source field except the
    /// primary key and reverse relations. The primary key is never included.
    #[must_use]
    pub fn indexed_fields(&self) -> Vec<String> {
        match &self.allowed_fields {
            Some(fields) => fields
                .iter()
                .filter(|f| f.as_str() != PRIMARY_KEY)
                .cloned()
                .collect(),
            None => self
                .source_type()
                .map(|ty| {
                    ty.fields
                        .iter()
                        .filter(|f| f.name != PRIMARY_KEY && !f.reverse_relation)
                        .map(|f| f.name.clone())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Table schema: source fields in source order, restricted to the indexed set.
    #[must_use]
    pub fn column_spec(&self) -> Vec<ColumnSpec> {
        let Some(ty) = self.source_type() else {
            return Vec::new();
        };
        let indexed = self.indexed_fields();
        ty.fields
            .iter()
            .filter(|f| indexed.iter().any(|name| *name == f.name))
            .map(|f| ColumnSpec {
                field: f.name.clone(),
                column_type: FieldTypeMap::column_type(&f.classification),
            })
            .collect()
    }

    /// Allow-listed parameters rendered as `key = 'value'`.
    #[must_use]
    pub fn table_params(&self) -> Vec<String> {
        self.table_params
            .iter()
            .filter(|(key, _)| ALLOWED_TABLE_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| format!("{} = '{}'", key, value.replace('\'', "\\'")))
            .collect()
    }

    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.column_spec().iter().map(ToString::to_string).collect();
        let params = self.table_params();
        if params.is_empty() {
            format!("CREATE TABLE {}({})", self.table_name, columns.join(", "))
        } else {
            format!(
                "CREATE TABLE {}({}) {}",
                self.table_name,
                columns.join(", "),
                params.join(" ")
            )
        }
    }

    #[must_use]
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table_name)
    }

    /// Reject definitions that could not produce valid DDL.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !is_identifier(&self.table_name) {
            return Err(self.invalid(format!(
                "table name '{}' is not a valid identifier",
                self.table_name
            )));
        }
        if let (Some(fields), Some(ty)) = (&self.allowed_fields, self.source_type()) {
            if let Some(missing) = fields
                .iter()
                .find(|f| f.as_str() != PRIMARY_KEY && ty.get_field(f).is_none())
            {
                return Err(self.invalid(format!(
                    "allowed field '{}' is not a field of {}",
                    missing, ty.name
                )));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> SearchError {
        SearchError::InvalidDefinition {
            name: self.table_name.clone(),
            reason,
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
