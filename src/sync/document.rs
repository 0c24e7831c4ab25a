//! Record → index document projection.

use std::borrow::Cow;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::record::{FieldValue, Record, PRIMARY_KEY};
use crate::schema::IndexDefinition;
use crate::transport::{BulkOperation, InsertDocumentRequest};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("Invalid markup tag regex"));

/// Remove markup tags from text. Entities are left as they are.
///
/// A tag runs from a `<` to the next `>`, so `<<b>script>` loses `<<b>`
/// and no tag survives a single pass.
pub fn strip_tags(text: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(text, "")
}

/// The indexed form of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDocument {
    pub id: u64,
    pub fields: IndexMap<String, FieldValue>,
}

impl SyncDocument {
    /// Project a record onto a definition's indexed fields.
    ///
    /// Fields come out in the definition's order with markup stripped from
    /// text values. Fields the record does not carry are omitted; `id` is
    /// never a document field.
    pub fn project(definition: &IndexDefinition, record: &Record) -> Self {
        let fields = definition
            .indexed_fields()
            .into_iter()
            .filter(|name| name != PRIMARY_KEY)
            .filter_map(|name| {
                let value = match record.get(&name)? {
                    FieldValue::Text(text) => FieldValue::Text(strip_tags(text).into_owned()),
                    other => other.clone(),
                };
                Some((name, value))
            })
            .collect();
        Self {
            id: record.id,
            fields,
        }
    }

    pub fn to_request(&self, table: &str) -> InsertDocumentRequest {
        InsertDocumentRequest {
            index: table.to_string(),
            id: self.id,
            doc: self.fields.clone(),
        }
    }

    pub fn into_bulk_insert(self, table: &str) -> BulkOperation {
        BulkOperation::Insert(InsertDocumentRequest {
            index: table.to_string(),
            id: self.id,
            doc: self.fields,
        })
    }
}
