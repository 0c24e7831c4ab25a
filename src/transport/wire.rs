//! Request and response bodies of the engine's HTTP JSON API.
//!
//! # Requests
//!
//! ```text
//! POST /insert   {"index":"article","id":1,"doc":{"title":"Alice"}}
//! POST /delete   {"index":"article","id":1}
//! POST /bulk     {"insert":{"index":"article","id":1,"doc":{...}}}\n...
//! POST /search   {"index":"article","query":{"match":{"_all":{"query":"a b","operator":"and"}}}}
//!                {"index":"article","query":{"match_phrase":{"_all":"a b"}}}
//! ```
//!
//! # Unknown response keys
//!
//! Every response struct captures unrecognised keys in `extra`. With
//! `discard_unknown_keys` off, [`decode`] rejects a body carrying any;
//! with it on they are dropped silently.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::traits::SearchError;
use crate::record::FieldValue;

/// Virtual target covering every full-text field of a table.
pub const ALL_FIELDS: &str = "_all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertDocumentRequest {
    pub index: String,
    pub id: u64,
    pub doc: IndexMap<String, FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDocumentRequest {
    pub index: String,
    pub id: u64,
}

/// One line of a bulk body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Insert(InsertDocumentRequest),
    Replace(InsertDocumentRequest),
    Delete(DeleteDocumentRequest),
}

impl BulkOperation {
    /// Serialize operations as newline-delimited JSON.
    pub fn to_ndjson(operations: &[BulkOperation]) -> Result<String, SearchError> {
        let lines = operations
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SearchError::Query(format!("Cannot encode bulk body: {}", e)))?;
        Ok(lines.join("\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOp {
    pub query: String,
    pub operator: MatchOperator,
}

/// Full-text predicate of a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulltextFilter {
    /// Token match with AND/OR semantics
    Match(IndexMap<String, MatchOp>),
    /// Exact phrase
    MatchPhrase(IndexMap<String, String>),
}

impl FulltextFilter {
    pub fn keywords(query: impl Into<String>, operator: MatchOperator) -> Self {
        let mut target = IndexMap::new();
        target.insert(
            ALL_FIELDS.to_string(),
            MatchOp {
                query: query.into(),
                operator,
            },
        );
        FulltextFilter::Match(target)
    }

    pub fn phrase(query: impl Into<String>) -> Self {
        let mut target = IndexMap::new();
        target.insert(ALL_FIELDS.to_string(), query.into());
        FulltextFilter::MatchPhrase(target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<FulltextFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchRequest {
    /// Unfiltered listing of a table.
    pub fn listing(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: None,
            limit: None,
        }
    }

    pub fn filtered(index: impl Into<String>, filter: FulltextFilter) -> Self {
        Self {
            index: index.into(),
            query: Some(filter),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// Responses that carry a catch-all for unrecognised keys.
pub trait UnknownKeys {
    /// Dotted paths of every unrecognised key, nested ones included.
    fn unknown_keys(&self) -> Vec<String>;
}

fn extra_keys<'a>(prefix: &str, extra: &'a Map<String, Value>) -> impl Iterator<Item = String> + 'a {
    let prefix = prefix.to_string();
    extra.keys().map(move |k| format!("{}{}", prefix, k))
}

/// Parse a response body, applying the unknown-key policy.
pub fn decode<T>(body: Value, discard_unknown_keys: bool) -> Result<T, SearchError>
where
    T: DeserializeOwned + UnknownKeys,
{
    let parsed: T = serde_json::from_value(body)
        .map_err(|e| SearchError::Transport(format!("Malformed response: {}", e)))?;
    if !discard_unknown_keys {
        let unknown = parsed.unknown_keys();
        if !unknown.is_empty() {
            return Err(SearchError::Transport(format!(
                "Response carries unknown keys: {}",
                unknown.join(", ")
            )));
        }
    }
    Ok(parsed)
}

/// One result set of `/sql?mode=raw`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqlResultSet {
    #[serde(default)]
    pub columns: Vec<Value>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub warning: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whole `/sql` reply: an array of result sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SqlResponse(pub Vec<SqlResultSet>);

impl UnknownKeys for SqlResponse {
    fn unknown_keys(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|set| extra_keys("", &set.extra).collect::<Vec<_>>())
            .collect()
    }
}

/// Reply of `/insert`, `/replace` and `/delete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteResponse {
    #[serde(default, rename = "_index")]
    pub index: Option<String>,
    #[serde(default, rename = "_id", deserialize_with = "deserialize_opt_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub created: Option<bool>,
    #[serde(default)]
    pub found: Option<bool>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnknownKeys for WriteResponse {
    fn unknown_keys(&self) -> Vec<String> {
        extra_keys("", &self.extra).collect()
    }
}

/// Reply of `/bulk`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub current_line: Option<u64>,
    #[serde(default)]
    pub skipped_lines: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnknownKeys for BulkResponse {
    fn unknown_keys(&self) -> Vec<String> {
        extra_keys("", &self.extra).collect()
    }
}

/// Reply of `/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: Option<u64>,
    #[serde(default)]
    pub timed_out: Option<bool>,
    #[serde(default)]
    pub hits: HitsEnvelope,
    #[serde(default)]
    pub warning: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_relation: Option<String>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<RawHit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(default, rename = "_score")]
    pub score: Option<f64>,
    #[serde(default, rename = "_source")]
    pub source: IndexMap<String, FieldValue>,
    #[serde(default)]
    pub highlight: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnknownKeys for SearchResponse {
    fn unknown_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = extra_keys("", &self.extra).collect();
        keys.extend(extra_keys("hits.", &self.hits.extra));
        for hit in &self.hits.hits {
            keys.extend(extra_keys("hits.hits.", &hit.extra));
        }
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Document ids arrive as numbers or, from newer engines, as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(u64),
    Str(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Num(n) => Ok(n),
        IdRepr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_id(deserializer).map(Some)
}
