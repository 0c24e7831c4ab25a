//! In-process search engine.
//!
//! Speaks the same JSON as the HTTP engine for the subset this crate uses:
//! `SHOW TABLES`, `CREATE TABLE`, `DROP TABLE [IF EXISTS]`,
//! `SELECT * FROM t [WHERE id=N]`, document insert/replace/delete, NDJSON
//! bulk and `match`/`match_phrase` search over `_all`. Every call is logged
//! so tests can assert on exactly what reached the engine.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Value};

use super::traits::{SearchError, SearchTransport};
use super::wire::{
    BulkOperation, DeleteDocumentRequest, FulltextFilter, InsertDocumentRequest, MatchOperator,
    SearchRequest, ALL_FIELDS,
};
use crate::record::FieldValue;

/// Page size applied to searches that carry no explicit limit.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

const COLUMN_TYPES: &[&str] = &[
    "text", "string", "int", "integer", "bigint", "float", "bool", "timestamp", "json", "multi",
    "multi64",
];

static CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*CREATE\s+TABLE\s+([A-Za-z_][A-Za-z0-9_]*)\s*\((.*?)\)\s*(.*)$")
        .expect("Invalid CREATE TABLE regex")
});
static DROP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*DROP\s+TABLE\s+(IF\s+EXISTS\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*;?\s*$")
        .expect("Invalid DROP TABLE regex")
});
static SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*SELECT\s+\*\s+FROM\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s+WHERE\s+id\s*=\s*(\d+))?\s*;?\s*$")
        .expect("Invalid SELECT regex")
});
static SHOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*SHOW\s+TABLES\s*;?\s*$").expect("Invalid SHOW regex"));

/// Operation kinds, for failure injection and call filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    Sql,
    Insert,
    Replace,
    Delete,
    Bulk,
    Search,
}

/// One request as received.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Sql(String),
    Insert(InsertDocumentRequest),
    Replace(InsertDocumentRequest),
    Delete(DeleteDocumentRequest),
    Bulk(String),
    Search(SearchRequest),
}

impl TransportCall {
    #[must_use]
    pub fn op(&self) -> TransportOp {
        match self {
            TransportCall::Sql(_) => TransportOp::Sql,
            TransportCall::Insert(_) => TransportOp::Insert,
            TransportCall::Replace(_) => TransportOp::Replace,
            TransportCall::Delete(_) => TransportOp::Delete,
            TransportCall::Bulk(_) => TransportOp::Bulk,
            TransportCall::Search(_) => TransportOp::Search,
        }
    }

    /// The SQL text, for `Sql` calls.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            TransportCall::Sql(q) => Some(q),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct MemTable {
    columns: Vec<(String, String)>,
    docs: BTreeMap<u64, IndexMap<String, FieldValue>>,
}

impl MemTable {
    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(c, _)| c == name)
    }

    fn fulltext_fields(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|(_, ty)| ty == "text")
            .map(|(c, _)| c.as_str())
    }
}

/// Tables, documents and a request log, all in memory.
pub struct MemoryTransport {
    tables: DashMap<String, MemTable>,
    calls: Mutex<Vec<TransportCall>>,
    failing: Mutex<HashSet<TransportOp>>,
    extra_response_keys: Mutex<Option<Value>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            extra_response_keys: Mutex::new(None),
        }
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    /// Calls of one kind.
    #[must_use]
    pub fn calls_of(&self, op: TransportOp) -> Vec<TransportCall> {
        self.calls.lock().iter().filter(|c| c.op() == op).cloned().collect()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Make every subsequent call of `op` fail with a transport error.
    pub fn fail_on(&self, op: TransportOp) {
        self.failing.lock().insert(op);
    }

    /// Stop failing calls of `op`.
    pub fn recover(&self, op: TransportOp) {
        self.failing.lock().remove(&op);
    }

    /// Merge these keys into every search response (for unknown-key tests).
    pub fn inject_response_keys(&self, keys: Value) {
        *self.extra_response_keys.lock() = Some(keys);
    }

    #[must_use]
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Column spec of a table as `(name, type)` pairs.
    #[must_use]
    pub fn columns(&self, table: &str) -> Option<Vec<(String, String)>> {
        self.tables.get(table).map(|t| t.columns.clone())
    }

    /// Stored document, if any.
    #[must_use]
    pub fn document(&self, table: &str, id: u64) -> Option<IndexMap<String, FieldValue>> {
        self.tables.get(table).and_then(|t| t.docs.get(&id).cloned())
    }

    #[must_use]
    pub fn document_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, |t| t.docs.len())
    }

    fn record(&self, call: TransportCall) -> Result<(), SearchError> {
        let op = call.op();
        self.calls.lock().push(call);
        if self.failing.lock().contains(&op) {
            return Err(SearchError::Transport(format!(
                "{:?} failed: connection refused",
                op
            )));
        }
        Ok(())
    }

    fn execute_sql(&self, query: &str) -> Result<Value, SearchError> {
        if SHOW_RE.is_match(query) {
            let mut names: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
            names.sort();
            let data: Vec<Value> = names
                .iter()
                .map(|name| json!({"Table": name, "Type": "rt"}))
                .collect();
            return Ok(json!([{
                "columns": [{"Table": {"type": "string"}}, {"Type": {"type": "string"}}],
                "data": data,
                "total": names.len(),
                "error": "",
                "warning": ""
            }]));
        }

        if let Some(caps) = CREATE_RE.captures(query) {
            let name = caps[1].to_string();
            let columns = parse_columns(&caps[2])?;
            if self.tables.contains_key(&name) {
                return Err(SearchError::Schema(format!("table '{}': table already exists", name)));
            }
            self.tables.insert(
                name,
                MemTable {
                    columns,
                    docs: BTreeMap::new(),
                },
            );
            return Ok(empty_result());
        }

        if let Some(caps) = DROP_RE.captures(query) {
            let if_exists = caps.get(1).is_some();
            let name = &caps[2];
            if self.tables.remove(name).is_none() && !if_exists {
                return Err(SearchError::Schema(format!("table '{}' does not exist", name)));
            }
            return Ok(empty_result());
        }

        if let Some(caps) = SELECT_RE.captures(query) {
            let name = &caps[1];
            let table = self
                .tables
                .get(name)
                .ok_or_else(|| SearchError::Query(format!("unknown local table '{}'", name)))?;
            let rows: Vec<Value> = match caps.get(2) {
                Some(id) => {
                    let id: u64 = id
                        .as_str()
                        .parse()
                        .map_err(|e| SearchError::Query(format!("bad id: {}", e)))?;
                    table.docs.get(&id).map(|doc| row(id, doc)).into_iter().collect()
                }
                None => table.docs.iter().map(|(id, doc)| row(*id, doc)).collect(),
            };
            return Ok(json!([{
                "columns": [{"id": {"type": "long long"}}],
                "data": rows,
                "total": rows.len(),
                "error": "",
                "warning": ""
            }]));
        }

        Err(SearchError::Query(format!("unsupported statement: {}", query)))
    }

    fn write(&self, request: &InsertDocumentRequest, overwrite: bool) -> Result<Value, SearchError> {
        let mut table = self
            .tables
            .get_mut(&request.index)
            .ok_or_else(|| SearchError::Query(format!("table '{}' absent", request.index)))?;
        if let Some(field) = request.doc.keys().find(|f| !table.has_column(f)) {
            return Err(SearchError::Query(format!(
                "table '{}': unknown column '{}'",
                request.index, field
            )));
        }
        let existed = table.docs.contains_key(&request.id);
        if existed && !overwrite {
            return Err(SearchError::Query(format!(
                "table '{}': duplicate id '{}'",
                request.index, request.id
            )));
        }
        table.docs.insert(request.id, request.doc.clone());
        let result = if existed { "updated" } else { "created" };
        Ok(json!({
            "_index": request.index,
            "_id": request.id,
            "created": !existed,
            "result": result,
            "status": if existed { 200 } else { 201 }
        }))
    }

    fn remove(&self, request: &DeleteDocumentRequest) -> Result<Value, SearchError> {
        let mut table = self
            .tables
            .get_mut(&request.index)
            .ok_or_else(|| SearchError::Query(format!("table '{}' absent", request.index)))?;
        let found = table.docs.remove(&request.id).is_some();
        Ok(json!({
            "_index": request.index,
            "_id": request.id,
            "found": found,
            "result": if found { "deleted" } else { "not found" }
        }))
    }

    fn run_search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let table = self
            .tables
            .get(&request.index)
            .ok_or_else(|| SearchError::Query(format!("unknown local table '{}'", request.index)))?;

        let matcher: Box<dyn Fn(&IndexMap<String, FieldValue>) -> bool> = match &request.query {
            None => Box::new(|_| true),
            Some(FulltextFilter::Match(targets)) => {
                let op = targets
                    .get(ALL_FIELDS)
                    .ok_or_else(|| SearchError::Query("match supports only _all".into()))?;
                let wanted = tokenize(&op.query);
                let operator = op.operator;
                let fields: Vec<String> = table.fulltext_fields().map(String::from).collect();
                Box::new(move |doc| {
                    if wanted.is_empty() {
                        return true;
                    }
                    let have: HashSet<String> = fields
                        .iter()
                        .filter_map(|f| doc.get(f).and_then(FieldValue::as_str))
                        .flat_map(tokenize)
                        .collect();
                    match operator {
                        MatchOperator::And => wanted.iter().all(|t| have.contains(t)),
                        MatchOperator::Or => wanted.iter().any(|t| have.contains(t)),
                    }
                })
            }
            Some(FulltextFilter::MatchPhrase(targets)) => {
                let phrase = targets
                    .get(ALL_FIELDS)
                    .ok_or_else(|| SearchError::Query("match_phrase supports only _all".into()))?;
                let wanted = tokenize(phrase);
                let fields: Vec<String> = table.fulltext_fields().map(String::from).collect();
                Box::new(move |doc| {
                    fields
                        .iter()
                        .filter_map(|f| doc.get(f).and_then(FieldValue::as_str))
                        .any(|text| contains_sequence(&tokenize(text), &wanted))
                })
            }
        };

        let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT) as usize;
        let matched: Vec<(&u64, &IndexMap<String, FieldValue>)> =
            table.docs.iter().filter(|(_, doc)| matcher(doc)).collect();
        let hits: Vec<Value> = matched
            .iter()
            .take(limit)
            .map(|(id, doc)| json!({"_id": id, "_score": 1, "_source": doc}))
            .collect();

        let mut body = json!({
            "took": 0,
            "timed_out": false,
            "hits": {
                "total": matched.len(),
                "total_relation": "eq",
                "hits": hits
            }
        });
        if let Some(Value::Object(extra)) = self.extra_response_keys.lock().clone() {
            if let Some(obj) = body.as_object_mut() {
                obj.extend(extra);
            }
        }
        Ok(body)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchTransport for MemoryTransport {
    async fn sql(&self, query: &str) -> Result<Value, SearchError> {
        self.record(TransportCall::Sql(query.to_string()))?;
        self.execute_sql(query)
    }

    async fn insert(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError> {
        self.record(TransportCall::Insert(request.clone()))?;
        self.write(request, false)
    }

    async fn replace(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError> {
        self.record(TransportCall::Replace(request.clone()))?;
        self.write(request, true)
    }

    async fn delete(&self, request: &DeleteDocumentRequest) -> Result<Value, SearchError> {
        self.record(TransportCall::Delete(request.clone()))?;
        self.remove(request)
    }

    async fn bulk(&self, ndjson: &str) -> Result<Value, SearchError> {
        self.record(TransportCall::Bulk(ndjson.to_string()))?;

        let mut items = Vec::new();
        for (line_no, line) in ndjson.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            let outcome = serde_json::from_str::<BulkOperation>(line)
                .map_err(|e| SearchError::Query(format!("line {}: {}", line_no + 1, e)))
                .and_then(|op| match op {
                    BulkOperation::Insert(req) => self.write(&req, false).map(|r| json!({"insert": r})),
                    BulkOperation::Replace(req) => self.write(&req, true).map(|r| json!({"replace": r})),
                    BulkOperation::Delete(req) => self.remove(&req).map(|r| json!({"delete": r})),
                });
            match outcome {
                Ok(item) => items.push(item),
                Err(e) => {
                    return Ok(json!({
                        "items": items,
                        "current_line": line_no + 1,
                        "skipped_lines": 0,
                        "errors": true,
                        "error": e.to_string()
                    }));
                }
            }
        }
        Ok(json!({
            "items": items,
            "current_line": items.len(),
            "skipped_lines": 0,
            "errors": false,
            "error": ""
        }))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        self.record(TransportCall::Search(request.clone()))?;
        self.run_search(request)
    }
}

fn empty_result() -> Value {
    json!([{"total": 0, "error": "", "warning": ""}])
}

fn row(id: u64, doc: &IndexMap<String, FieldValue>) -> Value {
    let mut row = serde_json::Map::new();
    row.insert("id".to_string(), json!(id));
    for (k, v) in doc {
        row.insert(k.clone(), json!(v));
    }
    Value::Object(row)
}

fn parse_columns(spec: &str) -> Result<Vec<(String, String)>, SearchError> {
    spec.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|column| {
            let mut parts = column.split_whitespace();
            let (Some(name), Some(ty)) = (parts.next(), parts.next()) else {
                return Err(SearchError::Schema(format!("bad column definition '{}'", column)));
            };
            let ty = ty.to_lowercase();
            if !COLUMN_TYPES.contains(&ty.as_str()) {
                return Err(SearchError::Schema(format!("unknown column type '{}'", ty)));
            }
            Ok((name.to_string(), ty))
        })
        .collect()
}

/// Lower-cased alphanumeric tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}
