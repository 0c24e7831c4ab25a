//! Typed gateway over a [`SearchTransport`].
//!
//! Builds engine statements from index definitions and sync documents,
//! parses replies under the unknown-key policy, and logs and counts every
//! failure before handing it back to the caller.
//!
//! # Statements
//!
//! | Operation | Engine call |
//! |-----------|-------------|
//! | `show_tables` | `SHOW TABLES` |
//! | `create_table` | `CREATE TABLE t(col type, ...) key = 'value' ...` |
//! | `drop_table` | `DROP TABLE IF EXISTS t` |
//! | `exists` | `SELECT * FROM t WHERE id=N` |
//! | `bulk_insert` | one `/bulk` call, one `insert` line per document |

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::metrics::{self, LatencyTimer};
use crate::schema::IndexDefinition;
use crate::sync::SyncDocument;
use crate::transport::wire::decode;
use crate::transport::{
    BulkOperation, BulkResponse, DeleteDocumentRequest, SearchError, SearchRequest,
    SearchResponse, SearchTransport, SqlResponse, WriteResponse,
};

/// Result of a document delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the document existed
    pub found: bool,
}

/// Schema and document operations against one engine.
#[derive(Clone)]
pub struct IndexGateway {
    transport: Arc<dyn SearchTransport>,
    discard_unknown_keys: bool,
}

impl std::fmt::Debug for IndexGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexGateway")
            .field("discard_unknown_keys", &self.discard_unknown_keys)
            .finish_non_exhaustive()
    }
}

impl IndexGateway {
    /// Gateway with strict response parsing.
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport,
            discard_unknown_keys: false,
        }
    }

    pub fn from_config(transport: Arc<dyn SearchTransport>, config: &SearchConfig) -> Self {
        Self::new(transport).discard_unknown_keys(config.discard_unknown_keys)
    }

    #[must_use]
    pub fn discard_unknown_keys(mut self, discard: bool) -> Self {
        self.discard_unknown_keys = discard;
        self
    }

    pub fn transport(&self) -> &Arc<dyn SearchTransport> {
        &self.transport
    }

    async fn observe<T, F>(&self, operation: &'static str, target: &str, call: F) -> Result<T, SearchError>
    where
        F: Future<Output = Result<T, SearchError>>,
    {
        let _timer = LatencyTimer::new(operation);
        match call.await {
            Ok(value) => {
                metrics::record_operation(operation, "success");
                Ok(value)
            }
            Err(e) => {
                metrics::record_operation(operation, "error");
                metrics::record_error(operation, e.label());
                warn!(operation, target, kind = %e.kind(), error = %e, "Search engine call failed");
                Err(e)
            }
        }
    }

    async fn sql(&self, query: &str) -> Result<SqlResponse, SearchError> {
        debug!(sql = query, "Executing statement");
        let body = self.transport.sql(query).await?;
        decode(body, self.discard_unknown_keys)
    }

    /// Names of all existing tables.
    pub async fn show_tables(&self) -> Result<Vec<String>, SearchError> {
        self.observe("show_tables", "*", async {
            let response = self.sql("SHOW TABLES").await?;
            Ok(response
                .0
                .iter()
                .flat_map(|set| set.data.iter())
                .filter_map(|row| row.get("Index").or_else(|| row.get("Table")))
                .filter_map(|name| name.as_str().map(str::to_string))
                .collect())
        })
        .await
    }

    pub async fn create_table(&self, definition: &IndexDefinition) -> Result<(), SearchError> {
        self.observe("create_table", definition.table_name(), async {
            self.sql(&definition.create_table_sql()).await?;
            Ok(())
        })
        .await
    }

    /// Drop a table; succeeds when it does not exist.
    pub async fn drop_table(&self, definition: &IndexDefinition) -> Result<(), SearchError> {
        self.observe("drop_table", definition.table_name(), async {
            self.sql(&definition.drop_table_sql()).await?;
            Ok(())
        })
        .await
    }

    /// Insert a new document; the engine rejects an existing id.
    pub async fn insert(&self, table: &str, document: &SyncDocument) -> Result<WriteResponse, SearchError> {
        self.observe("insert", table, async {
            let body = self.transport.insert(&document.to_request(table)).await?;
            decode(body, self.discard_unknown_keys)
        })
        .await
    }

    /// Insert or fully overwrite a document.
    pub async fn replace(&self, table: &str, document: &SyncDocument) -> Result<WriteResponse, SearchError> {
        self.observe("replace", table, async {
            let body = self.transport.replace(&document.to_request(table)).await?;
            decode(body, self.discard_unknown_keys)
        })
        .await
    }

    /// Delete a document. An absent id is not an error.
    pub async fn delete(&self, table: &str, id: u64) -> Result<DeleteOutcome, SearchError> {
        self.observe("delete", table, async {
            let request = DeleteDocumentRequest {
                index: table.to_string(),
                id,
            };
            let body = self.transport.delete(&request).await?;
            let response: WriteResponse = decode(body, self.discard_unknown_keys)?;
            Ok(DeleteOutcome {
                found: response.found.unwrap_or(false),
            })
        })
        .await
    }

    /// Insert many documents in one bulk call. Returns how many were sent;
    /// an empty batch makes no call.
    pub async fn bulk_insert(&self, table: &str, documents: Vec<SyncDocument>) -> Result<usize, SearchError> {
        if documents.is_empty() {
            return Ok(0);
        }
        let count = documents.len();
        self.observe("bulk_insert", table, async {
            let operations: Vec<BulkOperation> = documents
                .into_iter()
                .map(|doc| doc.into_bulk_insert(table))
                .collect();
            let body = self.transport.bulk(&BulkOperation::to_ndjson(&operations)?).await?;
            let response: BulkResponse = decode(body, self.discard_unknown_keys)?;
            if response.errors {
                return Err(SearchError::Schema(format!(
                    "bulk insert into '{}' failed at line {}: {}",
                    table,
                    response.current_line.unwrap_or_default(),
                    response.error.unwrap_or_default()
                )));
            }
            metrics::record_bulk_documents(table, count);
            Ok(count)
        })
        .await
    }

    /// Whether a document with this id is indexed.
    pub async fn exists(&self, table: &str, id: u64) -> Result<bool, SearchError> {
        self.observe("exists", table, async {
            let response = self.sql(&format!("SELECT * FROM {} WHERE id={}", table, id)).await?;
            Ok(response.0.iter().any(|set| set.total > 0))
        })
        .await
    }

    /// Execute arbitrary SQL and return the raw result sets.
    pub async fn raw_query(&self, sql: &str) -> Result<SqlResponse, SearchError> {
        self.observe("raw_query", "*", self.sql(sql)).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        self.observe("search", &request.index, async {
            let body = self.transport.search(request).await?;
            decode(body, self.discard_unknown_keys)
        })
        .await
    }
}
