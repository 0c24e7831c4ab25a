use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::wire::{DeleteDocumentRequest, InsertDocumentRequest, SearchRequest};

/// Coarse classification of a [`SearchError`], for callers that retry or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Engine unreachable or response malformed
    Transport,
    /// DDL rejected (invalid column type, duplicate table, missing table)
    Schema,
    /// Malformed search or filter
    Query,
    /// Missing or invalid settings
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Transport => write!(f, "TransportError"),
            ErrorKind::Schema => write!(f, "SchemaError"),
            ErrorKind::Query => write!(f, "QueryError"),
            ErrorKind::Config => write!(f, "ConfigError"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid index definition '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },
    #[error("Migration of '{table}' failed during {step}: {source}")]
    Migration {
        table: String,
        step: MigrationStep,
        #[source]
        source: Box<SearchError>,
    },
}

impl SearchError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Transport(_) => ErrorKind::Transport,
            SearchError::Schema(_) => ErrorKind::Schema,
            SearchError::Query(_) => ErrorKind::Query,
            SearchError::Config(_) | SearchError::InvalidDefinition { .. } => ErrorKind::Config,
            SearchError::Migration { source, .. } => source.kind(),
        }
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Transport => "transport",
            ErrorKind::Schema => "schema",
            ErrorKind::Query => "query",
            ErrorKind::Config => "config",
        }
    }
}

/// Rebuild phase in which a migration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStep {
    Drop,
    Create,
    Backfill,
}

impl std::fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationStep::Drop => write!(f, "drop"),
            MigrationStep::Create => write!(f, "create"),
            MigrationStep::Backfill => write!(f, "backfill"),
        }
    }
}

/// Raw request/response surface of the search engine.
///
/// Implementations return the engine's JSON body untouched; interpreting it
/// (and applying the unknown-key policy) is the gateway's job. A non-success
/// reply must come back as `Err`, never as an error-shaped `Ok` body.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Execute a SQL statement (`/sql?mode=raw`). Returns the array of result sets.
    async fn sql(&self, query: &str) -> Result<Value, SearchError>;
    async fn insert(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError>;
    async fn replace(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError>;
    async fn delete(&self, request: &DeleteDocumentRequest) -> Result<Value, SearchError>;
    /// Newline-delimited JSON body, one operation per line.
    async fn bulk(&self, ndjson: &str) -> Result<Value, SearchError>;
    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError>;
}
