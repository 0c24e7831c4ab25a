// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Save/delete hooks.
//!
//! # Write strategies
//!
//! | Strategy | Calls on save | Notes |
//! |----------|---------------|-------|
//! | `CheckThenWrite` | `exists`, then `insert` or `replace` | two saves of a new record can race; the loser's insert fails |
//! | `Upsert` | `replace` | atomic on the engine side |

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::document::SyncDocument;
use crate::gateway::IndexGateway;
use crate::metrics;
use crate::record::Record;
use crate::schema::{IndexDefinition, Registry};
use crate::transport::SearchError;

/// How `on_save` writes a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    #[default]
    CheckThenWrite,
    Upsert,
}

impl FromStr for SyncStrategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "check_then_write" => Ok(SyncStrategy::CheckThenWrite),
            "upsert" => Ok(SyncStrategy::Upsert),
            other => Err(SearchError::Config(format!(
                "unknown sync strategy '{}' (expected check_then_write or upsert)",
                other
            ))),
        }
    }
}

/// What a hook did to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Inserted,
    Replaced,
    Deleted { found: bool },
}

impl SyncOutcome {
    fn label(self) -> &'static str {
        match self {
            SyncOutcome::Inserted => "inserted",
            SyncOutcome::Replaced => "replaced",
            SyncOutcome::Deleted { found: true } => "deleted",
            SyncOutcome::Deleted { found: false } => "missing",
        }
    }
}

/// A committed change in the record store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Saved { record_type: String, record: Record },
    Deleted { record_type: String, record: Record },
}

impl RecordEvent {
    pub fn saved(record_type: impl Into<String>, record: Record) -> Self {
        RecordEvent::Saved {
            record_type: record_type.into(),
            record,
        }
    }

    pub fn deleted(record_type: impl Into<String>, record: Record) -> Self {
        RecordEvent::Deleted {
            record_type: record_type.into(),
            record,
        }
    }

    #[must_use]
    pub fn record_type(&self) -> &str {
        match self {
            RecordEvent::Saved { record_type, .. } | RecordEvent::Deleted { record_type, .. } => record_type,
        }
    }
}

/// Mirrors record saves and deletes into every index bound to the record's type.
#[derive(Debug, Clone)]
pub struct SyncHooks {
    registry: Arc<Registry>,
    gateway: Arc<IndexGateway>,
    strategy: SyncStrategy,
}

impl SyncHooks {
    pub fn new(registry: Arc<Registry>, gateway: Arc<IndexGateway>) -> Self {
        Self {
            registry,
            gateway,
            strategy: SyncStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    /// Write the record's document: one write call, insert or replace.
    pub async fn on_save(&self, definition: &IndexDefinition, record: &Record) -> Result<SyncOutcome, SearchError> {
        let table = definition.table_name();
        let document = SyncDocument::project(definition, record);

        let result = match self.strategy {
            SyncStrategy::Upsert => self
                .gateway
                .replace(table, &document)
                .await
                .map(|_| SyncOutcome::Replaced),
            SyncStrategy::CheckThenWrite => match self.gateway.exists(table, record.id).await {
                Ok(true) => self
                    .gateway
                    .replace(table, &document)
                    .await
                    .map(|_| SyncOutcome::Replaced),
                Ok(false) => self
                    .gateway
                    .insert(table, &document)
                    .await
                    .map(|_| SyncOutcome::Inserted),
                Err(e) => Err(e),
            },
        };
        self.finish("save", table, record.id, result)
    }

    /// Remove the record's document. A document already gone is not an error.
    pub async fn on_delete(&self, definition: &IndexDefinition, record: &Record) -> Result<SyncOutcome, SearchError> {
        let table = definition.table_name();
        let result = self
            .gateway
            .delete(table, record.id)
            .await
            .map(|outcome| SyncOutcome::Deleted { found: outcome.found });
        self.finish("delete", table, record.id, result)
    }

    /// Dispatch an event to every definition registered for its record type,
    /// in registration order. Stops at the first failure.
    ///
    /// Returns `(table, outcome)` per definition; empty when no index mirrors the type.
    pub async fn handle(&self, event: &RecordEvent) -> Result<Vec<(String, SyncOutcome)>, SearchError> {
        let definitions = self.registry.for_source(event.record_type());
        if definitions.is_empty() {
            debug!(record_type = event.record_type(), "No index bound to record type");
            return Ok(Vec::new());
        }

        let mut outcomes = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let outcome = match event {
                RecordEvent::Saved { record, .. } => self.on_save(&definition, record).await?,
                RecordEvent::Deleted { record, .. } => self.on_delete(&definition, record).await?,
            };
            outcomes.push((definition.table_name().to_string(), outcome));
        }
        Ok(outcomes)
    }

    fn finish(
        &self,
        event: &str,
        table: &str,
        id: u64,
        result: Result<SyncOutcome, SearchError>,
    ) -> Result<SyncOutcome, SearchError> {
        match &result {
            Ok(outcome) => {
                metrics::record_sync(event, outcome.label());
                debug!(table, id, outcome = outcome.label(), "Record synced");
            }
            Err(e) => {
                metrics::record_sync(event, "error");
                warn!(table, id, error = %e, "Record sync failed");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RecordType};
    use crate::transport::{MemoryTransport, TransportCall, TransportOp};

    struct Fixture {
        transport: Arc<MemoryTransport>,
        hooks: SyncHooks,
        def: Arc<IndexDefinition>,
        _ty: Arc<RecordType>,
    }

    async fn fixture(strategy: SyncStrategy) -> Fixture {
        let ty = Arc::new(RecordType::new("Article").field("title", "CharField"));
        let registry = Arc::new(Registry::new());
        registry.register([IndexDefinition::new(&ty)]).unwrap();
        registry.freeze();

        let transport = Arc::new(MemoryTransport::new());
        let gateway = Arc::new(IndexGateway::new(transport.clone()));
        let def = registry.get("article").unwrap();
        gateway.create_table(&def).await.unwrap();
        transport.clear_calls();

        Fixture {
            transport,
            hooks: SyncHooks::new(registry, gateway).with_strategy(strategy),
            def,
            _ty: ty,
        }
    }

    fn writes(transport: &MemoryTransport) -> Vec<TransportOp> {
        transport
            .calls()
            .iter()
            .map(TransportCall::op)
            .filter(|op| matches!(op, TransportOp::Insert | TransportOp::Replace))
            .collect()
    }

    #[tokio::test]
    async fn test_save_inserts_when_absent() {
        let f = fixture(SyncStrategy::CheckThenWrite).await;
        let outcome = f.hooks.on_save(&f.def, &Record::new(1).with("title", "<b>Hi</b>")).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Inserted);
        assert_eq!(writes(&f.transport), vec![TransportOp::Insert]);
        assert_eq!(f.transport.document("article", 1).unwrap()["title"], FieldValue::from("Hi"));
    }

    #[tokio::test]
    async fn test_save_replaces_when_present() {
        let f = fixture(SyncStrategy::CheckThenWrite).await;
        f.hooks.on_save(&f.def, &Record::new(1).with("title", "a")).await.unwrap();
        f.transport.clear_calls();

        let outcome = f.hooks.on_save(&f.def, &Record::new(1).with("title", "b")).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Replaced);
        assert_eq!(writes(&f.transport), vec![TransportOp::Replace]);
        assert_eq!(f.transport.calls_of(TransportOp::Sql).len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_skips_existence_check() {
        let f = fixture(SyncStrategy::Upsert).await;
        let outcome = f.hooks.on_save(&f.def, &Record::new(5).with("title", "x")).await.unwrap();

        assert_eq!(outcome, SyncOutcome::Replaced);
        assert!(f.transport.calls_of(TransportOp::Sql).is_empty());
        assert_eq!(f.transport.document_count("article"), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_not_an_error() {
        let f = fixture(SyncStrategy::CheckThenWrite).await;
        let outcome = f.hooks.on_delete(&f.def, &Record::new(99)).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Deleted { found: false });
    }

    #[tokio::test]
    async fn test_handle_dispatches_by_type() {
        let f = fixture(SyncStrategy::CheckThenWrite).await;
        let saved = f
            .hooks
            .handle(&RecordEvent::saved("article", Record::new(3).with("title", "t")))
            .await
            .unwrap();
        assert_eq!(saved, vec![("article".to_string(), SyncOutcome::Inserted)]);

        let deleted = f.hooks.handle(&RecordEvent::deleted("Article", Record::new(3))).await.unwrap();
        assert_eq!(deleted, vec![("article".to_string(), SyncOutcome::Deleted { found: true })]);

        f.transport.clear_calls();
        let ignored = f.hooks.handle(&RecordEvent::saved("Comment", Record::new(1))).await.unwrap();
        assert!(ignored.is_empty());
        assert_eq!(f.transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_existence_failure_skips_write() {
        let f = fixture(SyncStrategy::CheckThenWrite).await;
        f.transport.fail_on(TransportOp::Sql);
        let err = f.hooks.on_save(&f.def, &Record::new(1).with("title", "a")).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
        assert!(writes(&f.transport).is_empty());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("upsert".parse::<SyncStrategy>().unwrap(), SyncStrategy::Upsert);
        assert_eq!("Check-Then-Write".parse::<SyncStrategy>().unwrap(), SyncStrategy::CheckThenWrite);
        assert!("later".parse::<SyncStrategy>().is_err());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_sync_logged_at_warn() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let f = fixture(SyncStrategy::CheckThenWrite).await;
        f.transport.fail_on(TransportOp::Insert);
        assert!(f.hooks.on_save(&f.def, &Record::new(4).with("title", "x")).await.is_err());

        let output = String::from_utf8(log.0.lock().clone()).unwrap();
        let line = output
            .lines()
            .find(|l| l.contains("Record sync failed"))
            .expect("sync failure logged");
        assert!(line.contains("WARN"), "unexpected level: {line}");
    }
}
