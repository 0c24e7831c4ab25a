use std::sync::Arc;

use super::queryset::QuerySet;
use crate::gateway::IndexGateway;
use crate::schema::IndexDefinition;

/// Entry point for queries: hands out a fresh [`QuerySet`] per table.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    gateway: Arc<IndexGateway>,
}

impl QueryEngine {
    pub fn new(gateway: Arc<IndexGateway>) -> Self {
        Self { gateway }
    }

    /// Query set over a definition's table.
    #[must_use]
    pub fn objects(&self, definition: &IndexDefinition) -> QuerySet {
        self.table(definition.table_name())
    }

    /// Query set over a table by name.
    #[must_use]
    pub fn table(&self, table: &str) -> QuerySet {
        QuerySet::new(Arc::clone(&self.gateway), table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, RecordType};
    use crate::search::QueryState;
    use crate::sync::SyncDocument;
    use crate::transport::{MemoryTransport, SearchError, TransportOp};

    async fn seeded() -> (Arc<MemoryTransport>, QueryEngine, IndexDefinition, Arc<RecordType>) {
        let ty = Arc::new(
            RecordType::new("Article")
                .field("title", "CharField")
                .field("body", "TextField"),
        );
        let def = IndexDefinition::new(&ty);
        let transport = Arc::new(MemoryTransport::new());
        let gateway = Arc::new(IndexGateway::new(transport.clone()));
        gateway.create_table(&def).await.unwrap();
        let docs: Vec<SyncDocument> = [
            (1, "Rust search engines", "fast and safe"),
            (2, "Python search", "dynamic typing"),
            (3, "Gardening", "Fast growing tomatoes"),
        ]
        .into_iter()
        .map(|(id, title, body)| {
            SyncDocument::project(&def, &Record::new(id).with("title", title).with("body", body))
        })
        .collect();
        gateway.bulk_insert("article", docs).await.unwrap();
        transport.clear_calls();
        (transport, QueryEngine::new(gateway), def, ty)
    }

    #[tokio::test]
    async fn test_all_before_search_lists_table() {
        let (transport, engine, def, _ty) = seeded().await;
        let qs = engine.objects(&def);
        assert_eq!(*qs.state(), QueryState::NotSearched);

        assert_eq!(qs.ids().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(transport.calls_of(TransportOp::Search).len(), 1);
        assert_eq!(*qs.state(), QueryState::NotSearched);
    }

    #[tokio::test]
    async fn test_search_and_or() {
        let (_transport, engine, def, _ty) = seeded().await;
        let mut qs = engine.objects(&def);

        let ids = qs.search("search fast", true).await.unwrap().ids().await.unwrap();
        assert_eq!(ids, vec![1]);

        let ids = qs.search("search fast", false).await.unwrap().ids().await.unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_empty_search_result_is_remembered() {
        let (transport, engine, def, _ty) = seeded().await;
        let mut qs = engine.objects(&def);
        qs.phrase_search("search rust").await.unwrap();
        transport.clear_calls();

        assert!(qs.all().await.unwrap().is_empty());
        assert!(qs.first().await.unwrap().is_none());
        assert_eq!(transport.call_count(), 0);

        qs.reset();
        assert_eq!(qs.all().await.unwrap().len(), 3);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_phrase_search() {
        let (_transport, engine, def, _ty) = seeded().await;
        let mut qs = engine.objects(&def);
        let first = qs.phrase_search("RUST SEARCH").await.unwrap().first().await.unwrap();
        let first = first.unwrap();
        assert_eq!(first.id(), 1);
        assert_eq!(first.to_string(), "1");
    }

    #[tokio::test]
    async fn test_limit_is_forwarded() {
        let (_transport, engine, def, _ty) = seeded().await;
        let qs = engine.objects(&def).with_limit(2);
        assert_eq!(qs.ids().await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_search_keeps_state() {
        let (transport, engine, def, _ty) = seeded().await;
        let mut qs = engine.objects(&def);
        qs.search("python", false).await.unwrap();

        transport.fail_on(TransportOp::Search);
        let err = qs.search("rust", false).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)));
        // Previous hits still served from memory
        assert_eq!(qs.ids().await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_missing_table_is_query_error() {
        let (_transport, engine, _def, _ty) = seeded().await;
        let err = engine.table("nothing").all().await.unwrap_err();
        assert!(matches!(err, SearchError::Query(_)));
    }
}
