//! HTTP transport tests against a mock engine.
//!
//! ```bash
//! cargo test --test http_transport
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::json;
use wiremock::matchers::{body_json, body_string, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use search_sync::record::{FieldValue, Record, RecordType};
use search_sync::schema::IndexDefinition;
use search_sync::transport::{DeleteDocumentRequest, FulltextFilter, InsertDocumentRequest, MatchOperator, SearchRequest};
use search_sync::{
    HttpTransport, IndexGateway, QueryEngine, RetryConfig, SearchConfig, SearchError, SearchTransport, SyncDocument,
};

fn config(server: &MockServer) -> SearchConfig {
    SearchConfig {
        host: Some(server.uri()),
        ..Default::default()
    }
}

fn empty_sql_reply() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!([{"total": 0, "error": "", "warning": ""}]))
}

#[tokio::test]
async fn test_sql_is_form_encoded_raw_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .and(query_param("mode", "raw"))
        .and(body_string("query=SHOW+TABLES"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "columns": [{"Index": {"type": "string"}}, {"Type": {"type": "string"}}],
            "data": [{"Index": "article", "Type": "rt"}, {"Index": "comment", "Type": "rt"}],
            "total": 2,
            "error": "",
            "warning": ""
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let transport = Arc::new(HttpTransport::new(&config(&server)).unwrap());
    let gateway = IndexGateway::new(transport);
    assert_eq!(gateway.show_tables().await.unwrap(), vec!["article", "comment"]);
}

#[tokio::test]
async fn test_basic_auth_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(empty_sql_reply())
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&SearchConfig {
        username: Some("user".into()),
        password: Some("pass".into()),
        ..config(&server)
    })
    .unwrap();
    transport.sql("SHOW TABLES").await.unwrap();
}

#[tokio::test]
async fn test_create_table_statement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .and(body_string_contains("CREATE+TABLE+article%28title+text%2C+views+int%29+min_infix_len+%3D+%273%27"))
        .respond_with(empty_sql_reply())
        .expect(1)
        .mount(&server)
        .await;

    let ty = Arc::new(
        RecordType::new("Article")
            .field("title", "CharField")
            .field("views", "IntegerField"),
    );
    let def = IndexDefinition::new(&ty).param("min_infix_len", "3");
    let gateway = IndexGateway::new(Arc::new(HttpTransport::new(&config(&server)).unwrap()));
    gateway.create_table(&def).await.unwrap();
}

#[tokio::test]
async fn test_ddl_error_in_result_set_is_schema_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"total": 0, "error": "table 'article': CREATE TABLE failed: table already exists", "warning": ""}])),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config(&server)).unwrap();
    let err = transport.sql("CREATE TABLE article(title text)").await.unwrap_err();
    assert!(matches!(err, SearchError::Schema(ref m) if m.contains("already exists")));

    let err = transport.sql("SELECT * FROM article WHERE id=1").await.unwrap_err();
    assert!(matches!(err, SearchError::Query(_)));
}

#[tokio::test]
async fn test_insert_rejection_is_query_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/insert"))
        .and(body_json(json!({"index": "article", "id": 1, "doc": {"title": "Alice"}})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"type": "duplicate_id_exception", "reason": "duplicate id '1'"},
            "status": 409
        })))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config(&server)).unwrap();
    let mut doc = IndexMap::new();
    doc.insert("title".to_string(), FieldValue::from("Alice"));
    let err = transport
        .insert(&InsertDocumentRequest {
            index: "article".into(),
            id: 1,
            doc,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Query(ref m) if m.contains("duplicate id")));
}

#[tokio::test]
async fn test_server_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delete"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config(&server)).unwrap();
    let err = transport
        .delete(&DeleteDocumentRequest {
            index: "article".into(),
            id: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}

#[tokio::test]
async fn test_bulk_is_ndjson() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .and(body_string(
            "{\"insert\":{\"index\":\"article\",\"id\":1,\"doc\":{\"title\":\"Alice\"}}}\n",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"bulk": {"_index": "article", "_id": 1, "created": 1, "deleted": 0, "updated": 0, "result": "created", "status": 201}}],
            "current_line": 1,
            "skipped_lines": 0,
            "errors": false,
            "error": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ty = Arc::new(RecordType::new("Article").field("title", "CharField"));
    let def = IndexDefinition::new(&ty);
    let gateway = IndexGateway::new(Arc::new(HttpTransport::new(&config(&server)).unwrap()));
    let doc = SyncDocument::project(&def, &Record::new(1).with("title", "<b>Alice</b>"));
    assert_eq!(gateway.bulk_insert("article", vec![doc]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_search_request_and_string_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({
            "index": "article",
            "query": {"match": {"_all": {"query": "rust search", "operator": "and"}}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "took": 1,
            "timed_out": false,
            "hits": {
                "total": 2,
                "total_relation": "eq",
                "hits": [
                    {"_id": "7", "_score": 1500, "_source": {"title": "Rust search"}},
                    {"_id": 9, "_score": 1400, "_source": {"title": "Search in Rust"}}
                ]
            }
        })))
        .mount(&server)
        .await;

    let gateway = Arc::new(IndexGateway::new(Arc::new(HttpTransport::new(&config(&server)).unwrap())));
    let engine = QueryEngine::new(gateway);
    let mut qs = engine.table("article");
    let hits = qs.search("rust search", true).await.unwrap().all().await.unwrap();
    assert_eq!(hits.iter().map(|h| h.id()).collect::<Vec<_>>(), vec![7, 9]);
    assert_eq!(hits[0].get("title"), Some(&FieldValue::from("Rust search")));
}

#[tokio::test]
async fn test_phrase_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({
            "index": "article",
            "query": {"match_phrase": {"_all": "Rust Search"}},
            "limit": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"total": 0, "hits": []}})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&config(&server)).unwrap();
    let request = SearchRequest::filtered("article", FulltextFilter::phrase("Rust Search")).with_limit(Some(5));
    transport.search(&request).await.unwrap();

    // Keyword filter shape for comparison
    let keywords = serde_json::to_value(FulltextFilter::keywords("a b", MatchOperator::Or)).unwrap();
    assert_eq!(keywords, json!({"match": {"_all": {"query": "a b", "operator": "or"}}}));
}

#[tokio::test]
async fn test_connect_probes_engine() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .respond_with(empty_sql_reply())
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::connect_with_retry(&config(&server), &RetryConfig::once())
        .await
        .unwrap();
    assert_eq!(transport.base_url(), server.uri());
}

#[tokio::test]
async fn test_connect_unreachable_host_fails() {
    let config = SearchConfig {
        host: Some("http://127.0.0.1:1".into()),
        ..Default::default()
    };
    let err = HttpTransport::connect_with_retry(&config, &RetryConfig::once())
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Transport(_)));
}
