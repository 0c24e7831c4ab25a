// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! HTTP transport for Manticore's JSON API.
//!
//! # Error classification
//!
//! | Reply | Error |
//! |-------|-------|
//! | connect/timeout/non-JSON body | `Transport` |
//! | engine error on a DDL statement | `Schema` |
//! | engine error on anything else | `Query` |
//!
//! `/sql?mode=raw` may report an error inside a `200` result set; that is
//! classified the same way as an error status.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::traits::{SearchError, SearchTransport};
use super::wire::{DeleteDocumentRequest, InsertDocumentRequest, SearchRequest};
use crate::config::SearchConfig;
use crate::resilience::retry::{retry, RetryConfig};

const NDJSON: &str = "application/x-ndjson";

/// Which error bucket an engine-side rejection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Schema,
    Query,
}

impl Rejection {
    fn for_statement(sql: &str) -> Self {
        let verb = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match verb.as_str() {
            "CREATE" | "DROP" | "ALTER" | "TRUNCATE" => Rejection::Schema,
            _ => Rejection::Query,
        }
    }

    fn error(self, message: String) -> SearchError {
        match self {
            Rejection::Schema => SearchError::Schema(message),
            Rejection::Query => SearchError::Query(message),
        }
    }
}

/// Transport over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    /// Build a transport without contacting the engine.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SearchError::Config(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Build a transport and probe the engine with `SHOW TABLES`, retrying
    /// with the startup policy.
    pub async fn connect(config: &SearchConfig) -> Result<Self, SearchError> {
        Self::connect_with_retry(config, &RetryConfig::startup()).await
    }

    pub async fn connect_with_retry(
        config: &SearchConfig,
        retry_config: &RetryConfig,
    ) -> Result<Self, SearchError> {
        let transport = Self::new(config)?;
        retry("search_probe", retry_config, || transport.sql("SHOW TABLES")).await?;
        info!(url = %transport.base_url, "Connected to search engine");
        Ok(transport)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, SearchError> {
        self.send(path, self.post(path).json(body), Rejection::Query).await
    }

    async fn send(
        &self,
        path: &str,
        request: RequestBuilder,
        rejection: Rejection,
    ) -> Result<Value, SearchError> {
        debug!(path, "Search engine request");
        let response = request
            .send()
            .await
            .map_err(|e| SearchError::Transport(format!("POST {} failed: {}", path, e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SearchError::Transport(format!("POST {} body read failed: {}", path, e)))?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if let Some(message) = body.as_ref().and_then(engine_error) {
            if !status.is_success() || path.starts_with("/sql") {
                return Err(rejection.error(format!("{} (HTTP {})", message, status.as_u16())));
            }
        }
        if !status.is_success() {
            return Err(SearchError::Transport(format!(
                "POST {} returned HTTP {}",
                path,
                status.as_u16()
            )));
        }
        body.ok_or_else(|| SearchError::Transport(format!("POST {} returned a non-JSON body", path)))
    }
}

/// Error message carried by an engine reply, if any.
///
/// Handles `{"error": "..."}`, `{"error": {"type": .., "reason": ..}}` and
/// SQL result-set arrays whose `error` is non-empty.
fn engine_error(body: &Value) -> Option<String> {
    match body {
        Value::Array(sets) => sets.iter().find_map(engine_error),
        Value::Object(map) => match map.get("error")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(detail) => detail
                .get("reason")
                .or_else(|| detail.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        },
        _ => None,
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn sql(&self, query: &str) -> Result<Value, SearchError> {
        let request = self.post("/sql?mode=raw").form(&[("query", query)]);
        self.send("/sql", request, Rejection::for_statement(query)).await
    }

    async fn insert(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError> {
        self.post_json("/insert", request).await
    }

    async fn replace(&self, request: &InsertDocumentRequest) -> Result<Value, SearchError> {
        self.post_json("/replace", request).await
    }

    async fn delete(&self, request: &DeleteDocumentRequest) -> Result<Value, SearchError> {
        self.post_json("/delete", request).await
    }

    async fn bulk(&self, ndjson: &str) -> Result<Value, SearchError> {
        // Line-level failures come back as `errors: true` with HTTP 200;
        // the gateway inspects that flag
        let request = self
            .post("/bulk")
            .header(CONTENT_TYPE, NDJSON)
            .body(format!("{}\n", ndjson));
        self.send("/bulk", request, Rejection::Query).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        self.post_json("/search", request).await
    }
}
