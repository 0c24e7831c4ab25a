//! Query layer over index tables.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use search_sync::{IndexGateway, QueryEngine, schema::IndexDefinition};
//! # async fn demo(gateway: Arc<IndexGateway>, articles: &IndexDefinition) -> Result<(), search_sync::SearchError> {
//! let engine = QueryEngine::new(gateway);
//! let mut qs = engine.objects(articles);
//!
//! // Every word must match
//! let ids = qs.search("rust search", true).await?.ids().await?;
//!
//! // Exact phrase, case-insensitive
//! let first = qs.phrase_search("Rust Search").await?.first().await?;
//! # Ok(())
//! # }
//! ```

mod hit;
mod query;
mod queryset;

pub use hit::SearchHit;
pub use query::QueryEngine;
pub use queryset::{QuerySet, QueryState};
