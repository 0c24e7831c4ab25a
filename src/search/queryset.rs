//! Per-table query holder.

use std::sync::Arc;

use tracing::debug;

use super::hit::SearchHit;
use crate::gateway::IndexGateway;
use crate::metrics;
use crate::transport::{FulltextFilter, MatchOperator, SearchError, SearchRequest};

/// Whether a search has run on a [`QuerySet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryState {
    /// No search yet; reads list the whole table
    #[default]
    NotSearched,
    /// Result of the last search, possibly empty
    Searched(Vec<SearchHit>),
}

/// Query builder and result holder for one table.
///
/// ```text
/// NotSearched ──search/phrase_search──→ Searched(hits) ──reset──→ NotSearched
/// ```
///
/// Reads in `NotSearched` issue one listing request each and do not change
/// the state. Reads in `Searched` never touch the engine.
#[derive(Debug, Clone)]
pub struct QuerySet {
    gateway: Arc<IndexGateway>,
    table: String,
    limit: Option<u32>,
    state: QueryState,
}

impl QuerySet {
    pub(crate) fn new(gateway: Arc<IndexGateway>, table: impl Into<String>) -> Self {
        Self {
            gateway,
            table: table.into(),
            limit: None,
            state: QueryState::NotSearched,
        }
    }

    /// Cap every request at `limit` hits instead of the engine's default page.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Keyword search over every full-text field. With `match_all` a hit
    /// must contain every word; otherwise any word. Word order is ignored.
    ///
    /// On error the previous state is kept.
    pub async fn search(&mut self, query: &str, match_all: bool) -> Result<&mut Self, SearchError> {
        let operator = if match_all { MatchOperator::And } else { MatchOperator::Or };
        self.run("match", FulltextFilter::keywords(query, operator)).await
    }

    /// Exact, case-insensitive phrase search over every full-text field.
    pub async fn phrase_search(&mut self, phrase: &str) -> Result<&mut Self, SearchError> {
        self.run("phrase", FulltextFilter::phrase(phrase)).await
    }

    /// Hits of the last search, or the whole table when none ran.
    pub async fn all(&self) -> Result<Vec<SearchHit>, SearchError> {
        match &self.state {
            QueryState::Searched(hits) => Ok(hits.clone()),
            QueryState::NotSearched => {
                let request = SearchRequest::listing(&self.table).with_limit(self.limit);
                self.fetch("listing", &request).await
            }
        }
    }

    pub async fn ids(&self) -> Result<Vec<u64>, SearchError> {
        Ok(self.all().await?.iter().map(SearchHit::id).collect())
    }

    pub async fn first(&self) -> Result<Option<SearchHit>, SearchError> {
        Ok(self.all().await?.into_iter().next())
    }

    /// Forget the last search.
    pub fn reset(&mut self) {
        self.state = QueryState::NotSearched;
    }

    async fn run(&mut self, mode: &'static str, filter: FulltextFilter) -> Result<&mut Self, SearchError> {
        let request = SearchRequest::filtered(&self.table, filter).with_limit(self.limit);
        let hits = self.fetch(mode, &request).await?;
        self.state = QueryState::Searched(hits);
        Ok(self)
    }

    async fn fetch(&self, mode: &'static str, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        match self.gateway.search(request).await {
            Ok(response) => {
                let hits: Vec<SearchHit> = response.hits.hits.into_iter().map(SearchHit::from).collect();
                metrics::record_search_query(mode, "success");
                metrics::record_search_results(hits.len());
                debug!(table = %self.table, mode, hits = hits.len(), "Search complete");
                Ok(hits)
            }
            Err(e) => {
                metrics::record_search_query(mode, "error");
                Err(e)
            }
        }
    }
}
