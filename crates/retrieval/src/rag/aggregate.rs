//! Fan-out search across connected sources.

use crate::adapters::SourceAdapter;
use crate::rank::rerank;
use crate::types::{Candidate, ContextBlock, Reference, SourceTokens};
use futures::future::join_all;
use groundwork_core::config::RetrievalSettings;
use std::sync::Arc;
use std::time::Duration;

/// Default per-adapter deadline.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of raw results requested per source.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default number of candidates kept per source.
pub const DEFAULT_TOP_K: usize = 3;

/// References and grounding context gathered for one query.
///
/// `references[i]` cites `context[i]`; both are grouped by source in search
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub references: Vec<Reference>,
    pub context: Vec<ContextBlock>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }

    /// Number of candidates that survived reranking.
    pub fn candidate_count(&self) -> usize {
        self.context.len()
    }
}

/// Searches every source the user has a token for and merges the results.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    timeout: Duration,
    search_limit: usize,
    top_k: usize,
}

impl Aggregator {
    /// Adapters are kept in source order whatever order they are given in.
    pub fn new(mut adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        adapters.sort_by_key(|adapter| adapter.source());
        Self {
            adapters,
            timeout: DEFAULT_ADAPTER_TIMEOUT,
            search_limit: DEFAULT_SEARCH_LIMIT,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_search_limit(mut self, search_limit: usize) -> Self {
        self.search_limit = search_limit;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Apply retrieval settings from configuration.
    pub fn with_settings(self, settings: &RetrievalSettings) -> Self {
        self.with_timeout(Duration::from_secs(settings.adapter_timeout_secs))
            .with_search_limit(settings.search_limit)
            .with_top_k(settings.top_k)
    }

    /// Search all connected sources concurrently.
    ///
    /// Sources without a token are skipped. A source that fails or exceeds
    /// the deadline contributes nothing and does not affect the others. The
    /// result order depends only on source order and ranking, never on which
    /// search finished first.
    pub async fn aggregate(&self, query: &str, tokens: &SourceTokens) -> Aggregation {
        let searches = self.adapters.iter().filter_map(|adapter| {
            let token = tokens.token(adapter.source())?;
            Some(self.search_source(adapter.as_ref(), token, query))
        });
        let per_source = join_all(searches).await;

        let mut aggregation = Aggregation::default();
        for candidates in per_source {
            for candidate in rerank(query, candidates, self.top_k) {
                aggregation.references.push(Reference::from(&candidate));
                aggregation.context.push(ContextBlock::from(candidate));
            }
        }

        tracing::info!(
            "Aggregated {} candidates from {} connected sources",
            aggregation.candidate_count(),
            tokens.connected().len()
        );

        aggregation
    }

    async fn search_source(
        &self,
        adapter: &dyn SourceAdapter,
        token: &str,
        query: &str,
    ) -> Vec<Candidate> {
        let source = adapter.source();
        let search = adapter.search(token, query, self.search_limit);

        match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(candidates)) => {
                tracing::debug!("{} returned {} candidates", source, candidates.len());
                candidates
                    .into_iter()
                    .filter(|c| c.source == source)
                    .collect()
            }
            Ok(Err(e)) => {
                tracing::warn!("{} search failed: {}", source, e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("{} search timed out after {:?}", source, self.timeout);
                Vec::new()
            }
        }
    }
}
