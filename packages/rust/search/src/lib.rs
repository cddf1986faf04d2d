//! Multi-query web search aggregation.
//!
//! A fixed battery of queries runs sequentially against a [`SearchProvider`];
//! the results are merged and deduplicated by URL in first-seen order.

mod queries;
mod serper;

use std::collections::HashSet;

use dossier_shared::{CohortConfig, ResearchRequest, Result, SearchResult, SearchSettings};
use tracing::{info, instrument, warn};

pub use queries::build_queries;
pub use serper::SerperClient;

/// A keyed web search backend.
#[allow(async_fn_in_trait)]
pub trait SearchProvider {
    /// Whether credentials are present. Unconfigured providers are never called.
    fn is_configured(&self) -> bool;

    /// Run one query, asking for about `num` results.
    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchResult>>;
}

/// Run the query battery for `request` and return deduplicated results.
///
/// Never fails: a failing query logs a warning and contributes nothing.
#[instrument(skip_all, fields(company = %request.company))]
pub async fn aggregate<P: SearchProvider>(
    provider: &P,
    request: &ResearchRequest,
    settings: &SearchSettings,
    cohort: &CohortConfig,
) -> Vec<SearchResult> {
    if !provider.is_configured() {
        info!("search not configured, skipping");
        return Vec::new();
    }

    let queries = build_queries(request, cohort, settings.max_queries);
    let mut collected = Vec::new();
    let mut failed = 0usize;

    for query in &queries {
        match provider.search(query, settings.results_per_query).await {
            Ok(results) => collected.extend(results),
            Err(e) => {
                warn!(%query, error = %e, "search query failed");
                failed += 1;
            }
        }
    }

    let results = dedup_by_url(collected);
    info!(
        queries = queries.len(),
        failed,
        results = results.len(),
        "search aggregation completed"
    );
    results
}

/// Drop results with an empty or already-seen URL, keeping first-seen order.
pub fn dedup_by_url(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty() && seen.insert(r.url.clone()))
        .collect()
}
