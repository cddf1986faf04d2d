//! The fixed search-query battery.

use dossier_shared::{CohortConfig, ResearchRequest};

/// Build the query battery for `request`, capped at `max_queries`.
///
/// Identity queries come first, then people and funding, then cohort-specific
/// queries (only for cohort codes), then press coverage.
pub fn build_queries(
    request: &ResearchRequest,
    cohort: &CohortConfig,
    max_queries: usize,
) -> Vec<String> {
    let company = request.company.trim();
    if company.is_empty() {
        return Vec::new();
    }

    let mut queries = Vec::new();

    match request.domain() {
        Some(domain) => {
            queries.push(format!("{company} {domain}"));
            queries.push(format!("{company} company"));
        }
        None => {
            queries.push(format!("{company} company startup"));
            queries.push(format!("{company} tech company"));
        }
    }

    queries.push(format!("{company} founders"));
    queries.push(format!("{company} CEO founder"));
    queries.push(format!("{company} funding raised"));

    if let Some(code) = request.provenance().filter(|p| cohort.is_cohort_code(p)) {
        queries.push(format!("{company} Y Combinator {code}"));
        queries.push(format!("site:ycombinator.com {company}"));
    }

    queries.push(format!("{company} TechCrunch"));
    queries.push(format!("{company} news announcement"));
    queries.push(format!("{company} team leadership"));
    queries.push(format!("{company} series seed investors"));

    queries.truncate(max_queries);
    queries
}
