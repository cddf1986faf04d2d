//! External page scraper: full text for the most useful search results.

use chrono::Utc;
use dossier_shared::{
    DomainListsConfig, LimitsConfig, PageMap, PageRecord, ResearchConfig, SearchResult, char_len,
    truncate_chars,
};
use tracing::{debug, info, instrument};
use url::Url;

use crate::extract::{EXTERNAL_CHROME_TAGS, TextScope, extract_page};
use crate::http::HttpFetcher;

/// Fetches and extracts article text from a priority-ordered subset of search results.
#[derive(Debug, Clone)]
pub struct ExternalScraper {
    http: HttpFetcher,
    limits: LimitsConfig,
    domains: DomainListsConfig,
}

impl ExternalScraper {
    pub fn new(http: HttpFetcher, config: &ResearchConfig) -> Self {
        Self {
            http,
            limits: config.limits.clone(),
            domains: config.domains.clone(),
        }
    }

    /// Scrape up to `max_external_pages` results, priority hosts first.
    ///
    /// Never fails: unreachable, non-HTML or thin pages are skipped.
    #[instrument(skip_all, fields(candidates = results.len()))]
    pub async fn scrape(&self, results: &[SearchResult]) -> PageMap {
        let mut pages = PageMap::new();
        let mut attempted = 0usize;

        for result in prioritize(results, &self.domains.priority) {
            if pages.len() >= self.limits.max_external_pages {
                break;
            }

            let Ok(url) = Url::parse(&result.url) else {
                debug!(url = %result.url, "unparseable URL, skipping");
                continue;
            };
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }
            if url
                .host_str()
                .is_some_and(|host| host_in_list(host, &self.domains.skip))
            {
                debug!(%url, "skip-listed host");
                continue;
            }

            attempted += 1;
            match self.fetch_record(&url, result).await {
                Some(record) => {
                    pages.insert(record);
                }
                None => debug!(%url, "no usable content"),
            }
        }

        info!(attempted, accepted = pages.len(), "external scrape completed");
        pages
    }

    async fn fetch_record(&self, url: &Url, result: &SearchResult) -> Option<PageRecord> {
        let fetched = match self.http.get_html(url).await {
            Ok(doc) => doc,
            Err(e) => {
                debug!(%url, error = %e, "fetch failed");
                return None;
            }
        };

        let page = extract_page(
            &fetched.body,
            &fetched.url,
            EXTERNAL_CHROME_TAGS,
            TextScope::PreferMainContent,
        );
        if char_len(&page.text) <= self.limits.min_external_text_chars {
            return None;
        }

        let title = Some(result.title.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .or(page.title)
            .unwrap_or_default();

        Some(PageRecord {
            url: result.url.clone(),
            title,
            meta_description: page.meta_description,
            content: truncate_chars(&page.text, self.limits.external_page_chars).to_string(),
            fetched_at: Utc::now(),
        })
    }
}

/// Stable ordering with priority-host results first.
pub fn prioritize<'a>(results: &'a [SearchResult], priority: &[String]) -> Vec<&'a SearchResult> {
    let mut ordered: Vec<&SearchResult> = results.iter().collect();
    ordered.sort_by_key(|r| !is_priority(&r.url, priority));
    ordered
}

fn is_priority(raw_url: &str, priority: &[String]) -> bool {
    Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| host_in_list(h, priority)))
        .unwrap_or(false)
}

/// Whether `host` equals, or is a subdomain of, any domain in `list`.
pub fn host_in_list(host: &str, list: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    list.iter().any(|domain| {
        let domain = domain.trim().to_ascii_lowercase();
        host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}
