//! Sitemap discovery for crawl seeding.
//!
//! Before crawling a company site we look for a sitemap: it lists pages the
//! homepage may never link to (team pages, press releases, old posts). Every
//! failure here means "no sitemap" and the crawl proceeds from its fixed seeds.

mod parser;

use std::net::IpAddr;

use reqwest::Client;
use tracing::{debug, info, instrument};

/// Sitemap file names tried at each host, in order.
const SITEMAP_FILES: [&str; 2] = ["sitemap.xml", "sitemap_index.xml"];

/// Default cap on returned seed URLs.
const DEFAULT_MAX_URLS: usize = 20;

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for sitemap discovery.
#[derive(Debug, Clone)]
pub struct SitemapOptions {
    /// Scheme used to build sitemap URLs (`https` outside of tests).
    pub scheme: String,
    /// Maximum number of `<loc>` entries returned.
    pub max_urls: usize,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            scheme: "https".into(),
            max_urls: DEFAULT_MAX_URLS,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Find crawl seed URLs in the sitemap of `domain`.
///
/// Tries `sitemap.xml` and `sitemap_index.xml` on the bare domain, then on the
/// `www.` host, and returns the `<loc>` entries of the first sitemap that has
/// any, capped at `opts.max_urls`. The client's timeout applies to each request
/// separately. Never fails: unreachable or unparseable sitemaps yield `[]`.
#[instrument(skip_all, fields(domain = %domain))]
pub async fn discover_sitemap_urls(
    client: &Client,
    domain: &str,
    opts: &SitemapOptions,
) -> Vec<String> {
    if domain.trim().is_empty() {
        return Vec::new();
    }

    for sitemap_url in sitemap_candidates(&opts.scheme, domain) {
        match fetch_locs(client, &sitemap_url).await {
            Some(mut locs) if !locs.is_empty() => {
                info!(%sitemap_url, found = locs.len(), "sitemap discovered");
                locs.truncate(opts.max_urls);
                return locs;
            }
            _ => debug!(%sitemap_url, "no usable sitemap"),
        }
    }

    Vec::new()
}

/// Sitemap URLs to try for `domain`, in priority order.
///
/// The `www.` variants are skipped when the domain already has that prefix or
/// is an IP literal.
pub fn sitemap_candidates(scheme: &str, domain: &str) -> Vec<String> {
    let mut hosts = vec![domain.to_string()];
    if wants_www_variant(domain) {
        hosts.push(format!("www.{domain}"));
    }

    hosts
        .iter()
        .flat_map(|host| {
            SITEMAP_FILES
                .iter()
                .map(move |file| format!("{scheme}://{host}/{file}"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn wants_www_variant(domain: &str) -> bool {
    let host = domain.rsplit_once(':').map_or(domain, |(h, _)| h);
    !domain.starts_with("www.") && host.parse::<IpAddr>().is_err() && host != "localhost"
}

/// Fetch and parse one sitemap. `None` on any network, status or parse failure.
async fn fetch_locs(client: &Client, url: &str) -> Option<Vec<String>> {
    let response = match client.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!(%url, error = %e, "sitemap request failed");
            return None;
        }
    };

    if !response.status().is_success() {
        debug!(%url, status = %response.status(), "sitemap not available");
        return None;
    }

    let body = response.text().await.ok()?;

    match parser::parse_sitemap_locs(&body) {
        Ok(locs) => Some(locs),
        Err(e) => {
            debug!(%url, error = %e, "sitemap parse failed");
            None
        }
    }
}
