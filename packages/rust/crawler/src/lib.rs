//! Web gathering for company research.
//!
//! This crate provides:
//! - [`http`] — Shared HTTP fetcher with timeouts and SSRF protection
//! - [`extract`] — HTML parsing, chrome removal, and plain-text extraction
//! - [`engine`] — Frontier-driven crawler for a company's own website
//! - [`external`] — Full-text scraping of prioritized search results
//! - [`directory`] — Company and cohort directory probing

pub mod directory;
pub mod engine;
pub mod external;
pub mod extract;
pub mod http;

pub use directory::{DirectoryProbe, DirectoryRecords, company_slugs};
pub use engine::{CrawlSession, DomainCrawler, DomainScope, normalize_url};
pub use external::{ExternalScraper, host_in_list, prioritize};
pub use extract::{ExtractedPage, TextScope, extract_page};
pub use http::{FetchedDocument, HttpFetcher};
