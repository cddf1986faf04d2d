//! Core domain types for company research.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ResearchRequest
// ---------------------------------------------------------------------------

/// Input to one research call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Company name as written by the requester.
    pub company: String,
    /// Company web domain (`acme.com`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Provenance tag, e.g. a batch code like `W24`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl ResearchRequest {
    /// Create a request for a company with no domain or provenance.
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into().trim().to_string(),
            domain: None,
            provenance: None,
        }
    }

    /// Attach a domain. Blank values are ignored; URLs are reduced to their host.
    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        let domain = normalize_domain(domain.as_ref());
        self.domain = (!domain.is_empty()).then_some(domain);
        self
    }

    /// Attach a provenance tag. Blank values are ignored.
    pub fn with_provenance(mut self, provenance: impl AsRef<str>) -> Self {
        let provenance = provenance.as_ref().trim();
        self.provenance = (!provenance.is_empty()).then(|| provenance.to_string());
        self
    }

    /// The domain, or `None` when absent or blank.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref().filter(|d| !d.trim().is_empty())
    }

    /// The provenance tag, or `None` when absent or blank.
    pub fn provenance(&self) -> Option<&str> {
        self.provenance.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Reduce user input like `https://www.Acme.com/about` to `www.acme.com`.
///
/// Ports are kept (`localhost:8080` stays as is).
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .split_once("://")
        .map_or(trimmed, |(_, rest)| rest);

    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// PageRecord / PageMap
// ---------------------------------------------------------------------------

/// One successfully fetched and extracted page, from any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    /// Extracted plain text, already truncated to the stage budget.
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

/// Insertion-ordered `url -> PageRecord` map.
///
/// Iteration order is acceptance order, so "first N pages" means the first N
/// pages a stage accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageMap {
    pages: Vec<PageRecord>,
}

impl PageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page keyed by its URL. Returns `false` (and keeps the existing
    /// entry) if the URL is already present.
    pub fn insert(&mut self, page: PageRecord) -> bool {
        if self.contains(&page.url) {
            return false;
        }
        self.pages.push(page);
        true
    }

    pub fn get(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.url == url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pages.iter().any(|p| p.url == url)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.iter()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.url.as_str())
    }
}

impl<'a> IntoIterator for &'a PageMap {
    type Item = &'a PageRecord;
    type IntoIter = std::slice::Iter<'a, PageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}

// ---------------------------------------------------------------------------
// SearchResult
// ---------------------------------------------------------------------------

/// One organic web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// ResearchBundle
// ---------------------------------------------------------------------------

/// Everything the gathering stages collected for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchBundle {
    pub request: ResearchRequest,
    /// Pages crawled from the company's own website.
    pub domain_pages: PageMap,
    /// Deduplicated web search hits, in first-seen order.
    pub search_results: Vec<SearchResult>,
    /// Full text scraped from a subset of the search hits.
    pub external_content: PageMap,
    /// General company directory entry (Crunchbase-style).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_record: Option<PageRecord>,
    /// Cohort directory entry (accelerator batch listing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cohort_directory_record: Option<PageRecord>,
    /// Human-readable stage failures.
    pub errors: Vec<String>,
}

impl ResearchBundle {
    /// An empty bundle for `request`.
    pub fn new(request: ResearchRequest) -> Self {
        Self {
            request,
            domain_pages: PageMap::new(),
            search_results: Vec::new(),
            external_content: PageMap::new(),
            directory_record: None,
            cohort_directory_record: None,
            errors: Vec::new(),
        }
    }

    /// Domain pages plus external pages.
    pub fn total_pages(&self) -> usize {
        self.domain_pages.len() + self.external_content.len()
    }
}

// ---------------------------------------------------------------------------
// Externally supplied context blocks
// ---------------------------------------------------------------------------

/// Relationship history distilled from forwarded email threads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipContext {
    pub introducer: Option<Introducer>,
    pub contacts: Vec<Contact>,
    pub summary: Option<String>,
    pub timeline: Vec<TimelineEvent>,
    pub key_topics: Vec<String>,
    pub next_steps: Option<String>,
    pub raw_messages: Vec<EmailMessage>,
}

impl RelationshipContext {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Introducer {
    pub name: String,
    pub email: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub date: Option<String>,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailMessage {
    pub from: Option<String>,
    pub date: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

/// Founder-written content from an accelerator cohort's private forum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortContext {
    pub founders: Vec<Founder>,
    pub posts: Vec<CohortPost>,
}

impl CohortContext {
    pub fn is_empty(&self) -> bool {
        self.founders.is_empty() && self.posts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Founder {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortPost {
    pub title: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
}
