//! Domain crawler: frontier-driven traversal of one company's website.
//!
//! All traversal state (frontier, visited set, accepted pages) lives in a
//! [`CrawlSession`] created per call, so concurrent crawls never share state.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use chrono::Utc;
use dossier_discovery::{SitemapOptions, discover_sitemap_urls};
use dossier_shared::{
    DossierError, LimitsConfig, PageMap, PageRecord, ResearchConfig, Result, char_len,
    truncate_chars,
};
use tracing::{debug, info, instrument};
use url::Url;

use crate::extract::{CHROME_TAGS, ExtractedPage, TextScope, extract_page};
use crate::http::HttpFetcher;

/// Paths seeded into every crawl after the homepage and sitemap entries.
pub const WELL_KNOWN_PATHS: [&str; 24] = [
    "/",
    "/about",
    "/about-us",
    "/team",
    "/company",
    "/product",
    "/products",
    "/features",
    "/pricing",
    "/blog",
    "/news",
    "/press",
    "/careers",
    "/contact",
    "/faq",
    "/help",
    "/founders",
    "/leadership",
    "/story",
    "/mission",
    "/vision",
    "/customers",
    "/case-studies",
    "/solutions",
];

// ---------------------------------------------------------------------------
// DomainCrawler
// ---------------------------------------------------------------------------

/// Crawls a company's own website, breadth-first, up to a page cap.
#[derive(Debug, Clone)]
pub struct DomainCrawler {
    http: HttpFetcher,
    limits: LimitsConfig,
    scheme: String,
}

impl DomainCrawler {
    pub fn new(http: HttpFetcher, config: &ResearchConfig) -> Self {
        Self {
            http,
            limits: config.limits.clone(),
            scheme: config.fetch.scheme.clone(),
        }
    }

    /// Crawl `domain` and return the accepted pages keyed by normalized URL.
    ///
    /// An empty domain yields an empty map without touching the network.
    /// Per-page failures are skipped; only a domain that cannot form a URL
    /// is an error.
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn crawl(&self, domain: &str) -> Result<PageMap> {
        let domain = domain.trim();
        if domain.is_empty() {
            debug!("no domain, skipping crawl");
            return Ok(PageMap::new());
        }

        let start_time = Instant::now();
        let (scope, homepage) = DomainScope::parse(domain, &self.scheme)?;

        let sitemap_opts = SitemapOptions {
            scheme: self.scheme.clone(),
            max_urls: self.limits.max_sitemap_seeds,
        };
        let sitemap_urls = discover_sitemap_urls(self.http.client(), domain, &sitemap_opts).await;

        let mut session = CrawlSession::new(scope, self.limits.max_domain_pages);
        session.seed(homepage.clone());
        for loc in &sitemap_urls {
            if let Ok(url) = homepage.join(loc) {
                session.seed(url);
            }
        }
        for path in WELL_KNOWN_PATHS {
            if let Ok(url) = homepage.join(path) {
                session.seed(url);
            }
        }

        info!(
            max_pages = self.limits.max_domain_pages,
            sitemap_seeds = sitemap_urls.len(),
            frontier = session.frontier_len(),
            "starting crawl"
        );

        while !session.is_full() {
            let Some((url, key)) = session.next_candidate() else {
                break;
            };

            let (final_url, page) = match self.fetch_page(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    debug!(%url, error = %e, "fetch failed, skipping");
                    session.errors += 1;
                    continue;
                }
            };

            let Some(key) = session.claim_redirect_target(&key, &final_url) else {
                debug!(%url, %final_url, "redirect target seen or out of scope, skipping");
                continue;
            };

            if char_len(&page.text) <= self.limits.min_domain_text_chars {
                debug!(%url, "too little text, skipping");
                session.skipped += 1;
            } else {
                session.accept(PageRecord {
                    url: key,
                    title: page.title.unwrap_or_default(),
                    meta_description: page.meta_description,
                    content: truncate_chars(&page.text, self.limits.domain_page_chars).to_string(),
                    fetched_at: Utc::now(),
                });
            }
            for link in page.links {
                session.enqueue_discovered(link);
            }
        }

        info!(
            pages_accepted = session.pages.len(),
            pages_skipped = session.skipped,
            errors = session.errors,
            duration_ms = start_time.elapsed().as_millis(),
            "crawl completed"
        );

        Ok(session.pages)
    }

    /// Fetch one page and return the URL it ended on along with its extraction.
    async fn fetch_page(&self, url: &Url) -> Result<(Url, ExtractedPage)> {
        let fetched = self.http.get_html(url).await?;
        let page = extract_page(&fetched.body, &fetched.url, CHROME_TAGS, TextScope::WholePage);
        Ok((fetched.url, page))
    }
}

// ---------------------------------------------------------------------------
// CrawlSession
// ---------------------------------------------------------------------------

/// Per-call traversal state: FIFO frontier, visited and queued sets, results.
#[derive(Debug)]
pub struct CrawlSession {
    scope: DomainScope,
    frontier: VecDeque<Url>,
    /// Normalized URLs already popped from the frontier.
    visited: HashSet<String>,
    /// Normalized URLs ever pushed onto the frontier.
    queued: HashSet<String>,
    pages: PageMap,
    max_pages: usize,
    skipped: usize,
    errors: usize,
}

impl CrawlSession {
    pub fn new(scope: DomainScope, max_pages: usize) -> Self {
        Self {
            scope,
            frontier: VecDeque::new(),
            visited: HashSet::new(),
            queued: HashSet::new(),
            pages: PageMap::new(),
            max_pages,
            skipped: 0,
            errors: 0,
        }
    }

    /// Push a seed URL. Duplicates are dropped here; scope is checked on pop.
    pub fn seed(&mut self, url: Url) {
        if self.queued.insert(normalize_url(&url)) {
            self.frontier.push_back(url);
        }
    }

    /// Push a link found on a page if it is in scope and not yet seen.
    pub fn enqueue_discovered(&mut self, url: Url) -> bool {
        if !self.scope.contains(&url) {
            return false;
        }
        let key = normalize_url(&url);
        if self.visited.contains(&key) || self.queued.contains(&key) {
            return false;
        }
        self.queued.insert(key);
        self.frontier.push_back(url);
        true
    }

    /// Pop the next unvisited, in-scope URL and mark it visited.
    pub fn next_candidate(&mut self) -> Option<(Url, String)> {
        while let Some(url) = self.frontier.pop_front() {
            let key = normalize_url(&url);
            if !self.visited.insert(key.clone()) {
                self.skipped += 1;
                continue;
            }
            if !self.scope.contains(&url) {
                debug!(%url, "out of scope, skipping");
                self.skipped += 1;
                continue;
            }
            return Some((url, key));
        }
        None
    }

    /// Check the URL a fetch ended on after redirects and return the key to
    /// record the page under. `None` when a redirect led out of scope or to a
    /// URL already visited.
    pub fn claim_redirect_target(
        &mut self,
        requested_key: &str,
        final_url: &Url,
    ) -> Option<String> {
        let key = normalize_url(final_url);
        if key == requested_key {
            return Some(key);
        }
        if !self.scope.contains(final_url) || !self.visited.insert(key.clone()) {
            self.skipped += 1;
            return None;
        }
        Some(key)
    }

    /// Record an accepted page. Ignored once the cap is reached.
    pub fn accept(&mut self, page: PageRecord) {
        if self.is_full() {
            return;
        }
        if !self.pages.insert(page) {
            self.skipped += 1;
        }
    }

    pub fn is_full(&self) -> bool {
        self.pages.len() >= self.max_pages
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    pub fn has_visited(&self, url: &Url) -> bool {
        self.visited.contains(&normalize_url(url))
    }
}

// ---------------------------------------------------------------------------
// Scope checking
// ---------------------------------------------------------------------------

/// The target domain: a URL is in scope if its host is the domain or one of
/// its subdomains (and the port matches).
#[derive(Debug, Clone)]
pub struct DomainScope {
    host: String,
    port: Option<u16>,
}

impl DomainScope {
    /// Parse a bare domain (`acme.com`, `127.0.0.1:8080`) into a scope and its homepage URL.
    pub fn parse(domain: &str, scheme: &str) -> Result<(Self, Url)> {
        let homepage = Url::parse(&format!("{scheme}://{domain}/"))
            .map_err(|e| DossierError::validation(format!("invalid domain '{domain}': {e}")))?;

        let host = homepage
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DossierError::validation(format!("domain '{domain}' has no host")))?
            .to_string();

        if homepage.path() != "/" {
            return Err(DossierError::validation(format!(
                "domain '{domain}' must not contain a path"
            )));
        }

        let scope = Self {
            host,
            port: homepage.port(),
        };
        Ok((scope, homepage))
    }

    pub fn contains(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_matches = host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'));

        host_matches && url.port() == self.port
    }
}

/// Normalize a URL for deduplication: scheme + host (+ port) + path,
/// trailing slash stripped, query and fragment dropped.
pub fn normalize_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let normalized = format!("{}://{}{}", url.scheme(), authority, url.path());
    normalized.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_shared::FetchConfig;

    fn scope(domain: &str) -> DomainScope {
        DomainScope::parse(domain, "https").unwrap().0
    }

    fn local_crawler() -> DomainCrawler {
        let config = ResearchConfig {
            fetch: FetchConfig {
                scheme: "http".into(),
                allow_private_hosts: true,
                timeout_secs: 5,
                ..FetchConfig::default()
            },
            ..ResearchConfig::default()
        };
        let http = HttpFetcher::new(&config.fetch).unwrap();
        DomainCrawler::new(http, &config)
    }

    fn html_page(title: &str, text: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{href}">link</a>"#))
            .collect();
        format!(
            "<html><head><title>{title}</title></head>\
             <body><nav>{anchors}</nav><main><p>{text}</p></main></body></html>"
        )
    }

    fn html_response(body: String) -> wiremock::ResponseTemplate {
        wiremock::ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
    }

    fn long_text(label: &str) -> String {
        format!("{label} ").repeat(40)
    }

    #[test]
    fn test_normalize_url() {
        let url = Url::parse("https://acme.com/about/?utm=1#team").unwrap();
        assert_eq!(normalize_url(&url), "https://acme.com/about");

        let root = Url::parse("https://acme.com/").unwrap();
        assert_eq!(normalize_url(&root), "https://acme.com");

        let port = Url::parse("http://127.0.0.1:8080/x").unwrap();
        assert_eq!(normalize_url(&port), "http://127.0.0.1:8080/x");
    }

    #[test]
    fn test_scope_accepts_domain_and_subdomains() {
        let scope = scope("acme.com");
        assert!(scope.contains(&Url::parse("https://acme.com/about").unwrap()));
        assert!(scope.contains(&Url::parse("http://blog.acme.com/post").unwrap()));
        assert!(!scope.contains(&Url::parse("https://notacme.com/").unwrap()));
        assert!(!scope.contains(&Url::parse("https://acme.com.evil.io/").unwrap()));
        assert!(!scope.contains(&Url::parse("https://acme.com:8443/").unwrap()));
        assert!(!scope.contains(&Url::parse("ftp://acme.com/").unwrap()));
    }

    #[test]
    fn test_scope_rejects_bad_domains() {
        assert!(DomainScope::parse("exa mple.com", "https").is_err());
        assert!(DomainScope::parse("acme.com/about", "https").is_err());
    }

    #[test]
    fn test_session_dedups_and_marks_visited() {
        let mut session = CrawlSession::new(scope("acme.com"), 15);
        session.seed(Url::parse("https://acme.com/").unwrap());
        session.seed(Url::parse("https://acme.com").unwrap());
        session.seed(Url::parse("https://other.com/").unwrap());
        assert_eq!(session.frontier_len(), 2);

        let (url, key) = session.next_candidate().unwrap();
        assert_eq!(key, "https://acme.com");
        assert!(session.has_visited(&url));

        // Already visited: not re-queued
        assert!(!session.enqueue_discovered(Url::parse("https://acme.com/#top").unwrap()));
        // Out of scope: never queued
        assert!(!session.enqueue_discovered(Url::parse("https://other.com/a").unwrap()));
        assert!(session.enqueue_discovered(Url::parse("https://acme.com/team").unwrap()));
        assert!(!session.enqueue_discovered(Url::parse("https://acme.com/team/").unwrap()));

        // other.com seed is skipped on pop; /team comes next
        let (_, key) = session.next_candidate().unwrap();
        assert_eq!(key, "https://acme.com/team");
        assert!(session.next_candidate().is_none());
    }

    #[test]
    fn test_session_claims_redirect_targets_once() {
        let mut session = CrawlSession::new(scope("acme.com"), 15);
        session.seed(Url::parse("https://acme.com/about").unwrap());
        session.seed(Url::parse("https://acme.com/company").unwrap());

        let (_, key) = session.next_candidate().unwrap();
        let company = Url::parse("https://acme.com/company/").unwrap();
        assert_eq!(
            session.claim_redirect_target(&key, &company).as_deref(),
            Some("https://acme.com/company")
        );
        // A second redirect onto the same page is refused
        assert!(session.claim_redirect_target(&key, &company).is_none());
        // Redirects leaving the domain are refused
        let offsite = Url::parse("https://other.com/").unwrap();
        assert!(session.claim_redirect_target(&key, &offsite).is_none());

        // The queued /company entry is now skipped on pop
        assert!(session.next_candidate().is_none());
    }

    #[tokio::test]
    async fn test_empty_domain_returns_empty_map() {
        let crawler = local_crawler();
        let pages = crawler.crawl("   ").await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_domain_is_error() {
        let crawler = local_crawler();
        assert!(crawler.crawl("exa mple.com").await.is_err());
    }

    #[tokio::test]
    async fn test_crawl_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let home = html_page("Acme", &long_text("home"), &["/about", "/products/robot"]);
        let about = html_page("About Acme", &long_text("about"), &["/", "/products/robot"]);
        let robot = html_page("Robot", &long_text("robot"), &[]);

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(html_response(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/about"))
            .respond_with(html_response(about))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/products/robot"))
            .respond_with(html_response(robot))
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        assert_eq!(pages.len(), 3);

        let base = format!("http://{domain}");
        let home_page = pages.get(&base).expect("homepage keyed by normalized URL");
        assert_eq!(home_page.title, "Acme");
        assert!(pages.contains(&format!("{base}/about")));
        assert!(pages.contains(&format!("{base}/products/robot")));

        // Every key belongs to the crawled host
        for url in pages.urls() {
            assert!(url.starts_with(&base), "{url} escaped the domain");
        }
    }

    #[tokio::test]
    async fn test_crawl_caps_pages() {
        let server = wiremock::MockServer::start().await;

        let links: Vec<String> = (0..30).map(|i| format!("/p/{i}")).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let home = html_page("Home", &long_text("home"), &link_refs);

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path_regex(r"^/p/\d+$"))
            .respond_with(html_response(html_page("Page", &long_text("page"), &[])))
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        assert_eq!(pages.len(), 15);
    }

    #[tokio::test]
    async fn test_crawl_never_fetches_same_page_twice() {
        let server = wiremock::MockServer::start().await;

        let home = html_page(
            "Home",
            &long_text("home"),
            &["/team", "/team/", "/team?ref=nav", "/team#founders", "/team/#x"],
        );
        let team = html_page("Team", &long_text("team"), &["/", "/team"]);

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(home))
            .expect(1)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/team"))
            .respond_with(html_response(team))
            .expect(1)
            .mount(&server)
            .await;

        // Trailing-slash variant normalizes to /team and must not be requested.
        wiremock::Mock::given(wiremock::matchers::path("/team/"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();
        assert_eq!(pages.len(), 2);

        server.verify().await;
    }

    #[tokio::test]
    async fn test_redirected_page_is_fetched_once() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(html_page("Home", &long_text("home"), &[])))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/about"))
            .respond_with(
                wiremock::ResponseTemplate::new(301).insert_header("location", "/company"),
            )
            .expect(1)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/company"))
            .respond_with(html_response(html_page("Company", &long_text("company"), &[])))
            .expect(1)
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        let base = format!("http://{domain}");
        assert_eq!(pages.len(), 2);
        assert!(pages.contains(&format!("{base}/company")));
        assert!(!pages.contains(&format!("{base}/about")));
        assert_eq!(pages.iter().filter(|p| p.title == "Company").count(), 1);

        server.verify().await;
    }

    #[tokio::test]
    async fn test_short_pages_are_excluded() {
        let server = wiremock::MockServer::start().await;

        let home = html_page("Home", &long_text("home"), &["/short"]);
        // Exactly 80 characters of text after stripping.
        let short = html_page("Short", &"x".repeat(80), &[]);

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/short"))
            .respond_with(html_response(short))
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert!(!pages.contains(&format!("http://{domain}/short")));
    }

    #[tokio::test]
    async fn test_non_html_and_errors_are_skipped() {
        let server = wiremock::MockServer::start().await;

        let home = html_page("Home", &long_text("home"), &["/data.json", "/broken"]);

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(home))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/data.json"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_raw(long_text("json"), "application/json"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/broken"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        assert_eq!(pages.len(), 1);
        assert!(!pages.urls().any(|u| u.ends_with("/broken") || u.ends_with("/data.json")));
    }

    #[tokio::test]
    async fn test_content_truncated_to_budget() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(html_response(html_page("Home", &"y".repeat(20_000), &[])))
            .mount(&server)
            .await;

        let domain = server.address().to_string();
        let pages = local_crawler().crawl(&domain).await.unwrap();

        let home = pages.iter().next().unwrap();
        assert_eq!(char_len(&home.content), 8000);
    }

    #[tokio::test]
    async fn test_sitemap_entries_seed_the_frontier() {
        let server = wiremock::MockServer::start().await;
        let domain = server.address().to_string();

        let sitemap = format!(
            "<urlset><url><loc>http://{domain}/hidden</loc></url>\
             <url><loc>https://elsewhere.com/page</loc></url></urlset>"
        );

        wiremock::Mock::given(wiremock::matchers::path("/sitemap.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(sitemap))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/hidden"))
            .respond_with(html_response(html_page("Hidden", &long_text("hidden"), &[])))
            .mount(&server)
            .await;

        let pages = local_crawler().crawl(&domain).await.unwrap();

        assert!(pages.contains(&format!("http://{domain}/hidden")));
        assert!(!pages.urls().any(|u| u.contains("elsewhere.com")));
    }
}
