//! Application configuration for Dossier.
//!
//! User config lives at `~/.dossier/dossier.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DossierError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dossier.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dossier";

/// Maximum pages accepted from the company's own website.
pub const MAX_DOMAIN_PAGES: usize = 15;
/// Maximum pages scraped from search results.
pub const MAX_EXTERNAL_PAGES: usize = 10;
/// Maximum sitemap entries used as crawl seeds.
pub const MAX_SITEMAP_SEEDS: usize = 20;
/// Per-request timeout in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 10;
/// Content budget (characters) for crawled domain pages.
pub const DOMAIN_PAGE_CHARS: usize = 8000;
/// Content budget (characters) for external and directory pages.
pub const EXTERNAL_PAGE_CHARS: usize = 5000;

// ---------------------------------------------------------------------------
// Config structs (matching dossier.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// HTTP fetch settings shared by every gathering stage.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Page caps and per-stage truncation budgets.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Context document budgets.
    #[serde(default)]
    pub context: ContextBudgets,

    /// Priority and skip host lists for external scraping.
    #[serde(default)]
    pub domains: DomainListsConfig,

    /// Structured directory URL templates.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Cohort code recognition.
    #[serde(default)]
    pub cohort: CohortConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Search endpoint (Serper-compatible JSON API).
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Result-count hint sent with every query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Upper bound on queries issued per research call.
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            endpoint: default_search_endpoint(),
            results_per_query: default_results_per_query(),
            max_queries: default_max_queries(),
        }
    }
}

fn default_api_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_results_per_query() -> usize {
    10
}
fn default_max_queries() -> usize {
    8
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every page request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Scheme used to turn a bare domain into a URL.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Allow fetching loopback/private addresses (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            scheme: default_scheme(),
            max_redirects: default_max_redirects(),
            allow_private_hosts: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    FETCH_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}
fn default_scheme() -> String {
    "https".into()
}
fn default_max_redirects() -> usize {
    5
}

/// `[limits]` section: gathering caps and stage truncation budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_domain_pages")]
    pub max_domain_pages: usize,

    #[serde(default = "default_max_external_pages")]
    pub max_external_pages: usize,

    #[serde(default = "default_max_sitemap_seeds")]
    pub max_sitemap_seeds: usize,

    /// Characters kept per crawled domain page.
    #[serde(default = "default_domain_page_chars")]
    pub domain_page_chars: usize,

    /// Characters kept per scraped external page.
    #[serde(default = "default_external_page_chars")]
    pub external_page_chars: usize,

    /// Characters kept per directory page.
    #[serde(default = "default_external_page_chars")]
    pub directory_page_chars: usize,

    /// A domain page is kept only if its text is longer than this.
    #[serde(default = "default_min_domain_text")]
    pub min_domain_text_chars: usize,

    /// An external or cohort directory page is kept only if its text is longer than this.
    #[serde(default = "default_min_external_text")]
    pub min_external_text_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_domain_pages: default_max_domain_pages(),
            max_external_pages: default_max_external_pages(),
            max_sitemap_seeds: default_max_sitemap_seeds(),
            domain_page_chars: default_domain_page_chars(),
            external_page_chars: default_external_page_chars(),
            directory_page_chars: default_external_page_chars(),
            min_domain_text_chars: default_min_domain_text(),
            min_external_text_chars: default_min_external_text(),
        }
    }
}

fn default_max_domain_pages() -> usize {
    MAX_DOMAIN_PAGES
}
fn default_max_external_pages() -> usize {
    MAX_EXTERNAL_PAGES
}
fn default_max_sitemap_seeds() -> usize {
    MAX_SITEMAP_SEEDS
}
fn default_domain_page_chars() -> usize {
    DOMAIN_PAGE_CHARS
}
fn default_external_page_chars() -> usize {
    EXTERNAL_PAGE_CHARS
}
fn default_min_domain_text() -> usize {
    100
}
fn default_min_external_text() -> usize {
    200
}

/// `[context]` section: how much of each source makes it into the context document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBudgets {
    #[serde(default = "default_ctx_domain_pages")]
    pub max_domain_pages: usize,

    #[serde(default = "default_ctx_page_chars")]
    pub domain_page_chars: usize,

    #[serde(default = "default_ctx_search_results")]
    pub max_search_results: usize,

    #[serde(default = "default_ctx_snippet_chars")]
    pub snippet_chars: usize,

    #[serde(default = "default_ctx_external_sources")]
    pub max_external_sources: usize,

    #[serde(default = "default_ctx_page_chars")]
    pub external_source_chars: usize,

    #[serde(default = "default_ctx_directory_chars")]
    pub directory_chars: usize,

    /// Cap for email bodies and cohort post bodies.
    #[serde(default = "default_ctx_body_chars")]
    pub body_chars: usize,

    #[serde(default = "default_ctx_timeline_events")]
    pub max_timeline_events: usize,

    #[serde(default = "default_ctx_messages")]
    pub max_messages: usize,

    #[serde(default = "default_ctx_posts")]
    pub max_posts: usize,
}

impl Default for ContextBudgets {
    fn default() -> Self {
        Self {
            max_domain_pages: default_ctx_domain_pages(),
            domain_page_chars: default_ctx_page_chars(),
            max_search_results: default_ctx_search_results(),
            snippet_chars: default_ctx_snippet_chars(),
            max_external_sources: default_ctx_external_sources(),
            external_source_chars: default_ctx_page_chars(),
            directory_chars: default_ctx_directory_chars(),
            body_chars: default_ctx_body_chars(),
            max_timeline_events: default_ctx_timeline_events(),
            max_messages: default_ctx_messages(),
            max_posts: default_ctx_posts(),
        }
    }
}

fn default_ctx_domain_pages() -> usize {
    10
}
fn default_ctx_page_chars() -> usize {
    3000
}
fn default_ctx_search_results() -> usize {
    15
}
fn default_ctx_snippet_chars() -> usize {
    300
}
fn default_ctx_external_sources() -> usize {
    8
}
fn default_ctx_directory_chars() -> usize {
    4000
}
fn default_ctx_body_chars() -> usize {
    2000
}
fn default_ctx_timeline_events() -> usize {
    10
}
fn default_ctx_messages() -> usize {
    5
}
fn default_ctx_posts() -> usize {
    5
}

/// `[domains]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainListsConfig {
    /// Hosts scraped before everything else.
    #[serde(default = "default_priority_domains")]
    pub priority: Vec<String>,

    /// Hosts never scraped (social networks, video platforms, search engines).
    #[serde(default = "default_skip_domains")]
    pub skip: Vec<String>,
}

impl Default for DomainListsConfig {
    fn default() -> Self {
        Self {
            priority: default_priority_domains(),
            skip: default_skip_domains(),
        }
    }
}

fn default_priority_domains() -> Vec<String> {
    [
        "techcrunch.com",
        "crunchbase.com",
        "ycombinator.com",
        "forbes.com",
        "bloomberg.com",
        "reuters.com",
        "venturebeat.com",
        "producthunt.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_skip_domains() -> Vec<String> {
    [
        "linkedin.com",
        "facebook.com",
        "twitter.com",
        "x.com",
        "instagram.com",
        "youtube.com",
        "google.com",
        "bing.com",
        "duckduckgo.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[directory]` section. Templates contain a `{slug}` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_company_template")]
    pub company_url_template: String,

    /// Text that must appear on a genuine company directory page.
    #[serde(default = "default_company_marker")]
    pub company_marker: String,

    #[serde(default = "default_cohort_template")]
    pub cohort_url_template: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            company_url_template: default_company_template(),
            company_marker: default_company_marker(),
            cohort_url_template: default_cohort_template(),
        }
    }
}

fn default_company_template() -> String {
    "https://www.crunchbase.com/organization/{slug}".into()
}
fn default_company_marker() -> String {
    "crunchbase".into()
}
fn default_cohort_template() -> String {
    "https://www.ycombinator.com/companies/{slug}".into()
}

/// `[cohort]` section: which provenance tags count as cohort codes (e.g. `W24`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortConfig {
    /// Leading letters a cohort code may start with.
    #[serde(default = "default_cohort_prefixes")]
    pub prefixes: Vec<char>,

    /// Maximum cohort code length.
    #[serde(default = "default_cohort_max_len")]
    pub max_len: usize,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            prefixes: default_cohort_prefixes(),
            max_len: default_cohort_max_len(),
        }
    }
}

fn default_cohort_prefixes() -> Vec<char> {
    vec!['W', 'S', 'F', 'X']
}
fn default_cohort_max_len() -> usize {
    4
}

impl CohortConfig {
    /// Whether `provenance` has the shape of a cohort code.
    pub fn is_cohort_code(&self, provenance: &str) -> bool {
        let code = provenance.trim();
        let Some(first) = code.chars().next() else {
            return false;
        };

        code.chars().count() <= self.max_len
            && code.chars().all(|c| c.is_ascii_alphanumeric())
            && self
                .prefixes
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&first))
    }
}

// ---------------------------------------------------------------------------
// Research config (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Search settings with the API key resolved from the environment.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// `None` disables web search entirely.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub results_per_query: usize,
    pub max_queries: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        let search = SearchConfig::default();
        Self {
            api_key: None,
            endpoint: search.endpoint,
            results_per_query: search.results_per_query,
            max_queries: search.max_queries,
        }
    }
}

/// Runtime configuration for one research engine.
///
/// `Default` never reads the environment, so it has no search key.
#[derive(Debug, Clone, Default)]
pub struct ResearchConfig {
    pub search: SearchSettings,
    pub fetch: FetchConfig,
    pub limits: LimitsConfig,
    pub context: ContextBudgets,
    pub domains: DomainListsConfig,
    pub directory: DirectoryConfig,
    pub cohort: CohortConfig,
}

impl From<&AppConfig> for ResearchConfig {
    fn from(config: &AppConfig) -> Self {
        let api_key = std::env::var(&config.search.api_key_env)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if api_key.is_none() {
            tracing::debug!(
                var = %config.search.api_key_env,
                "search API key not set, web search disabled"
            );
        }

        Self {
            search: SearchSettings {
                api_key,
                endpoint: config.search.endpoint.clone(),
                results_per_query: config.search.results_per_query,
                max_queries: config.search.max_queries,
            },
            fetch: config.fetch.clone(),
            limits: config.limits.clone(),
            context: config.context.clone(),
            domains: config.domains.clone(),
            directory: config.directory.clone(),
            cohort: config.cohort.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dossier/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DossierError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dossier/dossier.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DossierError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DossierError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DossierError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DossierError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DossierError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
