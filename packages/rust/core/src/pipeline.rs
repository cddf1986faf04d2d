//! End-to-end research pipeline: request → crawl → search → scrape → directories → context.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use dossier_crawler::{DirectoryProbe, DomainCrawler, ExternalScraper, HttpFetcher};
use dossier_search::{SearchProvider, SerperClient, aggregate};
use dossier_shared::{ResearchBundle, ResearchConfig, ResearchRequest, Result};

use crate::assembler::{ContextInputs, assemble_context};

/// Result of one research call.
#[derive(Debug, Clone)]
pub struct ResearchReport {
    /// Everything gathered, including per-stage errors.
    pub bundle: ResearchBundle,
    /// The assembled context document.
    pub context: String,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called when a stage finishes with the number of items it produced.
    fn stage_complete(&self, name: &str, items: usize);
    /// Called when the pipeline completes.
    fn done(&self, report: &ResearchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_complete(&self, _name: &str, _items: usize) {}
    fn done(&self, _report: &ResearchReport) {}
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The research engine. Holds configured collaborators and no per-call state,
/// so one engine can serve concurrent calls.
#[derive(Debug)]
pub struct ResearchEngine<S: SearchProvider = SerperClient> {
    config: ResearchConfig,
    crawler: DomainCrawler,
    scraper: ExternalScraper,
    directory: DirectoryProbe,
    search: S,
}

impl ResearchEngine<SerperClient> {
    /// Build an engine using the configured Serper-compatible search endpoint.
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.fetch.timeout_secs);
        let search = SerperClient::new(&config.search, timeout)?;
        Self::with_search_provider(config, search)
    }
}

impl<S: SearchProvider> ResearchEngine<S> {
    /// Build an engine with a custom search backend.
    pub fn with_search_provider(config: ResearchConfig, search: S) -> Result<Self> {
        let http = HttpFetcher::new(&config.fetch)?;
        Ok(Self {
            crawler: DomainCrawler::new(http.clone(), &config),
            scraper: ExternalScraper::new(http.clone(), &config),
            directory: DirectoryProbe::new(http, &config),
            search,
            config,
        })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run every gathering stage for `request` and assemble the context document.
    ///
    /// Never fails: a stage that errors is recorded in `bundle.errors` and the
    /// remaining stages still run.
    ///
    /// 1. Crawl the company domain
    /// 2. Run the search query battery
    /// 3. Scrape prioritized search results
    /// 4. Probe company and cohort directories
    /// 5. Assemble the context document
    #[instrument(skip_all, fields(company = %request.company))]
    pub async fn research(
        &self,
        request: &ResearchRequest,
        inputs: &ContextInputs,
        progress: &dyn ProgressReporter,
    ) -> ResearchReport {
        let start = Instant::now();
        let mut bundle = ResearchBundle::new(request.clone());

        info!(
            domain = request.domain().unwrap_or("-"),
            provenance = request.provenance().unwrap_or("-"),
            "starting research"
        );

        // --- Stage 1: Domain crawl ---
        progress.phase("Crawling company website");
        match self.crawler.crawl(request.domain().unwrap_or("")).await {
            Ok(pages) => bundle.domain_pages = pages,
            Err(e) => {
                warn!(error = %e, "domain crawl failed");
                bundle.errors.push(format!("Domain crawl failed: {e}"));
            }
        }
        progress.stage_complete("Domain crawl", bundle.domain_pages.len());

        // --- Stage 2: Web search ---
        progress.phase("Searching the web");
        bundle.search_results = aggregate(
            &self.search,
            request,
            &self.config.search,
            &self.config.cohort,
        )
        .await;
        progress.stage_complete("Web search", bundle.search_results.len());

        // --- Stage 3: External pages ---
        progress.phase("Scraping external sources");
        bundle.external_content = self.scraper.scrape(&bundle.search_results).await;
        progress.stage_complete("External sources", bundle.external_content.len());

        // --- Stage 4: Directories ---
        progress.phase("Probing directories");
        let records = self.directory.probe(request).await;
        bundle.directory_record = records.company;
        bundle.cohort_directory_record = records.cohort;
        for e in records.errors {
            warn!(error = %e, "directory probe failed");
            bundle.errors.push(format!("Directory probe failed: {e}"));
        }
        let directory_hits = usize::from(bundle.directory_record.is_some())
            + usize::from(bundle.cohort_directory_record.is_some());
        progress.stage_complete("Directories", directory_hits);

        // --- Stage 5: Assemble ---
        progress.phase("Assembling context");
        let context = assemble_context(
            &bundle,
            inputs,
            &self.config.context,
            &self.config.cohort,
        );

        let report = ResearchReport {
            bundle,
            context,
            elapsed: start.elapsed(),
        };

        info!(
            pages = report.bundle.total_pages(),
            search_results = report.bundle.search_results.len(),
            errors = report.bundle.errors.len(),
            context_chars = report.context.chars().count(),
            elapsed_ms = report.elapsed.as_millis(),
            "research completed"
        );

        progress.done(&report);
        report
    }
}
