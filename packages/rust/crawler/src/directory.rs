//! Directory probe: guesses a company's identifier on structured directories.

use chrono::Utc;
use dossier_shared::{
    CohortConfig, DirectoryConfig, DossierError, LimitsConfig, PageRecord, ResearchConfig,
    ResearchRequest, Result, char_len, truncate_chars,
};
use tracing::{debug, info, instrument};
use url::Url;

use crate::extract::{CHROME_TAGS, TextScope, extract_page};
use crate::http::HttpFetcher;

/// Placeholder substituted in directory URL templates.
const SLUG_PLACEHOLDER: &str = "{slug}";

/// Maximum number of general-directory slugs tried.
const MAX_SLUGS: usize = 3;

/// Records found by one probe, plus any template errors hit along the way.
#[derive(Debug, Default)]
pub struct DirectoryRecords {
    pub company: Option<PageRecord>,
    pub cohort: Option<PageRecord>,
    pub errors: Vec<DossierError>,
}

#[derive(Debug, Clone)]
pub struct DirectoryProbe {
    http: HttpFetcher,
    directory: DirectoryConfig,
    cohort: CohortConfig,
    limits: LimitsConfig,
}

impl DirectoryProbe {
    pub fn new(http: HttpFetcher, config: &ResearchConfig) -> Self {
        Self {
            http,
            directory: config.directory.clone(),
            cohort: config.cohort.clone(),
            limits: config.limits.clone(),
        }
    }

    /// Probe the general directory, then the cohort directory when the
    /// provenance is a cohort code.
    ///
    /// Fetch failures mean "not found". A template that cannot form a URL is
    /// recorded in `errors` and does not stop the other directory.
    #[instrument(skip_all, fields(company = %request.company))]
    pub async fn probe(&self, request: &ResearchRequest) -> DirectoryRecords {
        let mut records = DirectoryRecords::default();

        match self.probe_company(request).await {
            Ok(found) => records.company = found,
            Err(e) => records.errors.push(e),
        }

        if request
            .provenance()
            .is_some_and(|code| self.cohort.is_cohort_code(code))
        {
            match self.probe_cohort(request).await {
                Ok(found) => records.cohort = found,
                Err(e) => records.errors.push(e),
            }
        }

        info!(
            company_found = records.company.is_some(),
            cohort_found = records.cohort.is_some(),
            errors = records.errors.len(),
            "directory probe completed"
        );
        records
    }

    /// Try each candidate slug until a page returns 200 and carries the marker.
    pub async fn probe_company(&self, request: &ResearchRequest) -> Result<Option<PageRecord>> {
        let marker = self.directory.company_marker.to_lowercase();

        for slug in company_slugs(&request.company, request.domain()) {
            let url = slug_url(&self.directory.company_url_template, &slug)?;
            let Some((record, text)) = self.fetch_record(&url).await else {
                continue;
            };
            if text.to_lowercase().contains(&marker) {
                return Ok(Some(record));
            }
            debug!(%url, "directory page lacks marker");
        }
        Ok(None)
    }

    /// Fetch the cohort directory page for the hyphenated company name.
    pub async fn probe_cohort(&self, request: &ResearchRequest) -> Result<Option<PageRecord>> {
        let slug = hyphenated(&request.company);
        if slug.is_empty() {
            return Ok(None);
        }
        let url = slug_url(&self.directory.cohort_url_template, &slug)?;

        Ok(self
            .fetch_record(&url)
            .await
            .filter(|(_, text)| char_len(text) > self.limits.min_external_text_chars)
            .map(|(record, _)| record))
    }

    /// Fetch `url`, requiring exactly 200. Returns the record and the full text.
    async fn fetch_record(&self, url: &Url) -> Option<(PageRecord, String)> {
        let fetched = match self.http.get(url).await {
            Ok(doc) => doc,
            Err(e) => {
                debug!(%url, error = %e, "directory fetch failed");
                return None;
            }
        };
        if fetched.status != 200 {
            debug!(%url, status = fetched.status, "directory page not found");
            return None;
        }

        let page = extract_page(&fetched.body, &fetched.url, CHROME_TAGS, TextScope::WholePage);
        let record = PageRecord {
            url: url.to_string(),
            title: page.title.unwrap_or_default(),
            meta_description: page.meta_description,
            content: truncate_chars(&page.text, self.limits.directory_page_chars).to_string(),
            fetched_at: Utc::now(),
        };
        Some((record, page.text))
    }
}

/// Up to three distinct, non-empty slugs for the general directory.
pub fn company_slugs(company: &str, domain: Option<&str>) -> Vec<String> {
    let domain_label = domain.map(|d| {
        let d = d.strip_prefix("www.").unwrap_or(d);
        d.split('.').next().unwrap_or("").to_lowercase()
    });

    let candidates = [
        Some(hyphenated(company)),
        Some(company.to_lowercase().split_whitespace().collect::<String>()),
        domain_label,
    ];

    let mut slugs: Vec<String> = Vec::new();
    for slug in candidates.into_iter().flatten() {
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs.truncate(MAX_SLUGS);
    slugs
}

/// Lowercase name with whitespace runs replaced by single hyphens.
fn hyphenated(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Substitute `slug` into `template`.
pub fn slug_url(template: &str, slug: &str) -> Result<Url> {
    if !template.contains(SLUG_PLACEHOLDER) {
        return Err(DossierError::config(format!(
            "directory template '{template}' has no {SLUG_PLACEHOLDER} placeholder"
        )));
    }
    let raw = template.replace(SLUG_PLACEHOLDER, slug);
    Url::parse(&raw)
        .map_err(|e| DossierError::config(format!("invalid directory URL '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dossier_shared::FetchConfig;

    fn probe_for(server: &wiremock::MockServer) -> DirectoryProbe {
        let config = ResearchConfig {
            fetch: FetchConfig {
                allow_private_hosts: true,
                timeout_secs: 5,
                ..FetchConfig::default()
            },
            directory: DirectoryConfig {
                company_url_template: format!("{}/organization/{{slug}}", server.uri()),
                company_marker: "Crunchbase".into(),
                cohort_url_template: format!("{}/companies/{{slug}}", server.uri()),
            },
            ..ResearchConfig::default()
        };
        let http = HttpFetcher::new(&config.fetch).unwrap();
        DirectoryProbe::new(http, &config)
    }

    fn html_response(text: &str) -> wiremock::ResponseTemplate {
        wiremock::ResponseTemplate::new(200).set_body_raw(
            format!("<html><head><title>Profile</title></head><body><p>{text}</p></body></html>"),
            "text/html; charset=utf-8",
        )
    }

    #[test]
    fn slugs_are_distinct_and_capped() {
        assert_eq!(
            company_slugs("Acme Robotics", Some("www.acmebots.io")),
            vec!["acme-robotics", "acmerobotics", "acmebots"]
        );
        // Single-word names collapse the first two candidates.
        assert_eq!(company_slugs("Acme", Some("acme.com")), vec!["acme"]);
        assert_eq!(company_slugs("Acme", None), vec!["acme"]);
        assert!(company_slugs("  ", None).is_empty());
    }

    #[test]
    fn slug_url_requires_placeholder() {
        let url = slug_url("https://dir.example.com/org/{slug}", "acme").unwrap();
        assert_eq!(url.as_str(), "https://dir.example.com/org/acme");
        assert!(slug_url("https://dir.example.com/org/", "acme").is_err());
        assert!(slug_url("not a url {slug}", "acme").is_err());
    }

    #[tokio::test]
    async fn company_probe_tries_slugs_until_marker() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/organization/acme-robotics"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        // 200 without the marker is rejected.
        wiremock::Mock::given(wiremock::matchers::path("/organization/acmerobotics"))
            .respond_with(html_response("Parked domain"))
            .expect(1)
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/organization/acmebots"))
            .respond_with(html_response("Acme Robotics on crunchbase: seed, 12 employees"))
            .expect(1)
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        let request = ResearchRequest::new("Acme Robotics").with_domain("acmebots.io");
        let records = probe.probe(&request).await;

        let company = records.company.unwrap();
        assert!(company.url.ends_with("/organization/acmebots"));
        assert!(company.content.contains("12 employees"));
        assert!(records.cohort.is_none());

        server.verify().await;
    }

    #[tokio::test]
    async fn cohort_probe_only_for_cohort_codes() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/companies/acme"))
            .respond_with(html_response(&"Acme builds robots. ".repeat(20)))
            .expect(0)
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        let request = ResearchRequest::new("Acme").with_provenance("Referral");
        let records = probe.probe(&request).await;
        assert!(records.cohort.is_none());

        server.verify().await;
    }

    #[tokio::test]
    async fn cohort_probe_accepts_long_pages() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/companies/acme-robotics"))
            .respond_with(html_response(&"Acme builds robots. ".repeat(400)))
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        let request = ResearchRequest::new("Acme Robotics").with_provenance("w24");
        let records = probe.probe(&request).await;

        let cohort = records.cohort.unwrap();
        assert_eq!(char_len(&cohort.content), 5000);
        assert!(records.company.is_none());
    }

    #[tokio::test]
    async fn invalid_template_is_error() {
        let server = wiremock::MockServer::start().await;
        let mut probe = probe_for(&server);
        probe.directory.company_url_template = "https://dir.example.com/".into();

        let request = ResearchRequest::new("Acme");
        let records = probe.probe(&request).await;
        assert_eq!(records.errors.len(), 1);
        assert!(matches!(records.errors[0], DossierError::Config { .. }));
        assert!(records.company.is_none());
    }

    #[tokio::test]
    async fn bad_company_template_still_checks_cohort_directory() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/companies/acme"))
            .respond_with(html_response(&"Acme builds robots. ".repeat(20)))
            .expect(1)
            .mount(&server)
            .await;

        let mut probe = probe_for(&server);
        probe.directory.company_url_template = "no placeholder here".into();

        let request = ResearchRequest::new("Acme").with_provenance("W24");
        let records = probe.probe(&request).await;

        assert!(records.company.is_none());
        assert!(records.cohort.unwrap().content.contains("Acme builds robots."));
        assert_eq!(records.errors.len(), 1);

        server.verify().await;
    }
}
