//! Shared HTTP fetching with timeouts, browser-like headers, and SSRF protection.

use std::net::IpAddr;
use std::time::Duration;

use dossier_shared::{DossierError, FetchConfig, Result};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

/// A fetched response body with the metadata gathering stages care about.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    /// Raw `Content-Type` header (empty if missing).
    pub content_type: String,
    pub body: String,
}

impl FetchedDocument {
    /// Whether the response declared an HTML content type.
    pub fn is_html(&self) -> bool {
        is_html_content_type(&self.content_type)
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// One configured HTTP client shared by every gathering stage.
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_private_hosts: bool,
}

impl HttpFetcher {
    /// Build a fetcher from the `[fetch]` configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect_policy(
                config.max_redirects,
                config.allow_private_hosts,
            ))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DossierError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_private_hosts: config.allow_private_hosts,
        })
    }

    /// The underlying client, for collaborators that issue their own requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and read the body regardless of status.
    pub async fn get(&self, url: &Url) -> Result<FetchedDocument> {
        let response = self.send(url).await?;
        read_document(response).await
    }

    /// GET `url`, requiring a 2xx status and an HTML content type.
    ///
    /// The body is only read once both checks pass.
    pub async fn get_html(&self, url: &Url) -> Result<FetchedDocument> {
        let response = self.send(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DossierError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = header_content_type(&response);
        if !is_html_content_type(&content_type) {
            return Err(DossierError::validation(format!(
                "{url}: not HTML (content-type '{content_type}')"
            )));
        }

        read_document(response).await
    }

    async fn send(&self, url: &Url) -> Result<Response> {
        if !self.allow_private_hosts && is_ssrf_target(url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(DossierError::Network(format!(
                "{url}: blocked private or non-HTTP target"
            )));
        }

        debug!(%url, "fetching");
        self.client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DossierError::Network(format!("{url}: {e}")))
    }
}

/// Redirect policy that caps hops and applies the SSRF check to every target.
fn redirect_policy(max_redirects: usize, allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        match check_redirect(
            attempt.url(),
            attempt.previous().len(),
            max_redirects,
            allow_private_hosts,
        ) {
            Ok(()) => attempt.follow(),
            Err(reason) => {
                warn!(url = %attempt.url(), %reason, "redirect refused");
                attempt.error(reason)
            }
        }
    })
}

/// Decide whether a redirect to `target` may be followed after `hops` redirects.
fn check_redirect(
    target: &Url,
    hops: usize,
    max_redirects: usize,
    allow_private_hosts: bool,
) -> std::result::Result<(), String> {
    if hops >= max_redirects {
        return Err(format!("too many redirects (max {max_redirects})"));
    }
    if !allow_private_hosts && is_ssrf_target(target) {
        return Err(format!("redirect to {target} blocked: private or non-HTTP target"));
    }
    Ok(())
}

async fn read_document(response: Response) -> Result<FetchedDocument> {
    let url = response.url().clone();
    let status = response.status().as_u16();
    let content_type = header_content_type(&response);

    let body = response
        .text()
        .await
        .map_err(|e| DossierError::Network(format!("{url}: body read failed: {e}")))?;

    Ok(FetchedDocument {
        url,
        status,
        content_type,
        body,
    })
}

fn header_content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
///
/// Search results and sitemaps are attacker-controlled input, so every stage
/// goes through this check before fetching.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchConfig {
            allow_private_hosts: true,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn ssrf_blocks_file_scheme() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn ssrf_blocks_private_ips() {
        for raw in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
            "http://100.64.0.1/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
    }

    #[test]
    fn ssrf_blocks_local_hostnames() {
        let url = Url::parse("http://localhost:3000/api").unwrap();
        assert!(is_ssrf_target(&url));
        let url = Url::parse("http://printer.local/").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn ssrf_allows_public() {
        let url = Url::parse("https://techcrunch.com/2024/01/01/acme").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[test]
    fn redirects_to_private_targets_are_refused() {
        let internal = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();
        let public = Url::parse("https://acme.com/about").unwrap();

        assert!(check_redirect(&internal, 0, 10, false).is_err());
        assert!(check_redirect(&public, 0, 10, false).is_ok());
        // Opt-in for mock servers
        assert!(check_redirect(&internal, 0, 10, true).is_ok());
        // Hop limit applies either way
        assert!(check_redirect(&public, 10, 10, true).is_err());
    }

    #[tokio::test]
    async fn follows_redirects_up_to_the_limit() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/old"))
            .respond_with(wiremock::ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/new"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_raw("<html><body>moved</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/loop"))
            .respond_with(wiremock::ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let fetcher = local_fetcher();
        let base = Url::parse(&server.uri()).unwrap();

        let doc = fetcher.get_html(&base.join("/old").unwrap()).await.unwrap();
        assert_eq!(doc.url.path(), "/new");
        assert!(doc.body.contains("moved"));

        assert!(fetcher.get(&base.join("/loop").unwrap()).await.is_err());
    }

    #[test]
    fn html_content_types() {
        assert!(is_html_content_type("text/html; charset=utf-8"));
        assert!(is_html_content_type("TEXT/HTML"));
        assert!(is_html_content_type("application/xhtml+xml"));
        assert!(!is_html_content_type("application/json"));
        assert!(!is_html_content_type(""));
    }

    #[tokio::test]
    async fn default_fetcher_blocks_loopback() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.get(&url).await.unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn get_html_rejects_non_html_and_errors() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/page"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/data"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let fetcher = local_fetcher();
        let base = Url::parse(&server.uri()).unwrap();

        let doc = fetcher.get_html(&base.join("/page").unwrap()).await.unwrap();
        assert_eq!(doc.status, 200);
        assert!(doc.is_html());
        assert!(doc.body.contains("hi"));

        assert!(fetcher.get_html(&base.join("/data").unwrap()).await.is_err());
        assert!(fetcher.get_html(&base.join("/gone").unwrap()).await.is_err());

        // Plain `get` reports the status instead of failing.
        let gone = fetcher.get(&base.join("/gone").unwrap()).await.unwrap();
        assert_eq!(gone.status, 410);
    }
}
