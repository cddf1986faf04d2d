//! Serper-compatible web search client.

use std::time::Duration;

use dossier_shared::{DossierError, Result, SearchResult, SearchSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::SearchProvider;

/// Request body sent to the search endpoint.
#[derive(Debug, Serialize)]
struct SearchRequestBody<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl From<OrganicResult> for SearchResult {
    fn from(r: OrganicResult) -> Self {
        Self {
            title: r.title,
            url: r.link,
            snippet: r.snippet,
        }
    }
}

/// Keyed search client. Unconfigured (no key) clients never make calls.
#[derive(Debug, Clone)]
pub struct SerperClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SerperClient {
    pub fn new(settings: &SearchSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DossierError::Network(format!("failed to build search client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

impl SearchProvider for SerperClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(&self, query: &str, num: usize) -> Result<Vec<SearchResult>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(DossierError::Search("no API key configured".into()));
        };

        debug!(%query, num, "search request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&SearchRequestBody { q: query, num })
            .send()
            .await
            .map_err(|e| DossierError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DossierError::Search(format!("HTTP {status} for query '{query}'")));
        }

        let body: SearchResponseBody = response
            .json()
            .await
            .map_err(|e| DossierError::Search(format!("invalid response: {e}")))?;

        Ok(body.organic.into_iter().map(SearchResult::from).collect())
    }
}
