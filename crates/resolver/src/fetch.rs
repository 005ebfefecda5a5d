use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed page-fetch failures. 404 is split out so the caller can tell
/// "episode does not exist" apart from "site is down".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("not found")]
    NotFound,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

/// Capability interface for retrieving hosting-page content. The resolver
/// takes this as a trait object so tests can substitute canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Build the shared HTTP client: rustls with the platform verifier, pooled
/// connections, an overall request timeout.
pub fn default_client() -> Client {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("Failed to configure default TLS protocol versions")
        .with_platform_verifier()
        .unwrap()
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .pool_max_idle_per_host(5)
        .timeout(PAGE_FETCH_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Production [`PageFetcher`] carrying the consistent header set hosting
/// sites expect: a desktop User-Agent plus Referer/Origin pointing at the
/// site's own root.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Root of the page's own site, e.g. `https://www.weekseries.info/`.
    fn site_root(page_url: &str) -> Option<Url> {
        let url = Url::parse(page_url).ok()?;
        url.join("/").ok()
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new(default_client())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, DEFAULT_UA)
            .header(ACCEPT, "*/*")
            .header(ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7");

        if let Some(root) = Self::site_root(url) {
            let origin = root.as_str().trim_end_matches('/').to_string();
            request = request.header(REFERER, root.as_str()).header(ORIGIN, origin);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
