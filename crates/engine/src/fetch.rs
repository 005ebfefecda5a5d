use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::events::ProgressEvent;
use crate::manifest::SegmentRef;

/// Build the engine's HTTP client: rustls with the platform verifier,
/// pooled connections, redirects capped.
pub fn create_client(config: &DownloadConfig) -> Result<Client, DownloadError> {
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
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .connect_timeout(config.connect_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(DownloadError::from)
}

/// Capability interface for downloading one segment. The retriever only
/// depends on this, so tests exercise ordering and failure handling with
/// canned bytes instead of a network.
#[async_trait]
pub trait SegmentFetcher: Send + Sync {
    async fn fetch_segment(
        &self,
        segment: &SegmentRef,
        cancel: &CancellationToken,
    ) -> Result<Bytes, DownloadError>;
}

/// Production fetcher: per-attempt timeout, exponential backoff on
/// transient failures (network errors, timeouts, 5xx), client errors
/// terminal. Cancellation is honored at every retry boundary.
pub struct HttpSegmentFetcher {
    client: Client,
    config: DownloadConfig,
    request_headers: HeaderMap,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl HttpSegmentFetcher {
    pub fn new(
        client: Client,
        config: DownloadConfig,
        referer: Option<&str>,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Self {
        Self {
            client,
            config,
            request_headers: referer_headers(referer),
            progress,
        }
    }

    /// Fetch playlist text with the same header set segments use.
    pub async fn fetch_playlist(&self, url: &str) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .headers(self.request_headers.clone())
            .timeout(self.config.playlist_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        debug!(url, bytes = body.len(), "fetched playlist");
        Ok(body)
    }

    async fn fetch_with_retries(
        &self,
        segment: &SegmentRef,
        cancel: &CancellationToken,
    ) -> Result<Bytes, DownloadError> {
        let mut attempts: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            attempts += 1;

            match self
                .client
                .get(&segment.url)
                .headers(self.request_headers.clone())
                .timeout(self.config.segment_timeout)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.bytes().await.map_err(DownloadError::from);
                    }
                    if status.is_client_error() {
                        // 4xx will not improve with retries
                        return Err(DownloadError::Status(status.as_u16()));
                    }
                    if attempts > self.config.max_retries {
                        warn!(url = %segment.url, %status, "segment retries exhausted");
                        return Err(DownloadError::Status(status.as_u16()));
                    }
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout() || e.is_request();
                    if !transient || attempts > self.config.max_retries {
                        warn!(url = %segment.url, error = %e, "segment download failed");
                        return Err(DownloadError::from(e));
                    }
                }
            }

            if let Some(progress) = &self.progress {
                let _ = progress
                    .send(ProgressEvent::SegmentRetry {
                        index: segment.index,
                        attempt: attempts,
                    })
                    .await;
            }

            let delay = self.config.retry_delay * 2_u32.pow(attempts.saturating_sub(1));
            tokio::select! {
                _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[async_trait]
impl SegmentFetcher for HttpSegmentFetcher {
    async fn fetch_segment(
        &self,
        segment: &SegmentRef,
        cancel: &CancellationToken,
    ) -> Result<Bytes, DownloadError> {
        let bytes = self.fetch_with_retries(segment, cancel).await?;
        debug!(index = segment.index, bytes = bytes.len(), "segment downloaded");
        Ok(bytes)
    }
}

/// Referer/Origin pair derived from the resolved page, plus a wildcard
/// Accept. Hosts behind hotlink protection refuse segment requests
/// without these.
fn referer_headers(referer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    let Some(referer) = referer else {
        return headers;
    };
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    if let Ok(root) = Url::parse(referer).and_then(|u| u.join("/")) {
        let origin = root.as_str().trim_end_matches('/');
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(ORIGIN, value);
        }
    }
    headers
}
