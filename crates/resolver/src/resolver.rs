use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{DEFAULT_TTL, ResolutionCache};
use crate::classify::{InputClass, classify};
use crate::codec;
use crate::episode::EpisodeRef;
use crate::error::ResolveError;
use crate::fetch::{FetchError, PageFetcher};
use crate::scrape;

/// A successfully resolved input: the playlist URL to download, the page
/// to present as Referer (hosting-page inputs only) and any episode
/// metadata recovered from the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub manifest_url: String,
    pub referer: Option<String>,
    pub episode: Option<EpisodeRef>,
}

/// Orchestrates classification, cache, page fetch, scraping and decoding
/// into a single resolution call.
///
/// The fetcher is injected as a capability trait so tests run against
/// canned pages; the cache is owned by the caller and shared across
/// resolutions.
pub struct UrlResolver {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<ResolutionCache>,
    ttl: Duration,
}

impl UrlResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cache: Arc<ResolutionCache>) -> Self {
        Self {
            fetcher,
            cache,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Resolve a raw input string into a playlist URL.
    ///
    /// Direct playlist URLs and bare tokens resolve locally and never touch
    /// the cache; hosting pages go through cache → fetch → scrape → decode,
    /// and the outcome (success or failure) is cached under the original
    /// input before returning.
    pub async fn resolve(&self, input: &str) -> Result<Resolved, ResolveError> {
        let input = input.trim();
        match classify(input) {
            InputClass::Unrecognized => Err(ResolveError::InvalidInput(input.to_string())),
            InputClass::DirectManifest => {
                debug!(url = input, "input is already a playlist URL");
                Ok(Resolved {
                    manifest_url: input.to_string(),
                    referer: None,
                    episode: None,
                })
            }
            InputClass::Encoded => {
                let manifest_url = codec::decode(input).ok_or(ResolveError::DecodeFailed)?;
                debug!(url = %manifest_url, "decoded playlist URL from token");
                Ok(Resolved {
                    manifest_url,
                    referer: None,
                    episode: None,
                })
            }
            InputClass::HostingPage => self.resolve_hosting_page(input).await,
        }
    }

    async fn resolve_hosting_page(&self, page_url: &str) -> Result<Resolved, ResolveError> {
        if let Some(outcome) = self.cache.get(page_url) {
            debug!(url = page_url, ok = outcome.is_ok(), "cache hit");
            return outcome;
        }

        let outcome = self.extract_from_page(page_url).await;
        self.cache.set(page_url, outcome.clone(), self.ttl);
        outcome
    }

    async fn extract_from_page(&self, page_url: &str) -> Result<Resolved, ResolveError> {
        let page = self
            .fetcher
            .fetch_page(page_url)
            .await
            .map_err(|e| match e {
                FetchError::NotFound => ResolveError::PageNotFound(page_url.to_string()),
                FetchError::Status(code) => ResolveError::PageUnreachable(format!("HTTP {code}")),
                FetchError::Network(detail) => ResolveError::PageUnreachable(detail),
            })?;

        let token = scrape::extract_token(&page).ok_or(ResolveError::TokenNotFound)?;
        let manifest_url = codec::decode(&token).ok_or(ResolveError::DecodeFailed)?;

        let episode = EpisodeRef::from_page_url(page_url);
        if let Some(ep) = &episode {
            info!(episode = %ep, "resolved episode page");
        }

        Ok(Resolved {
            manifest_url,
            referer: Some(page_url.to_string()),
            episode,
        })
    }
}
