use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::DownloadConfig;
use crate::error::DownloadError;
use crate::events::ProgressEvent;
use crate::fetch::{HttpSegmentFetcher, create_client};
use crate::manifest::{self, Manifest};
use crate::retriever::SegmentRetriever;
use crate::staging::StagingArea;

/// One retrieval invocation: where to pull from, where the result lands,
/// and the channels through which the caller observes and interrupts it.
pub struct DownloadRequest {
    pub manifest_url: String,
    /// Presented as Referer/Origin on playlist and segment requests.
    pub referer: Option<String>,
    pub output: PathBuf,
    /// Optional progress sink; a dropped receiver never stalls the pipeline.
    pub progress: Option<mpsc::Sender<ProgressEvent>>,
    /// Cancellation handle, checked between stages and at retry boundaries.
    pub cancel: CancellationToken,
}

impl DownloadRequest {
    pub fn new(manifest_url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            referer: None,
            output: output.into(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_progress(mut self, progress: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What a finished download produced.
#[derive(Debug, Clone)]
pub struct DownloadSummary {
    pub output: PathBuf,
    pub segments: usize,
    pub bytes: u64,
}

/// Retrieval pipeline: playlist → (rendition selection) → bounded segment
/// download into staging → ordered assembly.
pub struct HlsDownloader {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl HlsDownloader {
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub async fn download(&self, req: DownloadRequest) -> Result<DownloadSummary, DownloadError> {
        let fetcher = Arc::new(HttpSegmentFetcher::new(
            self.client.clone(),
            self.config.clone(),
            req.referer.as_deref(),
            req.progress.clone(),
        ));

        checkpoint(&req.cancel)?;
        let text = fetcher.fetch_playlist(&req.manifest_url).await?;
        let mut playlist_url = req.manifest_url.clone();
        let mut manifest = manifest::parse(&text, &playlist_url)?;

        if let Some(rendition) = manifest.first_rendition().cloned() {
            info!(quality = %rendition.quality, url = %rendition.url, "selected first declared rendition");
            emit(
                &req.progress,
                ProgressEvent::RenditionSelected {
                    quality: rendition.quality.clone(),
                },
            )
            .await;

            checkpoint(&req.cancel)?;
            let leaf_text = fetcher.fetch_playlist(&rendition.url).await?;
            playlist_url = rendition.url;
            manifest = manifest::parse(&leaf_text, &playlist_url)?;
        }

        let Manifest::Segments(segments) = manifest else {
            // a rendition index pointing at another rendition index
            return Err(DownloadError::Manifest(
                "selected rendition is itself a rendition index".into(),
            ));
        };
        debug!(segments = segments.len(), url = %playlist_url, "playlist resolved to segment list");
        emit(
            &req.progress,
            ProgressEvent::ManifestLoaded {
                segments: segments.len(),
            },
        )
        .await;

        let staging = StagingArea::for_output(&req.output);
        staging.create().await?;

        checkpoint(&req.cancel)?;
        let retriever = SegmentRetriever::new(
            fetcher,
            self.config.concurrency,
            req.progress.clone(),
        );
        let outcomes = retriever
            .fetch_all(&segments, &staging, &req.cancel)
            .await?;

        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.index)
            .collect();
        if !failed.is_empty() {
            // staged segments stay behind for inspection
            return Err(DownloadError::SegmentsFailed { failed });
        }

        checkpoint(&req.cancel)?;
        emit(&req.progress, ProgressEvent::Assembling).await;
        let bytes = staging.assemble(&req.output).await?;

        emit(
            &req.progress,
            ProgressEvent::Completed {
                output: req.output.clone(),
                bytes,
            },
        )
        .await;

        Ok(DownloadSummary {
            output: req.output,
            segments: segments.len(),
            bytes,
        })
    }
}

fn checkpoint(cancel: &CancellationToken) -> Result<(), DownloadError> {
    if cancel.is_cancelled() {
        Err(DownloadError::Cancelled)
    } else {
        Ok(())
    }
}

async fn emit(progress: &Option<mpsc::Sender<ProgressEvent>>, event: ProgressEvent) {
    if let Some(tx) = progress {
        let _ = tx.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_defaults() {
        let req = DownloadRequest::new("https://cdn.example/index.m3u8", "out.mp4");
        assert_eq!(req.referer, None);
        assert!(req.progress.is_none());
        assert!(!req.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_network_io() {
        let downloader = HlsDownloader::new(DownloadConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let req = DownloadRequest::new("https://cdn.invalid/index.m3u8", "out.mp4")
            .with_cancel(cancel);
        assert!(matches!(
            downloader.download(req).await,
            Err(DownloadError::Cancelled)
        ));
    }
}
