use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DownloadError;
use crate::events::ProgressEvent;
use crate::fetch::SegmentFetcher;
use crate::manifest::SegmentRef;
use crate::staging::StagingArea;

/// Result of one segment attempt after its retry budget: bytes staged on
/// success, a human-readable detail on failure.
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub index: usize,
    pub result: Result<u64, String>,
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Downloads a fixed segment list through a bounded worker pool.
///
/// Segments complete in whatever order the network dictates; each success
/// is written straight to the staging area (memory stays bounded by the
/// pool size, not the stream length) and the outcome list handed back is
/// re-sorted by sequence index. A failed segment never aborts the batch;
/// cancellation does.
pub struct SegmentRetriever {
    fetcher: Arc<dyn SegmentFetcher>,
    concurrency: usize,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl SegmentRetriever {
    pub fn new(
        fetcher: Arc<dyn SegmentFetcher>,
        concurrency: usize,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
            progress,
        }
    }

    pub async fn fetch_all(
        &self,
        segments: &[SegmentRef],
        staging: &StagingArea,
        cancel: &CancellationToken,
    ) -> Result<Vec<SegmentOutcome>, DownloadError> {
        let total = segments.len();
        let completed = AtomicUsize::new(0);

        let mut stream = futures::stream::iter(segments.iter().cloned())
            .map(|segment| {
                let fetcher = Arc::clone(&self.fetcher);
                let staging = staging.clone();
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return Err(DownloadError::Cancelled);
                    }
                    match fetcher.fetch_segment(&segment, &cancel).await {
                        Ok(bytes) => {
                            let result = staging
                                .write_segment(segment.index, bytes)
                                .await
                                .map_err(|e| e.to_string());
                            Ok(SegmentOutcome {
                                index: segment.index,
                                result,
                            })
                        }
                        Err(DownloadError::Cancelled) => Err(DownloadError::Cancelled),
                        Err(e) => Ok(SegmentOutcome {
                            index: segment.index,
                            result: Err(e.to_string()),
                        }),
                    }
                }
            })
            .buffer_unordered(self.concurrency);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = stream.next().await {
            let outcome = outcome?;
            if let Err(detail) = &outcome.result {
                warn!(index = outcome.index, detail = %detail, "segment failed permanently");
            }
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = &self.progress {
                let _ = progress
                    .send(ProgressEvent::SegmentFinished {
                        completed: done,
                        total,
                    })
                    .await;
            }
            outcomes.push(outcome);
        }

        // completion order is the network's business; assembly order is ours
        outcomes.sort_by_key(|o| o.index);
        debug!(
            total,
            failed = outcomes.iter().filter(|o| !o.is_success()).count(),
            "segment batch finished"
        );
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Serves `segment-<index>` bytes, with per-index artificial delays and
    /// failures.
    struct FakeFetcher {
        fail: HashSet<usize>,
        /// later indices finish first, exercising out-of-order completion
        reverse_delays: bool,
    }

    impl FakeFetcher {
        fn ok() -> Self {
            Self {
                fail: HashSet::new(),
                reverse_delays: false,
            }
        }

        fn failing(indices: impl IntoIterator<Item = usize>) -> Self {
            Self {
                fail: indices.into_iter().collect(),
                reverse_delays: false,
            }
        }
    }

    #[async_trait]
    impl SegmentFetcher for FakeFetcher {
        async fn fetch_segment(
            &self,
            segment: &SegmentRef,
            _cancel: &CancellationToken,
        ) -> Result<Bytes, DownloadError> {
            if self.reverse_delays {
                let delay = 30_u64.saturating_sub(segment.index as u64 * 10);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail.contains(&segment.index) {
                return Err(DownloadError::Status(500));
            }
            Ok(Bytes::from(format!("segment-{}", segment.index)))
        }
    }

    struct CancellingFetcher;

    #[async_trait]
    impl SegmentFetcher for CancellingFetcher {
        async fn fetch_segment(
            &self,
            _segment: &SegmentRef,
            _cancel: &CancellationToken,
        ) -> Result<Bytes, DownloadError> {
            Err(DownloadError::Cancelled)
        }
    }

    fn segment_list(n: usize) -> Vec<SegmentRef> {
        (0..n)
            .map(|index| SegmentRef {
                url: format!("https://cdn.example/seg{index}.ts"),
                index,
            })
            .collect()
    }

    async fn staging(tmp: &tempfile::TempDir) -> (StagingArea, std::path::PathBuf) {
        let output = tmp.path().join("out.mp4");
        let staging = StagingArea::for_output(&output);
        staging.create().await.unwrap();
        (staging, output)
    }

    #[tokio::test]
    async fn outcomes_come_back_sorted_by_index() {
        let tmp = tempfile::tempdir().unwrap();
        let (area, _) = staging(&tmp).await;
        let fetcher = FakeFetcher {
            reverse_delays: true,
            ..FakeFetcher::ok()
        };
        let retriever = SegmentRetriever::new(Arc::new(fetcher), 4, None);

        let outcomes = retriever
            .fetch_all(&segment_list(4), &area, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            outcomes.iter().map(|o| o.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(outcomes.iter().all(|o| o.is_success()));
    }

    #[tokio::test]
    async fn assembled_bytes_are_independent_of_completion_order() {
        let cancel = CancellationToken::new();
        let mut assembled = Vec::new();

        for reverse in [false, true] {
            let tmp = tempfile::tempdir().unwrap();
            let (area, output) = staging(&tmp).await;
            let fetcher = FakeFetcher {
                reverse_delays: reverse,
                ..FakeFetcher::ok()
            };
            let retriever = SegmentRetriever::new(Arc::new(fetcher), 3, None);
            retriever
                .fetch_all(&segment_list(3), &area, &cancel)
                .await
                .unwrap();
            area.assemble(&output).await.unwrap();
            assembled.push(std::fs::read(&output).unwrap());
        }

        assert_eq!(assembled[0], assembled[1]);
        assert_eq!(assembled[0], b"segment-0segment-1segment-2");
    }

    #[tokio::test]
    async fn failed_segments_are_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let (area, _) = staging(&tmp).await;
        let retriever = SegmentRetriever::new(Arc::new(FakeFetcher::failing([1, 3])), 2, None);

        let outcomes = retriever
            .fetch_all(&segment_list(5), &area, &CancellationToken::new())
            .await
            .unwrap();

        let failed: Vec<usize> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.index)
            .collect();
        assert_eq!(failed, vec![1, 3]);
        // the rest still made it to staging
        assert!(area.dir().join("segment_00000.ts").exists());
        assert!(area.dir().join("segment_00004.ts").exists());
        assert!(!area.dir().join("segment_00001.ts").exists());
    }

    #[tokio::test]
    async fn cancellation_aborts_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let (area, _) = staging(&tmp).await;
        let retriever = SegmentRetriever::new(Arc::new(CancellingFetcher), 2, None);

        assert!(matches!(
            retriever
                .fetch_all(&segment_list(3), &area, &CancellationToken::new())
                .await,
            Err(DownloadError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn progress_reports_every_completion() {
        let tmp = tempfile::tempdir().unwrap();
        let (area, _) = staging(&tmp).await;
        let (tx, mut rx) = mpsc::channel(16);
        let retriever = SegmentRetriever::new(Arc::new(FakeFetcher::ok()), 2, Some(tx));

        retriever
            .fetch_all(&segment_list(3), &area, &CancellationToken::new())
            .await
            .unwrap();

        let mut finishes = 0;
        while let Ok(event) = rx.try_recv() {
            if let ProgressEvent::SegmentFinished { completed, total } = event {
                finishes += 1;
                assert!(completed <= total);
                assert_eq!(total, 3);
            }
        }
        assert_eq!(finishes, 3);
    }
}
