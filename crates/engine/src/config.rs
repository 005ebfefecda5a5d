use std::time::Duration;

use reqwest::header::HeaderMap;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Tunables for the retrieval pipeline. Every network call carries its own
/// timeout; a timed-out attempt counts as a transient failure and goes
/// through the same retry budget as a connection error.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Simultaneous segment downloads. A fixed worker budget, never
    /// one task per segment.
    pub concurrency: usize,

    /// Extra attempts per segment after the first failure.
    pub max_retries: u32,

    /// Base delay for exponential backoff between segment attempts.
    pub retry_delay: Duration,

    /// Per-attempt timeout for one segment download.
    pub segment_timeout: Duration,

    /// Timeout for fetching playlist documents.
    pub playlist_timeout: Duration,

    /// Time allowed for establishing a connection.
    pub connect_timeout: Duration,

    /// User agent presented on every request.
    pub user_agent: String,

    /// Additional headers applied to every request (Referer/Origin are set
    /// per download from the request's referer).
    pub headers: HeaderMap,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            segment_timeout: Duration::from_secs(10),
            playlist_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: HeaderMap::new(),
        }
    }
}

impl DownloadConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_segment_timeout(mut self, timeout: Duration) -> Self {
        self.segment_timeout = timeout;
        self
    }
}
