use thiserror::Error;

/// Retrieval-pipeline failures.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("malformed playlist: {0}")]
    Manifest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {0}")]
    Status(u16),

    #[error("{} segment(s) failed after retries: {failed:?}", failed.len())]
    SegmentsFailed { failed: Vec<usize> },

    #[error("staging is missing segment indices {missing:?}")]
    IncompleteSegments { missing: Vec<usize> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("download cancelled")]
    Cancelled,
}
