use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Resolve(#[from] seriedl_resolver::ResolveError),

    #[error("{0}")]
    Download(#[from] seriedl_engine::DownloadError),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
