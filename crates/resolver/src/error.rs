use thiserror::Error;

/// Resolution failures, one variant per pipeline stage.
///
/// The enum is `Clone` because outcomes (including failures) are stored in
/// the [`crate::ResolutionCache`] and replayed verbatim until they expire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unrecognized input: {0}")]
    InvalidInput(String),
    #[error("episode page not found (404): {0}")]
    PageNotFound(String),
    #[error("failed to fetch episode page: {0}")]
    PageUnreachable(String),
    #[error("no stream token found in page, the site layout may have changed")]
    TokenNotFound,
    #[error("failed to decode stream token")]
    DecodeFailed,
}
