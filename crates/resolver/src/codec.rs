use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// Decode a base64 token into the URL it hides.
///
/// Malformed padding, alphabet violations and non-UTF-8 payloads are all
/// expected shapes of bad input, so they come back as `None` rather than an
/// error type.
pub fn decode(token: &str) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let bytes = match STANDARD.decode(token) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, "token is not valid base64");
            return None;
        }
    };

    match String::from_utf8(bytes) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!(error = %e, "decoded token is not valid UTF-8");
            None
        }
    }
}

/// Inverse of [`decode`], kept for building test fixtures.
#[cfg(test)]
pub(crate) fn encode(url: &str) -> String {
    STANDARD.encode(url.as_bytes())
}
