use regex::Regex;
use std::sync::LazyLock;

/// Episode page URL pattern: `/series/<slug>/temporada-<n>/episodio-<n>`,
/// any host. Capture groups: slug, season, episode.
pub static HOSTING_PAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?[^/\s]+/series/([^/]+)/temporada-(\d+)/episodio-(\d+)")
        .unwrap()
});

/// Canonical base64 alphabet with up to two trailing padding characters.
static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());

/// What a raw input string turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputClass {
    /// A hosting-site episode page that embeds an obfuscated playlist reference.
    HostingPage,
    /// A direct playlist URL, usable as-is.
    DirectManifest,
    /// A bare base64 token hiding a playlist URL.
    Encoded,
    /// Anything else.
    Unrecognized,
}

/// Classify a raw input string. Total: never fails, unknown shapes map to
/// [`InputClass::Unrecognized`]. First matching rule wins; a string that
/// satisfies both the direct-manifest and token rules is a manifest, since
/// an HTTP scheme can never be part of a valid token.
pub fn classify(input: &str) -> InputClass {
    let input = input.trim();
    if input.is_empty() {
        return InputClass::Unrecognized;
    }

    if HOSTING_PAGE_REGEX.is_match(input) {
        return InputClass::HostingPage;
    }

    if is_manifest_url(input) {
        return InputClass::DirectManifest;
    }

    if is_encoded_token(input) {
        return InputClass::Encoded;
    }

    InputClass::Unrecognized
}

/// HTTP(S) URL that either ends with the playlist extension or carries a
/// streaming keyword somewhere in it.
pub fn is_manifest_url(input: &str) -> bool {
    if !input.starts_with("http://") && !input.starts_with("https://") {
        return false;
    }
    input.ends_with(".m3u8") || input.to_ascii_lowercase().contains("stream")
}

fn is_encoded_token(input: &str) -> bool {
    input.len() >= 4 && TOKEN_REGEX.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_are_unrecognized() {
        assert_eq!(classify(""), InputClass::Unrecognized);
        assert_eq!(classify("   \t"), InputClass::Unrecognized);
    }

    #[test]
    fn hosting_page_urls() {
        assert_eq!(
            classify("https://www.weekseries.info/series/the-good-doctor/temporada-1/episodio-16"),
            InputClass::HostingPage
        );
        // host is not pinned
        assert_eq!(
            classify("https://example-host/series/demo/temporada-1/episodio-01"),
            InputClass::HostingPage
        );
        assert_eq!(
            classify("http://weekseries.info/series/dark/temporada-3/episodio-08"),
            InputClass::HostingPage
        );
    }

    #[test]
    fn page_pattern_requires_full_path_shape() {
        assert_eq!(
            classify("https://weekseries.info/series/dark"),
            InputClass::Unrecognized
        );
        assert_eq!(
            classify("https://weekseries.info/series/dark/temporada-3"),
            InputClass::Unrecognized
        );
    }

    #[test]
    fn direct_manifest_urls() {
        assert_eq!(
            classify("https://cdn.example/demo/01/index.m3u8"),
            InputClass::DirectManifest
        );
        assert_eq!(
            classify("https://series.vidmaniix.shop/T/the-good-doctor/02-temporada/16/stream.m3u8"),
            InputClass::DirectManifest
        );
        // keyword match without the extension
        assert_eq!(
            classify("https://cdn.example/live/STREAM/播放"),
            InputClass::DirectManifest
        );
    }

    #[test]
    fn encoded_tokens() {
        // "https://cdn.example/demo/01/index.m3u8"
        assert_eq!(
            classify("aHR0cHM6Ly9jZG4uZXhhbXBsZS9kZW1vLzAxL2luZGV4Lm0zdTg="),
            InputClass::Encoded
        );
        assert_eq!(classify("abc"), InputClass::Unrecognized); // too short
        assert_eq!(classify("abc!"), InputClass::Unrecognized); // bad alphabet
        assert_eq!(classify("===="), InputClass::Unrecognized); // padding only
    }

    #[test]
    fn scheme_beats_token_alphabet() {
        // no dots, no padding: this also matches the token alphabet if the
        // scheme punctuation is ignored, but the scheme must take priority
        let url = "https://host/streaming";
        assert!(is_manifest_url(url));
        assert_eq!(classify(url), InputClass::DirectManifest);
    }
}
