use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::codec;

static SCRIPT_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:src|url|stream|video)\s*[:=]\s*["']([A-Za-z0-9+/]{20,}={0,2})["']"#)
        .unwrap()
});

static DATA_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)data-[^=\s]*\s*=\s*["']([A-Za-z0-9+/]{20,}={0,2})["']"#).unwrap()
});

static QUOTED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([A-Za-z0-9+/]{40,}={0,2})["']"#).unwrap());

static BARE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9+/]{50,}={0,2})").unwrap());

struct ScrapeStrategy {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
}

/// Extraction strategies in priority order. Markup drift is handled by
/// appending new entries; existing ones keep their position and behavior.
static STRATEGIES: &[ScrapeStrategy] = &[
    ScrapeStrategy {
        name: "script-assignment",
        pattern: &SCRIPT_ASSIGNMENT,
    },
    ScrapeStrategy {
        name: "data-attribute",
        pattern: &DATA_ATTRIBUTE,
    },
    ScrapeStrategy {
        name: "quoted-token",
        pattern: &QUOTED_TOKEN,
    },
    ScrapeStrategy {
        name: "bare-token",
        pattern: &BARE_TOKEN,
    },
];

/// Scan raw page markup/script text for the obfuscated playlist token.
///
/// Strategies run in declaration order and the first candidate that decodes
/// to a plausible stream URL wins. `None` means the page held no
/// recognizable token, a normal outcome for drifted markup.
pub fn extract_token(page: &str) -> Option<String> {
    if page.is_empty() {
        return None;
    }

    for strategy in STRATEGIES {
        for caps in strategy.pattern.captures_iter(page) {
            let candidate = &caps[1];
            if decodes_to_stream_url(candidate) {
                debug!(
                    strategy = strategy.name,
                    token_len = candidate.len(),
                    "found stream token"
                );
                return Some(candidate.to_string());
            }
        }
    }

    warn!("no stream token found in page content");
    None
}

/// A token is only worth returning if it decodes to an http(s) URL that
/// points at stream media.
fn decodes_to_stream_url(token: &str) -> bool {
    if token.len() < 20 {
        return false;
    }
    let Some(decoded) = codec::decode(token) else {
        return false;
    };
    if !decoded.starts_with("http://") && !decoded.starts_with("https://") {
        return false;
    }
    let lower = decoded.to_ascii_lowercase();
    [".m3u8", "stream", "video", "http"]
        .iter()
        .any(|ind| lower.contains(ind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    const STREAM_URL: &str = "https://cdn.example/demo/01/index.m3u8";

    #[test]
    fn finds_token_in_script_assignment() {
        let token = encode(STREAM_URL);
        let page = format!(r#"<script>var player = {{ src: "{token}" }};</script>"#);
        assert_eq!(extract_token(&page).as_deref(), Some(token.as_str()));
    }

    #[test]
    fn finds_token_in_data_attribute() {
        let token = encode(STREAM_URL);
        let page = format!(r#"<div class="player" data-stream-source='{token}'></div>"#);
        assert_eq!(extract_token(&page).as_deref(), Some(token.as_str()));
    }

    #[test]
    fn finds_bare_token_in_obfuscated_script() {
        // long URL so the bare token crosses the 50-char floor
        let url = "https://cdn.example/content/the-good-doctor/02-temporada/16/stream.m3u8";
        let token = encode(url);
        let page = format!("window.atob;{token};play()");
        assert_eq!(extract_token(&page).as_deref(), Some(token.as_str()));
    }

    #[test]
    fn script_assignment_outranks_generic_matches() {
        let good = encode(STREAM_URL);
        let decoy = encode("https://cdn.example/another/stream/video.m3u8");
        // decoy appears first in the page but only as a quoted string; the
        // assignment strategy runs first and must win
        let page = format!(r#"<i>"{decoy}"</i><script>url = "{good}"</script>"#);
        assert_eq!(extract_token(&page).as_deref(), Some(good.as_str()));
    }

    #[test]
    fn rejects_candidates_that_do_not_decode_to_urls() {
        // valid base64, but decodes to plain text
        let noise = encode("just some body copy, nothing to play here today");
        let page = format!(r#"<script>src = "{noise}"</script>"#);
        assert_eq!(extract_token(&page), None);
    }

    #[test]
    fn empty_or_tokenless_page_is_none() {
        assert_eq!(extract_token(""), None);
        assert_eq!(extract_token("<html><body>hello</body></html>"), None);
    }
}
