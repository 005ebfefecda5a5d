use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use seriedl_resolver::EpisodeRef;
use tracing::debug;
use url::Url;

static RESERVED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_+").unwrap());

const STREAM_INDICATORS: &[&str] = &[".m3u8", "stream", "playlist", "video", "media"];

/// Derive an output path, in priority order: the user's explicit choice,
/// the episode metadata, patterns in the stream URL, then a plain
/// `video.<ext>` fallback.
pub fn generate(
    stream_url: &str,
    episode: Option<&EpisodeRef>,
    user_output: Option<PathBuf>,
    extension: &str,
) -> PathBuf {
    if let Some(output) = user_output {
        return ensure_extension(output, extension);
    }

    if let Some(episode) = episode {
        let name = format!("{}{extension}", episode.filename_stem());
        debug!(name, "output name from episode metadata");
        return PathBuf::from(name);
    }

    if let Some(stem) = stem_from_url(stream_url) {
        debug!(stem, "output name from stream URL");
        return PathBuf::from(format!("{stem}{extension}"));
    }

    PathBuf::from(format!("video{extension}"))
}

fn ensure_extension(path: PathBuf, extension: &str) -> PathBuf {
    match path.extension() {
        Some(_) => path,
        None => {
            let mut name = path.into_os_string();
            name.push(extension);
            PathBuf::from(name)
        }
    }
}

/// Try the URL patterns the hosting CDNs actually use.
fn stem_from_url(url: &str) -> Option<String> {
    let lower = url.to_ascii_lowercase();
    if !STREAM_INDICATORS.iter().any(|ind| lower.contains(ind)) {
        return None;
    }

    season_path_stem(url, "temporada")
        .or_else(|| season_path_stem(url, "season"))
        .or_else(|| path_segment_stem(url))
        .or_else(|| domain_stem(url))
}

/// `/the-good-doctor/02-temporada/16/stream.m3u8` → `the_good_doctor_02_temporada_16`
fn season_path_stem(url: &str, marker: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();
    for (i, part) in parts.iter().enumerate() {
        if part.to_ascii_lowercase().contains(marker) && i > 0 && i + 1 < parts.len() {
            let series = clean_name(parts[i - 1]);
            let season = clean_name(part);
            let episode = clean_name(parts[i + 1]);
            if series.is_empty() {
                return None;
            }
            return Some(format!("{series}_{season}_{episode}"));
        }
    }
    None
}

/// Last meaningful path segments: `/content/stranger-things/04/index.m3u8`
/// → `stranger_things_04`
fn path_segment_stem(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 4 {
        return None;
    }
    let relevant: Vec<String> = parts[parts.len().saturating_sub(4)..parts.len() - 1]
        .iter()
        .filter(|p| {
            !p.is_empty()
                && !p.ends_with(".m3u8")
                && !p.ends_with(".ts")
                && !p.ends_with(".mp4")
                && **p != "stream"
        })
        .map(|p| clean_name(p))
        .filter(|p| !p.is_empty())
        .collect();

    if relevant.len() >= 2 {
        Some(relevant.join("_"))
    } else {
        None
    }
}

/// `https://example.com/simple/stream.m3u8` → `example_simple`
fn domain_stem(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let domain = parsed.host_str()?.split('.').next()?;
    let path_parts: Vec<String> = parsed
        .path()
        .split('/')
        .filter(|p| !p.is_empty() && !p.ends_with(".m3u8") && !p.ends_with(".ts"))
        .map(clean_name)
        .filter(|p| !p.is_empty())
        .collect();
    if path_parts.is_empty() {
        return None;
    }
    let tail = path_parts[path_parts.len().saturating_sub(2)..].join("_");
    Some(format!("{}_{tail}", clean_name(domain)))
}

/// Lowercase, reserved characters and separators collapsed to single
/// underscores.
fn clean_name(name: &str) -> String {
    let cleaned = RESERVED.replace_all(name, "_");
    let cleaned = cleaned.replace([' ', '-'], "_");
    let cleaned = UNDERSCORE_RUNS.replace_all(&cleaned, "_");
    cleaned.trim_matches('_').to_ascii_lowercase()
}
