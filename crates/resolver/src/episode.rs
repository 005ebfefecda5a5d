use crate::classify::HOSTING_PAGE_REGEX;

/// Episode metadata recovered from a hosting-page URL.
///
/// Extraction is opportunistic: a page URL that does not match the known
/// path pattern simply yields no `EpisodeRef`, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRef {
    pub series: String,
    pub season: u32,
    pub episode: u32,
    pub source_url: String,
}

impl EpisodeRef {
    /// Parse an episode reference out of a hosting-page URL.
    pub fn from_page_url(url: &str) -> Option<Self> {
        let caps = HOSTING_PAGE_REGEX.captures(url.trim())?;
        Some(Self {
            series: caps[1].to_string(),
            season: caps[2].parse().ok()?,
            episode: caps[3].parse().ok()?,
            source_url: url.trim().to_string(),
        })
    }

    /// Filesystem-safe stem, e.g. `the-good-doctor_S01E16`.
    pub fn filename_stem(&self) -> String {
        let safe: String = self
            .series
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c => c,
            })
            .collect();
        format!("{safe}_S{:02}E{:02}", self.season, self.episode)
    }
}

impl std::fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - S{:02}E{:02}",
            self.series, self.season, self.episode
        )
    }
}
