use m3u8_rs::Playlist;
use tracing::debug;
use url::Url;

use crate::error::DownloadError;

/// One quality variant advertised by a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    pub quality: String,
    pub url: String,
}

/// One media segment, with its URL already made absolute and its position
/// in the playlist. The index defines final assembly order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRef {
    pub url: String,
    pub index: usize,
}

/// A parsed playlist: either an index of renditions (master) or the flat
/// segment list of a single rendition. The two cases are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    Renditions(Vec<Rendition>),
    Segments(Vec<SegmentRef>),
}

impl Manifest {
    /// Selection policy for master playlists: the first declared rendition.
    /// Deterministic and cheap; declaration order is the origin's choice,
    /// not necessarily a quality ranking.
    pub fn first_rendition(&self) -> Option<&Rendition> {
        match self {
            Manifest::Renditions(renditions) => renditions.first(),
            Manifest::Segments(_) => None,
        }
    }
}

/// Parse playlist text, resolving every URI against `base_url` (the
/// playlist's own URL). Relative references never leak past this point.
pub fn parse(text: &str, base_url: &str) -> Result<Manifest, DownloadError> {
    let base = Url::parse(base_url)
        .map_err(|e| DownloadError::InvalidUrl(format!("bad playlist base {base_url}: {e}")))?;

    if !text.contains("#EXTM3U") {
        return Err(DownloadError::Manifest("missing #EXTM3U header".into()));
    }

    let playlist = m3u8_rs::parse_playlist_res(text.as_bytes())
        .map_err(|e| DownloadError::Manifest(format!("unparseable playlist: {e}")))?;

    match playlist {
        Playlist::MasterPlaylist(master) => {
            if master.variants.is_empty() {
                return Err(DownloadError::Manifest(
                    "master playlist declares no renditions".into(),
                ));
            }
            let renditions = master
                .variants
                .iter()
                .map(|variant| {
                    let url = absolutize(&base, &variant.uri)?;
                    Ok(Rendition {
                        quality: quality_label(variant),
                        url,
                    })
                })
                .collect::<Result<Vec<_>, DownloadError>>()?;
            debug!(count = renditions.len(), "parsed master playlist");
            Ok(Manifest::Renditions(renditions))
        }
        Playlist::MediaPlaylist(media) => {
            if media.segments.is_empty() {
                return Err(DownloadError::Manifest(
                    "playlist declares no segments".into(),
                ));
            }
            let segments = media
                .segments
                .iter()
                .enumerate()
                .map(|(index, segment)| {
                    let url = absolutize(&base, &segment.uri)?;
                    Ok(SegmentRef { url, index })
                })
                .collect::<Result<Vec<_>, DownloadError>>()?;
            debug!(count = segments.len(), "parsed media playlist");
            Ok(Manifest::Segments(segments))
        }
    }
}

fn absolutize(base: &Url, uri: &str) -> Result<String, DownloadError> {
    base.join(uri)
        .map(|u| u.to_string())
        .map_err(|e| DownloadError::InvalidUrl(format!("cannot resolve {uri} against {base}: {e}")))
}

fn quality_label(variant: &m3u8_rs::VariantStream) -> String {
    match &variant.resolution {
        Some(r) => format!("{}x{}", r.width, r.height),
        None => format!("{}bps", variant.bandwidth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example/demo/01/index.m3u8";

    #[test]
    fn media_playlist_yields_indexed_absolute_segments() {
        let text = "#EXTM3U\n\
                    #EXT-X-TARGETDURATION:10\n\
                    #EXTINF:10.0,\nseg0.ts\n\
                    #EXTINF:10.0,\nseg1.ts\n\
                    #EXTINF:10.0,\nseg2.ts\n\
                    #EXT-X-ENDLIST\n";
        let Manifest::Segments(segments) = parse(text, BASE).unwrap() else {
            panic!("expected a segment list");
        };
        assert_eq!(segments.len(), 3);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index, i);
            assert_eq!(
                segment.url,
                format!("https://cdn.example/demo/01/seg{i}.ts")
            );
        }
    }

    #[test]
    fn absolute_segment_uris_pass_through() {
        let text = "#EXTM3U\n#EXTINF:4.0,\nhttps://other.example/a.ts\n#EXT-X-ENDLIST\n";
        let Manifest::Segments(segments) = parse(text, BASE).unwrap() else {
            panic!("expected a segment list");
        };
        assert_eq!(segments[0].url, "https://other.example/a.ts");
    }

    #[test]
    fn master_playlist_yields_renditions_in_declaration_order() {
        let text = "#EXTM3U\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360\nlow/index.m3u8\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1920x1080\nhigh/index.m3u8\n";
        let manifest = parse(text, BASE).unwrap();
        let Manifest::Renditions(renditions) = &manifest else {
            panic!("expected renditions");
        };
        assert_eq!(renditions.len(), 2);
        assert_eq!(renditions[0].quality, "640x360");
        assert_eq!(renditions[0].url, "https://cdn.example/demo/01/low/index.m3u8");

        // explicit policy: first declared wins, whatever its quality
        assert_eq!(manifest.first_rendition().unwrap(), &renditions[0]);
    }

    #[test]
    fn rendition_without_resolution_is_labelled_by_bandwidth() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=64000\naudio/index.m3u8\n";
        let Manifest::Renditions(renditions) = parse(text, BASE).unwrap() else {
            panic!("expected renditions");
        };
        assert_eq!(renditions[0].quality, "64000bps");
    }

    #[test]
    fn directiveless_text_is_malformed() {
        assert!(matches!(
            parse("not a playlist at all", BASE),
            Err(DownloadError::Manifest(_))
        ));
    }

    #[test]
    fn empty_media_playlist_is_malformed() {
        let text = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n#EXT-X-ENDLIST\n";
        assert!(matches!(
            parse(text, BASE),
            Err(DownloadError::Manifest(_))
        ));
    }

    #[test]
    fn segments_never_coexist_with_renditions() {
        let text = "#EXTM3U\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=800000\nlow/index.m3u8\n";
        match parse(text, BASE).unwrap() {
            Manifest::Renditions(r) => assert_eq!(r.len(), 1),
            Manifest::Segments(_) => panic!("master playlist parsed as segments"),
        }
    }
}
