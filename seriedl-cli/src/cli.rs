use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    name = "seriedl",
    version,
    about = "Download series episodes from hosting pages or direct HLS playlists",
    long_about = "Resolves an episode page, a direct .m3u8 playlist URL or a base64-encoded\n\
                  playlist reference into a stream, downloads every segment and assembles\n\
                  them into a single video file.\n\
                  \n\
                  Examples:\n\
                  \n\
                  # Episode page, output name derived automatically (demo_S01E01.mp4):\n\
                  seriedl \"https://www.weekseries.info/series/demo/temporada-1/episodio-01\"\n\
                  \n\
                  # Direct playlist URL:\n\
                  seriedl \"https://cdn.example/demo/01/index.m3u8\" -o episode.mp4\n\
                  \n\
                  # Keep the raw transport stream, skip the ffmpeg remux:\n\
                  seriedl --no-convert \"https://...\""
)]
pub struct CliArgs {
    /// Episode page URL, direct playlist URL, or base64-encoded playlist URL
    #[arg(required = true, help = "Episode page URL, playlist URL or base64 token")]
    pub input: String,

    /// Output file path
    #[arg(
        short,
        long,
        help = "Output file (default: derived from the episode or stream URL)"
    )]
    pub output: Option<PathBuf>,

    /// Referer override
    #[arg(
        short,
        long,
        help = "Referer page URL presented to the CDN (default: the resolved episode page)"
    )]
    pub referer: Option<String>,

    /// Skip the MP4 remux step
    #[arg(long, help = "Keep the assembled .ts file, do not remux to MP4")]
    pub no_convert: bool,

    /// Simultaneous segment downloads
    #[arg(
        short,
        long,
        default_value = "3",
        help = "Number of segments downloaded in parallel"
    )]
    pub concurrency: usize,

    /// Per-segment download timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Timeout in seconds for a single segment attempt"
    )]
    pub segment_timeout: u64,

    /// Retry budget per segment
    #[arg(
        long,
        default_value = "3",
        help = "Extra attempts per segment after the first failure"
    )]
    pub retries: u32,

    /// Disable the progress bar
    #[arg(short, long, help = "Do not draw a progress bar")]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
