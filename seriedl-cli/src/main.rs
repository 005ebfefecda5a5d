use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod error;
mod filename;
mod progress;

use cli::CliArgs;
use error::AppError;
use progress::ProgressReporter;
use seriedl_engine::{
    DownloadConfig, DownloadRequest, HlsDownloader, MediaConverter,
};
use seriedl_resolver::{HttpPageFetcher, ResolutionCache, UrlResolver};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    // Resolution: classify the input and, for hosting pages, scrape and
    // decode the playlist reference.
    let cache = Arc::new(ResolutionCache::new());
    let resolver = UrlResolver::new(Arc::new(HttpPageFetcher::default()), cache);

    info!(input = %args.input, "resolving input");
    let resolved = resolver.resolve(&args.input).await?;
    if let Some(episode) = &resolved.episode {
        info!(%episode, "detected episode");
    }

    let referer = args.referer.clone().or(resolved.referer.clone());

    let extension = if args.no_convert { ".ts" } else { ".mp4" };
    let output = filename::generate(
        &resolved.manifest_url,
        resolved.episode.as_ref(),
        args.output.clone(),
        extension,
    );

    // Remux only applies to an MP4 target; anything else keeps the raw
    // transport stream. When remuxing, assemble to a .ts sibling first.
    let should_convert =
        !args.no_convert && output.extension().is_some_and(|ext| ext == "mp4");
    let assembled: PathBuf = if should_convert {
        output.with_extension("ts")
    } else {
        output.clone()
    };

    let config = DownloadConfig::default()
        .with_concurrency(args.concurrency)
        .with_max_retries(args.retries)
        .with_segment_timeout(Duration::from_secs(args.segment_timeout));
    let downloader = HlsDownloader::new(config)?;

    // Progress + ctrl-c wiring.
    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let reporter = ProgressReporter::new(!args.quiet);
    let reporter_task = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            reporter.handle(event);
        }
    });

    let cancel = CancellationToken::new();
    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling download");
            ctrlc_cancel.cancel();
        }
    });

    info!(url = %resolved.manifest_url, output = %assembled.display(), "starting download");
    let request = DownloadRequest::new(&resolved.manifest_url, &assembled)
        .with_referer(referer)
        .with_progress(progress_tx)
        .with_cancel(cancel);
    let summary = downloader.download(request).await?;
    let _ = reporter_task.await;

    info!(
        segments = summary.segments,
        bytes = summary.bytes,
        "assembly finished"
    );

    if should_convert {
        convert_to_mp4(&assembled, &output).await;
    }

    Ok(())
}

/// Remux the assembled transport stream to MP4, keeping the .ts whenever
/// anything goes wrong so no downloaded data is ever lost.
async fn convert_to_mp4(assembled: &Path, output: &Path) {
    let converter = MediaConverter::default();
    if !converter.is_available().await {
        warn!(
            "ffmpeg not found, keeping {}; convert manually with: ffmpeg -i {} -c copy {}",
            assembled.display(),
            assembled.display(),
            output.display()
        );
        return;
    }

    match converter.remux(assembled, output).await {
        Ok(()) => {
            if let Err(e) = tokio::fs::remove_file(assembled).await {
                warn!(error = %e, "could not remove intermediate {}", assembled.display());
            }
            info!(output = %output.display(), "conversion complete");
        }
        Err(e) => {
            warn!(error = %e, "conversion failed, keeping {}", assembled.display());
        }
    }
}
