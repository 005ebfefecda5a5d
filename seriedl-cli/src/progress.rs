use indicatif::{ProgressBar, ProgressStyle};
use seriedl_engine::ProgressEvent;
use tracing::{debug, info, warn};

fn segment_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} segments")
        .unwrap()
        .progress_chars("=> ")
}

/// Renders engine progress events as an indicatif bar. When disabled
/// (quiet mode or no TTY) events still land in the log.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            bar: enabled.then(ProgressBar::no_length),
        }
    }

    pub fn handle(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RenditionSelected { quality } => {
                info!(quality, "selected rendition");
            }
            ProgressEvent::ManifestLoaded { segments } => {
                info!(segments, "playlist loaded");
                if let Some(bar) = &self.bar {
                    bar.set_style(segment_style());
                    bar.set_length(segments as u64);
                    bar.set_message("downloading segments");
                }
            }
            ProgressEvent::SegmentFinished { completed, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(completed as u64);
                }
            }
            ProgressEvent::SegmentRetry { index, attempt } => {
                warn!(index, attempt, "retrying segment");
            }
            ProgressEvent::Assembling => {
                if let Some(bar) = &self.bar {
                    bar.set_message("assembling output");
                }
                debug!("assembling output");
            }
            ProgressEvent::Completed { output, bytes } => {
                if let Some(bar) = &self.bar {
                    bar.finish_with_message(format!("saved {}", output.display()));
                }
                info!(output = %output.display(), bytes, "download complete");
            }
        }
    }
}
