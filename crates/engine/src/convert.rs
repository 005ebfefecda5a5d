use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::DownloadError;

/// Remuxes the assembled transport stream into an MP4 container by
/// invoking an external `ffmpeg` binary. The codec data is copied, not
/// re-encoded, so the step is fast and lossless.
pub struct MediaConverter {
    ffmpeg: String,
}

impl Default for MediaConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl MediaConverter {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Whether the configured ffmpeg binary can be spawned at all.
    pub async fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// `ffmpeg -y -i <input> -c copy <output>`. The input file is left in
    /// place; the caller decides when to delete it.
    pub async fn remux(&self, input: &Path, output: &Path) -> Result<(), DownloadError> {
        info!(input = %input.display(), output = %output.display(), "remuxing container");

        let result = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .args(["-c", "copy"])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DownloadError::Conversion(format!("could not run {}: {e}", self.ffmpeg)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let last_line = stderr.lines().last().unwrap_or("unknown error");
            warn!(status = ?result.status.code(), "ffmpeg failed");
            return Err(DownloadError::Conversion(format!(
                "ffmpeg exited with {}: {last_line}",
                result.status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unavailable_and_fails_remux() {
        let converter = MediaConverter::new("ffmpeg-definitely-not-installed");
        assert!(!converter.is_available().await);

        let err = converter
            .remux(Path::new("in.ts"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Conversion(_)));
    }
}
