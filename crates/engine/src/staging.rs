use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::DownloadError;

/// On-disk holding area for downloaded segments.
///
/// Lives next to the output file as `.tmp_<stem>`, so an orphaned staging
/// dir after a crash is easy to attribute. One staging area belongs to
/// exactly one in-flight download; callers must not share it.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Staging directory for a given output path: a sibling named after
    /// the output's stem.
    pub fn for_output(output: &Path) -> Self {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let dir = output
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(format!(".tmp_{stem}"));
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn create(&self) -> Result<(), DownloadError> {
        fs::create_dir_all(&self.dir).await?;
        debug!(dir = %self.dir.display(), "staging directory ready");
        Ok(())
    }

    fn segment_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("segment_{index:05}.ts"))
    }

    /// Persist one segment keyed by its sequence index. Returns the byte
    /// count written.
    pub async fn write_segment(&self, index: usize, data: Bytes) -> Result<u64, DownloadError> {
        let path = self.segment_path(index);
        fs::write(&path, &data).await?;
        Ok(data.len() as u64)
    }

    /// Indices currently staged, with their file paths, ordered.
    async fn staged(&self) -> Result<BTreeMap<usize, PathBuf>, DownloadError> {
        let mut staged = BTreeMap::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(index) = name
                .strip_prefix("segment_")
                .and_then(|rest| rest.strip_suffix(".ts"))
                .and_then(|digits| digits.parse::<usize>().ok())
            {
                staged.insert(index, entry.path());
            }
        }
        Ok(staged)
    }

    /// Concatenate every staged segment, strictly ascending by index, into
    /// `output`. The contiguous range `0..=max` must be fully present;
    /// otherwise fails with the missing indices and leaves the staging
    /// directory in place for inspection. On success the staging
    /// directory is removed.
    pub async fn assemble(&self, output: &Path) -> Result<u64, DownloadError> {
        let staged = self.staged().await?;

        let Some((&max, _)) = staged.last_key_value() else {
            return Err(DownloadError::IncompleteSegments { missing: vec![0] });
        };
        let missing: Vec<usize> = (0..=max).filter(|i| !staged.contains_key(i)).collect();
        if !missing.is_empty() {
            warn!(?missing, "refusing to assemble an incomplete segment set");
            return Err(DownloadError::IncompleteSegments { missing });
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut out = fs::File::create(output).await?;
        let mut total: u64 = 0;
        for (_, path) in &staged {
            let data = fs::read(path).await?;
            out.write_all(&data).await?;
            total += data.len() as u64;
        }
        out.flush().await?;

        self.remove().await;
        info!(output = %output.display(), bytes = total, segments = staged.len(), "assembled output");
        Ok(total)
    }

    /// Best-effort removal; staging leftovers are a diagnosis aid, not an
    /// error source.
    pub async fn remove(&self) {
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "could not remove staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staging_in(dir: &Path) -> (StagingArea, PathBuf) {
        let output = dir.join("episode.mp4");
        (StagingArea::for_output(&output), output)
    }

    #[test]
    fn staging_dir_is_sibling_named_after_stem() {
        let staging = StagingArea::for_output(Path::new("/downloads/demo_S01E01.mp4"));
        assert_eq!(
            staging.dir(),
            Path::new("/downloads/.tmp_demo_S01E01")
        );
    }

    #[tokio::test]
    async fn assembles_segments_in_index_order_regardless_of_write_order() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, output) = staging_in(tmp.path());
        staging.create().await.unwrap();

        // written out of order, as a concurrent retriever would
        staging.write_segment(2, Bytes::from_static(b"cc")).await.unwrap();
        staging.write_segment(0, Bytes::from_static(b"aa")).await.unwrap();
        staging.write_segment(1, Bytes::from_static(b"bb")).await.unwrap();

        let bytes = staging.assemble(&output).await.unwrap();
        assert_eq!(bytes, 6);
        assert_eq!(std::fs::read(&output).unwrap(), b"aabbcc");
        // staging removed on success
        assert!(!staging.dir().exists());
    }

    #[tokio::test]
    async fn missing_index_aborts_assembly_and_preserves_staging() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, output) = staging_in(tmp.path());
        staging.create().await.unwrap();

        staging.write_segment(0, Bytes::from_static(b"aa")).await.unwrap();
        staging.write_segment(2, Bytes::from_static(b"cc")).await.unwrap();

        match staging.assemble(&output).await {
            Err(DownloadError::IncompleteSegments { missing }) => {
                assert_eq!(missing, vec![1]);
            }
            other => panic!("expected IncompleteSegments, got {other:?}"),
        }
        assert!(!output.exists());
        assert!(staging.dir().exists());
    }

    #[tokio::test]
    async fn empty_staging_is_incomplete() {
        let tmp = tempfile::tempdir().unwrap();
        let (staging, output) = staging_in(tmp.path());
        staging.create().await.unwrap();

        assert!(matches!(
            staging.assemble(&output).await,
            Err(DownloadError::IncompleteSegments { .. })
        ));
    }
}
