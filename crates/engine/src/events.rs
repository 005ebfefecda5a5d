use std::path::PathBuf;

/// Observable progress of one download invocation. Emitted on a bounded
/// channel as the pipeline advances; the sequence is finite and ends with
/// either `Completed` or the pipeline's error return.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Leaf playlist parsed; `segments` downloads are about to start.
    ManifestLoaded { segments: usize },
    /// Master playlist seen; the named rendition was picked.
    RenditionSelected { quality: String },
    /// One segment finished (successfully or not): `completed` of `total`
    /// attempts are done.
    SegmentFinished { completed: usize, total: usize },
    /// A transient failure put a segment back into the retry loop.
    SegmentRetry { index: usize, attempt: u32 },
    /// All segments staged; concatenation started.
    Assembling,
    /// Output file written.
    Completed { output: PathBuf, bytes: u64 },
}
