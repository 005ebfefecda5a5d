//! # seriedl-engine
//!
//! Retrieval side of the pipeline: fetch an HLS playlist, pick a rendition
//! when the playlist is a master index, download every segment through a
//! bounded worker pool with per-segment retries, stage them on disk and
//! concatenate the staged pieces into one output file.
//!
//! The engine reports progress through an event channel and honors a
//! cancellation token between stages and at every retry boundary.

pub mod config;
pub mod convert;
pub mod download;
pub mod error;
pub mod events;
pub mod fetch;
pub mod manifest;
pub mod retriever;
pub mod staging;

pub use config::DownloadConfig;
pub use convert::MediaConverter;
pub use download::{DownloadRequest, DownloadSummary, HlsDownloader};
pub use error::DownloadError;
pub use events::ProgressEvent;
pub use fetch::{HttpSegmentFetcher, SegmentFetcher};
pub use manifest::{Manifest, Rendition, SegmentRef, parse};
pub use retriever::{SegmentOutcome, SegmentRetriever};
pub use staging::StagingArea;
