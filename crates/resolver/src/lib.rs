//! # seriedl-resolver
//!
//! Turns a user-supplied reference into a playable stream URL.
//!
//! Three kinds of input are understood:
//!
//! - a hosting-site episode page, which embeds a base64-obfuscated
//!   reference to the real media playlist,
//! - a direct playlist URL, passed through untouched,
//! - a bare base64 token, decoded in place.
//!
//! Hosting pages are fetched, scraped with an ordered list of extraction
//! strategies and decoded; outcomes (successes and failures alike) are
//! kept in a TTL cache so repeated lookups of the same page stay off the
//! network.

pub mod cache;
pub mod classify;
pub mod codec;
pub mod episode;
pub mod error;
pub mod fetch;
pub mod resolver;
pub mod scrape;

pub use cache::{CacheStats, ResolutionCache};
pub use classify::{InputClass, classify};
pub use episode::EpisodeRef;
pub use error::ResolveError;
pub use fetch::{FetchError, HttpPageFetcher, PageFetcher, default_client};
pub use resolver::{Resolved, UrlResolver};
