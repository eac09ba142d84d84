//! Concrete [`FeedSource`] implementations.
//!
//! - [`StaticFeedSource`]: documents held in memory
//! - [`DirFeedSource`]: `<dir>/<feed>.json` files, for offline replay
//! - [`HttpFeedSource`]: live GBFS feeds over HTTP (requires the `http` feature)

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BikeshareError, Result};
use crate::feed::FeedKind;
use crate::fetch::FeedSource;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{FeedLocator, HttpFeedConfig, HttpFeedSource, BAY_WHEELS_GBFS_URL};

/// Documents held in memory.
///
/// Counts how many times it has been asked for a document, which makes it
/// handy for checking that a query did or did not reach upstream.
#[derive(Debug, Default)]
pub struct StaticFeedSource {
    documents: HashMap<FeedKind, Vec<u8>>,
    fetches: AtomicU64,
}

impl StaticFeedSource {
    /// Create a source from the three documents of one snapshot.
    pub fn new(
        station_information: impl Into<Vec<u8>>,
        station_status: impl Into<Vec<u8>>,
        free_bike_status: impl Into<Vec<u8>>,
    ) -> Self {
        Self::default()
            .with(FeedKind::StationInformation, station_information)
            .with(FeedKind::StationStatus, station_status)
            .with(FeedKind::FreeBikeStatus, free_bike_status)
    }

    /// Set or replace one document.
    pub fn with(mut self, kind: FeedKind, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(kind, body.into());
        self
    }

    /// Number of documents served so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl FeedSource for StaticFeedSource {
    fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.documents
            .get(&kind)
            .cloned()
            .ok_or_else(|| BikeshareError::FeedNotFound {
                feed: kind.name().to_string(),
            })
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Reads `<dir>/<feed>.json`, falling back to the feed's alternative names.
#[derive(Debug, Clone)]
pub struct DirFeedSource {
    dir: PathBuf,
}

impl DirFeedSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Get the directory documents are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FeedSource for DirFeedSource {
    fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
        let names = std::iter::once(kind.name()).chain(kind.aliases().iter().copied());
        for name in names {
            let path = self.dir.join(format!("{name}.json"));
            match fs::read(&path) {
                Ok(body) => return Ok(body),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(BikeshareError::FetchFailed {
                        feed: kind.name().to_string(),
                        reason: format!("{}: {}", path.display(), e),
                    })
                }
            }
        }
        Err(BikeshareError::FetchFailed {
            feed: kind.name().to_string(),
            reason: format!("no {}.json in {}", kind.name(), self.dir.display()),
        })
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.dir.display())
    }
}
