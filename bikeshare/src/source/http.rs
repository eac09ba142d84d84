//! Live GBFS feeds over HTTP.
//!
//! Feeds are located either through the operator's discovery document
//! (`gbfs.json`), or by appending `<feed>.json` to a base URL. Resolved
//! discovery maps are cached so that a refresh costs one request per feed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use reqwest::blocking::Client;

use crate::error::{BikeshareError, Result};
use crate::feed::{Discovery, FeedKind};
use crate::fetch::FeedSource;

/// Bay Wheels (San Francisco Bay Area) GBFS 2.3 discovery document.
pub const BAY_WHEELS_GBFS_URL: &str = "https://gbfs.baywheels.com/gbfs/2.3/gbfs.json";

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// How long a resolved discovery document is reused.
const DISCOVERY_TTL_SECS: u64 = 3600;

/// Where the feed documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocator {
    /// A GBFS discovery document listing feed URLs per language.
    Discovery { url: String, language: String },
    /// Feeds are served at `<base>/<feed>.json`.
    BaseUrl(String),
}

/// Configuration for [`HttpFeedSource`].
#[derive(Debug, Clone)]
pub struct HttpFeedConfig {
    pub locator: FeedLocator,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of retry attempts per document.
    pub max_retries: u32,
    /// How long discovered feed URLs are cached, in seconds.
    pub discovery_ttl_secs: u64,
}

impl Default for HttpFeedConfig {
    fn default() -> Self {
        Self::bay_wheels()
    }
}

impl HttpFeedConfig {
    /// Locate feeds through a GBFS discovery document, English feed list.
    pub fn with_discovery_url(url: impl Into<String>) -> Self {
        Self {
            locator: FeedLocator::Discovery {
                url: url.into(),
                language: "en".to_string(),
            },
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 2,
            discovery_ttl_secs: DISCOVERY_TTL_SECS,
        }
    }

    /// Fetch feeds from `<base>/<feed>.json` without discovery.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use bikeshare::source::HttpFeedConfig;
    ///
    /// let config = HttpFeedConfig::with_base_url("https://gbfs.example.com/gbfs/en");
    /// // Fetches https://gbfs.example.com/gbfs/en/station_status.json
    /// ```
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            locator: FeedLocator::BaseUrl(base_url.into()),
            ..Self::with_discovery_url(BAY_WHEELS_GBFS_URL)
        }
    }

    /// Bay Wheels, the San Francisco Bay Area system.
    pub fn bay_wheels() -> Self {
        Self::with_discovery_url(BAY_WHEELS_GBFS_URL)
    }

    /// Select the discovery language key. Ignored for base URLs.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        if let FeedLocator::Discovery { language: lang, .. } = &mut self.locator {
            *lang = language.into();
        }
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Fetches GBFS documents with a blocking HTTP client.
pub struct HttpFeedSource {
    client: Client,
    config: HttpFeedConfig,
    /// Discovery URL to resolved `feed name -> URL` map.
    discovery: Cache<String, Arc<BTreeMap<String, String>>>,
}

impl HttpFeedSource {
    /// Create a new source with the given configuration.
    pub fn new(config: HttpFeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bikeshare/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BikeshareError::FetchFailed {
                feed: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        let discovery = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(config.discovery_ttl_secs))
            .build();
        Ok(Self {
            client,
            config,
            discovery,
        })
    }

    pub fn config(&self) -> &HttpFeedConfig {
        &self.config
    }

    /// Resolve the URL of one feed.
    fn feed_url(&self, kind: FeedKind) -> Result<String> {
        match &self.config.locator {
            FeedLocator::BaseUrl(base) => Ok(base_feed_url(base, kind)),
            FeedLocator::Discovery { url, language } => {
                let urls = self.discover(url, language)?;
                lookup_feed(&urls, kind)
            }
        }
    }

    fn discover(&self, url: &str, language: &str) -> Result<Arc<BTreeMap<String, String>>> {
        self.discovery
            .try_get_with(url.to_string(), || {
                let body = self.get_with_retries(url, "gbfs")?;
                let discovery: Discovery =
                    serde_json::from_slice(&body).map_err(|source| BikeshareError::Parse {
                        feed: "gbfs".to_string(),
                        source,
                    })?;
                let urls = discovery.data.feed_urls(language);
                tracing::debug!(url, feeds = urls.len(), "Resolved GBFS discovery document");
                Ok::<_, BikeshareError>(Arc::new(urls))
            })
            .map_err(|e| BikeshareError::FetchFailed {
                feed: "gbfs".to_string(),
                reason: e.to_string(),
            })
    }

    /// GET `url`, retrying with a growing delay.
    fn get_with_retries(&self, url: &str, feed: &str) -> Result<Vec<u8>> {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(250 * attempt as u64));
            }

            match self.get(url, feed) {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::debug!(url, attempt, error = %e, "Feed request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| BikeshareError::FetchFailed {
            feed: feed.to_string(),
            reason: "Unknown error".to_string(),
        }))
    }

    fn get(&self, url: &str, feed: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(BikeshareError::FetchFailed {
                feed: feed.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl FeedSource for HttpFeedSource {
    fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
        let url = self.feed_url(kind)?;
        self.get_with_retries(&url, kind.name())
    }

    fn describe(&self) -> String {
        match &self.config.locator {
            FeedLocator::Discovery { url, .. } => url.clone(),
            FeedLocator::BaseUrl(base) => base.clone(),
        }
    }
}

fn base_feed_url(base: &str, kind: FeedKind) -> String {
    format!("{}/{}.json", base.trim_end_matches('/'), kind.name())
}

/// Find a feed in a discovery map by its name or one of its aliases.
fn lookup_feed(urls: &BTreeMap<String, String>, kind: FeedKind) -> Result<String> {
    std::iter::once(kind.name())
        .chain(kind.aliases().iter().copied())
        .find_map(|name| urls.get(name).cloned())
        .ok_or_else(|| BikeshareError::FeedNotFound {
            feed: kind.name().to_string(),
        })
}
