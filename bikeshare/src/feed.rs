//! GBFS wire documents.
//!
//! These types mirror the JSON published by bikeshare operators closely and
//! make no promises about validity. Record lists are parsed leniently: a
//! record that does not match the expected shape is counted and skipped, so
//! one bad entry never makes a whole document unusable.
//!
//! Both GBFS 2.x (`free_bike_status`, `bike_id`) and the 3.x renames
//! (`vehicle_status`, `vehicle_id`, `vehicles`) are accepted.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{BikeshareError, Result};

/// The upstream documents needed to build a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    StationInformation,
    StationStatus,
    FreeBikeStatus,
}

impl FeedKind {
    /// All feeds fetched on every refresh.
    pub const ALL: [FeedKind; 3] = [
        FeedKind::StationInformation,
        FeedKind::StationStatus,
        FeedKind::FreeBikeStatus,
    ];

    /// Feed name as listed in the GBFS discovery document.
    pub fn name(&self) -> &'static str {
        match self {
            FeedKind::StationInformation => "station_information",
            FeedKind::StationStatus => "station_status",
            FeedKind::FreeBikeStatus => "free_bike_status",
        }
    }

    /// Alternative names used by other GBFS versions.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            FeedKind::FreeBikeStatus => &["vehicle_status"],
            _ => &[],
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common GBFS envelope: `{"last_updated": ..., "ttl": ..., "data": ...}`.
#[derive(Debug, Clone, Deserialize)]
pub struct GbfsDocument<T> {
    #[serde(default, deserialize_with = "epoch_seconds")]
    pub last_updated: Option<u64>,
    #[serde(default)]
    pub ttl: Option<u64>,
    pub data: T,
}

/// Parse a raw document body.
pub fn parse_document<T: DeserializeOwned>(
    kind: FeedKind,
    body: &[u8],
) -> Result<GbfsDocument<T>> {
    serde_json::from_slice(body).map_err(|source| BikeshareError::Parse {
        feed: kind.name().to_string(),
        source,
    })
}

/// A leniently parsed list of records.
#[derive(Debug, Clone)]
pub struct Records<T> {
    pub items: Vec<T>,
    /// Entries that were present but did not parse.
    pub malformed: usize,
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            malformed: 0,
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Records<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<Value>::deserialize(deserializer)?;
        let total = raw.len();
        let items: Vec<T> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        Ok(Records {
            malformed: total - items.len(),
            items,
        })
    }
}

// --- discovery (gbfs.json) ---

/// One entry of the discovery feed list.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedList {
    pub feeds: Vec<FeedLink>,
}

/// `data` of the discovery document.
///
/// GBFS 2.x nests feed lists per language; 3.x has a single flat list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DiscoveryData {
    Flat(FeedList),
    ByLanguage(BTreeMap<String, FeedList>),
}

impl DiscoveryData {
    /// Feed list for `language`, falling back to the first language listed.
    pub fn feeds(&self, language: &str) -> &[FeedLink] {
        match self {
            DiscoveryData::Flat(list) => &list.feeds,
            DiscoveryData::ByLanguage(langs) => langs
                .get(language)
                .or_else(|| langs.values().next())
                .map(|list| list.feeds.as_slice())
                .unwrap_or(&[]),
        }
    }

    /// Map of feed name to URL for `language`.
    pub fn feed_urls(&self, language: &str) -> BTreeMap<String, String> {
        self.feeds(language)
            .iter()
            .map(|f| (f.name.clone(), f.url.clone()))
            .collect()
    }
}

pub type Discovery = GbfsDocument<DiscoveryData>;

// --- station_information ---

#[derive(Debug, Clone, Deserialize)]
pub struct StationInformationRecord {
    #[serde(deserialize_with = "id_string")]
    pub station_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationInformationData {
    #[serde(default)]
    pub stations: Records<StationInformationRecord>,
}

pub type StationInformation = GbfsDocument<StationInformationData>;

// --- station_status ---

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleTypeCount {
    #[serde(deserialize_with = "id_string")]
    pub vehicle_type_id: String,
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationStatusRecord {
    #[serde(deserialize_with = "id_string")]
    pub station_id: String,
    #[serde(default)]
    pub num_bikes_available: Option<u32>,
    #[serde(default)]
    pub num_ebikes_available: Option<u32>,
    #[serde(default)]
    pub num_docks_available: Option<u32>,
    #[serde(default, deserialize_with = "flag")]
    pub is_installed: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_renting: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_returning: Option<bool>,
    #[serde(default)]
    pub vehicle_types_available: Option<Vec<VehicleTypeCount>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationStatusData {
    #[serde(default)]
    pub stations: Records<StationStatusRecord>,
}

pub type StationStatus = GbfsDocument<StationStatusData>;

// --- free_bike_status ---

#[derive(Debug, Clone, Deserialize)]
pub struct FreeBikeRecord {
    #[serde(alias = "vehicle_id", deserialize_with = "id_string")]
    pub bike_id: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, deserialize_with = "flag")]
    pub is_reserved: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_disabled: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub vehicle_type_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FreeBikeStatusData {
    #[serde(default, alias = "vehicles")]
    pub bikes: Records<FreeBikeRecord>,
}

pub type FreeBikeStatus = GbfsDocument<FreeBikeStatusData>;

// --- field helpers ---

/// Identifiers are strings in GBFS but some feeds publish bare numbers.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Like [`id_string`] but absent, null or oddly typed values become `None`.
fn lenient_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// GBFS 1.x encodes booleans as `0`/`1`.
fn flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    })
}

/// `last_updated` is epoch seconds in 2.x and an RFC 3339 string in 3.x;
/// only the numeric form is kept.
fn epoch_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        _ => None,
    })
}
