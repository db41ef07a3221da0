use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unique identifier for a frontier (search) URL row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrontierEntryId(pub Uuid);

impl FrontierEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FrontierEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a discovered place URL row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceId(pub Uuid);

impl PlaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Dedup key for URLs: SHA-256 of the exact URL string, lowercase hex.
///
/// Two URLs that differ by a single character hash to independent identities;
/// no canonicalization happens before hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UrlHash(pub String);

impl UrlHash {
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UrlHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A geographic coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One scan coordinate produced by gridding a geofence. Ephemeral, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub lat: f64,
    pub lng: f64,
}

/// A search URL to be seeded into the frontier
#[derive(Debug, Clone)]
pub struct SeedUrl {
    pub url: String,
    pub area: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
}

/// Outcome of a bulk seed pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub inserted: usize,
    pub skipped: usize,
}

/// A persisted frontier (search URL) row
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    pub id: FrontierEntryId,
    pub hash: UrlHash,
    pub url: String,
    pub area: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub scrapped: bool,
    pub created_at: DateTime<Utc>,
}

/// A place-detail URL about to be recorded
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub url: String,
    pub area: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
}

/// A persisted place-detail row
#[derive(Debug, Clone)]
pub struct PlaceRecord {
    pub id: PlaceId,
    pub hash: UrlHash,
    pub url: String,
    pub area: String,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub scrapped: bool,
    pub created_at: DateTime<Utc>,
}

/// Row counts exposed to the operator
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCounts {
    pub frontier_total: u64,
    pub frontier_unscrapped: u64,
    pub places: u64,
}

/// A third-party delivery/ordering integration offered by a place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryService {
    pub service_text: Option<String>,
    pub service_logo: Option<String>,
    pub service_url: Option<String>,
}

/// One opening/closing interval, encoded as HHMM integers (e.g. 930 = 09:30)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursInterval {
    pub opening: u32,
    pub closing: u32,
}

/// Working hours for one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingDay {
    pub day: Option<String>,
    pub all_day_open: bool,
    pub all_day_closed: bool,
    pub working_hours: Vec<HoursInterval>,
}

/// A single amenity/attribute inside a feature group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureItem {
    pub title: Option<String>,
    pub description: String,
    pub available_options: Vec<String>,
}

/// A named group of place features (e.g. "payments", "accessibility")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub feature_slug: Option<String>,
    pub feature_title: Option<String>,
    pub features: Vec<FeatureItem>,
}

/// Structured record extracted from a place-detail page's embedded data blob.
///
/// Every field degrades to None/empty when the blob shape does not match;
/// extraction never fails as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPlace {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub address: Option<String>,
    pub address_located_at: Option<String>,
    pub reviews_total: Option<i64>,
    pub reviews_average: Option<f64>,
    pub timezone: Option<String>,
    pub street_view: Option<String>,
    pub place_image: Option<String>,
    pub place_cover_image: Option<String>,
    pub map_url: Option<String>,
    pub reservation_text: Option<String>,
    pub reservation_url: Option<String>,
    pub website_text: Option<String>,
    pub website_url: Option<String>,
    pub menu_text: Option<String>,
    pub menu_url: Option<String>,
    pub delivery_services: Vec<DeliveryService>,
    pub working_hours: Vec<WorkingDay>,
    pub features: Vec<FeatureGroup>,
    pub phone_number: Option<String>,
    pub plus_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_hash_is_deterministic() {
        let a = UrlHash::from_url("https://example.com/maps/search/cafe");
        let b = UrlHash::from_url("https://example.com/maps/search/cafe");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn url_hash_distinguishes_single_character() {
        let a = UrlHash::from_url("https://example.com/a");
        let b = UrlHash::from_url("https://example.com/b");
        assert_ne!(a, b);
    }
}
