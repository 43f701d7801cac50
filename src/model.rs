use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinate pair as returned by the backend's `location` field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Great-circle distance to `other` in meters (haversine).
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_M: f64 = 6_371_000.0;
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingImage {
    pub url: String,
}

/// A marketplace listing. Immutable once fetched; `likes` is bumped by a
/// separate mutation path and only refreshed here through refetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub description: Option<String>,
    pub images: Vec<ListingImage>,
    pub location: Option<GeoPoint>,
    pub likes: i64,
    pub category_id: Option<String>,
    pub quantity: i64,
    pub owner_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of listings plus the continuation token. `next_cursor == None`
/// means end of stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Listing>,
    pub next_cursor: Option<String>,
}

/// Geo-query parameters a cursor is scoped to. `center == None` selects the
/// general catalog feed rather than the nearby feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    pub center: Option<GeoPoint>,
    pub radius_meters: u32,
}

/// Feed state machine phases visible to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    Loading,
    LoadingMore,
    Error,
}
