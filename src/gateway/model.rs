use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::model::{GeoPoint, Listing, ListingImage};

/// GraphQL response envelope: either `data` or a non-empty `errors` array.
#[derive(Deserialize, Debug)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Deserialize, Debug)]
pub struct GraphqlError {
    pub message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NearbyListingsData {
    pub nearby_listings: Option<RawConnection>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListListingsData {
    pub list_listings: Option<RawConnection>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GetUserProfileData {
    pub get_user_profile: Option<RawProfile>,
}

/// Paginated connection: a list of items plus the continuation token.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawConnection {
    #[serde(default)]
    pub items: Vec<Option<RawListing>>,
    pub next_token: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    #[serde(default)]
    pub liked_listings: Vec<RawLikedListing>,
}

#[derive(Deserialize, Debug)]
pub struct RawLikedListing {
    #[serde(rename = "listingID")]
    pub listing_id: Option<String>,
}

/// Listing record as the backend actually sends it. Every field is optional
/// here; validation into a `Listing` happens in [`RawListing::validate`].
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    pub id: Option<String>,
    pub title: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<RawImage>,
    pub location: Option<GeoPoint>,
    pub likes: Option<i64>,
    pub category_id: Option<String>,
    pub quantity: Option<i64>,
    pub owner: Option<RawOwner>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct RawImage {
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RawOwner {
    pub id: Option<String>,
}

impl RawListing {
    /// Validate a raw record into a domain `Listing`. Records missing the
    /// fields the rest of the client relies on are quarantined (dropped with
    /// a warning) rather than propagated inward with holes.
    pub fn validate(self) -> Option<Listing> {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => {
                warn!("dropping listing record without an id");
                return None;
            }
        };
        let title = match self.title {
            Some(t) => t,
            None => {
                warn!(listing_id = %id, "dropping listing record without a title");
                return None;
            }
        };
        let price = match self.price {
            Some(p) if p.is_finite() => p,
            _ => {
                warn!(listing_id = %id, "dropping listing record without a valid price");
                return None;
            }
        };

        Some(Listing {
            id,
            title,
            price,
            description: self.description,
            images: self
                .images
                .into_iter()
                .filter_map(|img| img.url.map(|url| ListingImage { url }))
                .collect(),
            location: self.location,
            likes: self.likes.unwrap_or(0),
            category_id: self.category_id,
            quantity: self.quantity.unwrap_or(1),
            owner_id: self.owner.and_then(|o| o.id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
