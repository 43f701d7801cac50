use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::model::{GeoPoint, Page};
use crate::gateway::model::{
    GetUserProfileData, GraphqlResponse, ListListingsData, NearbyListingsData, RawConnection,
};

pub mod model;

const NEARBY_LISTINGS_QUERY: &str = r#"query NearbyListings($location: LocationInput!, $m: Int, $limit: Int, $nextToken: String) {
  nearbyListings(location: $location, m: $m, limit: $limit, nextToken: $nextToken) {
    items {
      id
      title
      price
      description
      likes
      images { url }
      location { lat lon }
      categoryId
      quantity
      owner { id }
      createdAt
      updatedAt
    }
    nextToken
  }
}"#;

const LIST_LISTINGS_QUERY: &str = r#"query ListListings($limit: Int, $nextToken: String) {
  listListings(limit: $limit, nextToken: $nextToken) {
    items {
      id
      title
      price
      description
      likes
      images { url }
      location { lat lon }
      categoryId
      quantity
      owner { id }
      createdAt
      updatedAt
    }
    nextToken
  }
}"#;

const GET_USER_PROFILE_QUERY: &str = r#"query GetUserProfile($id: ID!) {
  getUserProfile(id: $id) {
    id
    likedListings { listingID }
  }
}"#;

/// Errors a gateway call can surface. `Network` is transport-level
/// (unreachable, timeout); `Rejected` is a backend-reported failure. The
/// engine treats both the same way state-machine-wise and distinguishes them
/// only in logs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// One page request against the listing backend. `center == None` selects
/// the general catalog query; otherwise the geo-filtered nearby query.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub center: Option<GeoPoint>,
    pub radius_meters: u32,
    pub cursor: Option<String>,
    pub limit: u32,
}

/// The remote listing backend as the sync engine sees it.
#[async_trait]
pub trait ListingGateway: Send + Sync {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Page, GatewayError>;

    /// Listing ids the given profile has liked, from the user profile record.
    async fn fetch_liked_ids(&self, profile_id: &str) -> Result<HashSet<String>, GatewayError>;
}

/// reqwest-backed gateway posting GraphQL documents to an AppSync-style
/// endpoint authenticated with an API key header.
#[derive(Clone)]
pub struct GraphqlGateway {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for GraphqlGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphqlGateway")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GraphqlGateway {
    pub fn new(endpoint: Url, api_key: String) -> Self {
        let http = Client::builder()
            .user_agent("tradeit-feed/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            api_key,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(&cfg.api.endpoint)
            .map_err(|e| GatewayError::InvalidEndpoint(e.to_string()))?;
        Ok(Self::new(endpoint, cfg.api.api_key.clone()))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: Value,
    ) -> Result<T, GatewayError> {
        debug!(endpoint = %self.endpoint, "issuing GraphQL request");
        let res = self
            .http
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by backend: {}", body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "backend error: {}", body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: GraphqlResponse<T> = res.json().await?;
        if let Some(errors) = payload.errors.filter(|e| !e.is_empty()) {
            let message = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            warn!("GraphQL errors: {}", message);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        payload
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("response carried no data".into()))
    }

    fn page_from(conn: RawConnection) -> Page {
        let items = conn
            .items
            .into_iter()
            .flatten()
            .filter_map(|raw| raw.validate())
            .collect();
        Page {
            items,
            next_cursor: conn.next_token,
        }
    }
}

/// Build the variables object for a listing page request. Split out so the
/// wire shape is testable without a server.
pub fn build_query_variables(query: &ListingQuery) -> Value {
    let mut vars = json!({ "limit": query.limit });
    if let Some(center) = &query.center {
        vars["location"] = json!({ "lat": center.lat, "lon": center.lon });
        vars["m"] = json!(query.radius_meters);
    }
    if let Some(cursor) = &query.cursor {
        vars["nextToken"] = json!(cursor);
    }
    vars
}

#[async_trait]
impl ListingGateway for GraphqlGateway {
    async fn fetch_listings(&self, query: &ListingQuery) -> Result<Page, GatewayError> {
        let variables = build_query_variables(query);
        let conn = if query.center.is_some() {
            let data: NearbyListingsData = self.execute(NEARBY_LISTINGS_QUERY, variables).await?;
            data.nearby_listings
                .ok_or_else(|| GatewayError::InvalidResponse("missing nearbyListings".into()))?
        } else {
            let data: ListListingsData = self.execute(LIST_LISTINGS_QUERY, variables).await?;
            data.list_listings
                .ok_or_else(|| GatewayError::InvalidResponse("missing listListings".into()))?
        };
        Ok(Self::page_from(conn))
    }

    async fn fetch_liked_ids(&self, profile_id: &str) -> Result<HashSet<String>, GatewayError> {
        let data: GetUserProfileData = self
            .execute(GET_USER_PROFILE_QUERY, json!({ "id": profile_id }))
            .await?;
        let profile = data
            .get_user_profile
            .ok_or_else(|| GatewayError::InvalidResponse("missing getUserProfile".into()))?;
        Ok(profile
            .liked_listings
            .into_iter()
            .filter_map(|l| l.listing_id)
            .collect())
    }
}
