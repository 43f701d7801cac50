pub mod config;
pub mod engine;
pub mod gateway;
pub mod likes;
pub mod location;
pub mod model;
pub mod store;

pub use engine::{FeedEngine, FeedSettings};
pub use gateway::{GatewayError, GraphqlGateway, ListingGateway, ListingQuery};
pub use likes::is_liked;
pub use location::{LocationProvider, LocationReader, PermissionStatus};
pub use model::{FeedPhase, GeoPoint, Listing, Page, QueryParams};
pub use store::{FeedAction, FeedReader, FeedSnapshot, FeedStore};
