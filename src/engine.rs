//! Cursor-paginated feed synchronization.
//!
//! One engine instance owns one logical feed (nearby or catalog), its store
//! writer, cursor, and phase. Mutual exclusion between fetches is the phase
//! guard itself: `initialize`/`load_more` are no-ops while a fetch is in
//! flight, while `refresh`/`update_radius` supersede an in-flight fetch by
//! bumping the params epoch so its response is discarded on arrival.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::config;
use crate::gateway::{GatewayError, ListingGateway, ListingQuery};
use crate::location::LocationReader;
use crate::model::{FeedPhase, GeoPoint, QueryParams};
use crate::store::{FeedAction, FeedReader, FeedStore};

/// Center drift below this is treated as jitter, not a parameter change.
const CENTER_REFRESH_DELTA_M: f64 = 250.0;

/// Paging and radius-clamp settings for one feed.
#[derive(Debug, Clone, Copy)]
pub struct FeedSettings {
    pub page_size: u32,
    pub default_radius_meters: u32,
    pub min_radius_meters: u32,
    pub max_radius_meters: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            default_radius_meters: 10_000,
            min_radius_meters: 5_000,
            max_radius_meters: 100_000,
        }
    }
}

impl From<&config::Feed> for FeedSettings {
    fn from(feed: &config::Feed) -> Self {
        Self {
            page_size: feed.page_size,
            default_radius_meters: feed.default_radius_meters,
            min_radius_meters: feed.min_radius_meters,
            max_radius_meters: feed.max_radius_meters,
        }
    }
}

impl FeedSettings {
    fn clamp_radius(&self, radius_meters: u32) -> u32 {
        radius_meters.clamp(self.min_radius_meters, self.max_radius_meters)
    }
}

struct EngineState {
    phase: FeedPhase,
    cursor: Option<String>,
    params: Option<QueryParams>,
    /// Bumped whenever the query params are (re)set; a fetch carries the
    /// epoch it was issued under and its response is dropped if they differ.
    epoch: u64,
}

pub struct FeedEngine {
    gateway: Arc<dyn ListingGateway>,
    store: FeedStore,
    state: Mutex<EngineState>,
    settings: FeedSettings,
}

impl FeedEngine {
    pub fn new(gateway: Arc<dyn ListingGateway>, settings: FeedSettings) -> Self {
        let (store, _reader) = FeedStore::new();
        Self {
            gateway,
            store,
            state: Mutex::new(EngineState {
                phase: FeedPhase::Idle,
                cursor: None,
                params: None,
                epoch: 0,
            }),
            settings,
        }
    }

    /// New observer handle onto this feed's state.
    pub fn subscribe(&self) -> FeedReader {
        self.store.subscribe()
    }

    /// First fetch for the given query params. No-op while a fetch is
    /// already in flight; calling again after an `Error` retries.
    #[instrument(skip(self))]
    pub async fn initialize(&self, center: Option<GeoPoint>, radius_meters: u32) {
        let (epoch, params) = {
            let mut state = self.state.lock().expect("engine state lock");
            if matches!(state.phase, FeedPhase::Loading | FeedPhase::LoadingMore) {
                debug!("fetch already in flight; initialize ignored");
                return;
            }
            let params = QueryParams {
                center,
                radius_meters: self.settings.clamp_radius(radius_meters),
            };
            state.params = Some(params);
            state.cursor = None;
            state.phase = FeedPhase::Loading;
            state.epoch += 1;
            self.store.apply_many([
                FeedAction::SetQueryParams(params),
                FeedAction::SetPhase(FeedPhase::Loading),
            ]);
            (state.epoch, params)
        };
        self.fetch_page(epoch, params, None).await;
    }

    /// Discard cursor and collection validity, refetch page one with the
    /// last-used params. Supersedes any in-flight fetch.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        if let Some((epoch, params)) = self.begin_refresh(|_| true) {
            self.fetch_page(epoch, params, None).await;
        }
    }

    /// Start a superseding page-one fetch. `mutate` runs on the current
    /// params and returns whether to proceed; the mutation, epoch bump,
    /// cursor drop and phase transition all happen in one critical section,
    /// so an in-flight response can never observe the new params paired
    /// with its own epoch.
    fn begin_refresh(
        &self,
        mutate: impl FnOnce(&mut QueryParams) -> bool,
    ) -> Option<(u64, QueryParams)> {
        let mut state = self.state.lock().expect("engine state lock");
        let params = match state.params.as_mut() {
            Some(p) => p,
            None => {
                debug!("no query params yet; refresh ignored");
                return None;
            }
        };
        if !mutate(params) {
            return None;
        }
        let params = *params;
        state.cursor = None;
        state.phase = FeedPhase::Loading;
        state.epoch += 1;
        self.store.apply_many([
            FeedAction::SetQueryParams(params),
            FeedAction::SetPhase(FeedPhase::Loading),
        ]);
        Some((state.epoch, params))
    }

    /// Fetch the next page behind the stored cursor. No-op while a fetch is
    /// in flight or once the end of the stream has been reached; retrying
    /// after an `Error` reissues the same cursor.
    #[instrument(skip(self))]
    pub async fn load_more(&self) {
        let (epoch, params, cursor) = {
            let mut state = self.state.lock().expect("engine state lock");
            if matches!(state.phase, FeedPhase::Loading | FeedPhase::LoadingMore) {
                debug!("fetch already in flight; load_more ignored");
                return;
            }
            let cursor = match state.cursor.clone() {
                Some(c) => c,
                None => {
                    debug!("no continuation cursor; load_more ignored");
                    return;
                }
            };
            let params = match state.params {
                Some(p) => p,
                None => return,
            };
            state.phase = FeedPhase::LoadingMore;
            self.store
                .apply(FeedAction::SetPhase(FeedPhase::LoadingMore));
            (state.epoch, params, cursor)
        };
        self.fetch_page(epoch, params, Some(cursor)).await;
    }

    /// Single clamp-and-refresh entry point for the radius. Refreshes only
    /// if the clamped value differs from the current one.
    #[instrument(skip(self))]
    pub async fn update_radius(&self, radius_meters: u32) {
        let clamped = self.settings.clamp_radius(radius_meters);
        let begun = self.begin_refresh(|params| {
            if params.radius_meters == clamped {
                return false;
            }
            params.radius_meters = clamped;
            true
        });
        match begun {
            Some((epoch, params)) => {
                info!(radius = clamped, "radius changed; refreshing feed");
                self.fetch_page(epoch, params, None).await;
            }
            None => debug!(radius = clamped, "radius unchanged; no refresh"),
        }
    }

    /// Pull the liked-listing ids from the user profile into the store.
    /// Failures are logged and leave the feed phase untouched.
    #[instrument(skip(self))]
    pub async fn sync_likes(&self, profile_id: &str) {
        match self.gateway.fetch_liked_ids(profile_id).await {
            Ok(ids) => {
                debug!(count = ids.len(), "liked ids synced");
                self.store.apply(FeedAction::SetLikedIds(ids));
            }
            Err(err) => warn!(?err, "failed to sync liked ids"),
        }
    }

    /// React to a location transition: defer the first fetch until a fix
    /// exists, refresh when the center moves meaningfully, freeze with
    /// last-known-good data when the fix is lost.
    pub async fn handle_location_update(&self, location: Option<GeoPoint>) {
        let center = match location {
            Some(c) => c,
            None => {
                info!("location unavailable; feed frozen with last-known data");
                return;
            }
        };

        enum Step {
            Initialize,
            Refresh,
            Nothing,
        }
        let step = {
            let state = self.state.lock().expect("engine state lock");
            match state.params {
                None => Step::Initialize,
                // A catalog feed has no center and does not follow the device.
                Some(QueryParams { center: None, .. }) => Step::Nothing,
                Some(_) => Step::Refresh,
            }
        };
        match step {
            Step::Initialize => {
                self.initialize(Some(center), self.settings.default_radius_meters)
                    .await
            }
            Step::Refresh => {
                let begun = self.begin_refresh(|params| match params.center {
                    Some(old) if old.distance_meters(&center) > CENTER_REFRESH_DELTA_M => {
                        params.center = Some(center);
                        true
                    }
                    _ => false,
                });
                if let Some((epoch, params)) = begun {
                    info!("device moved; refreshing feed");
                    self.fetch_page(epoch, params, None).await;
                }
            }
            Step::Nothing => {}
        }
    }

    /// Follow a location reader until its provider goes away, feeding each
    /// transition into `handle_location_update`.
    pub async fn drive(self: Arc<Self>, mut location: LocationReader) {
        loop {
            self.handle_location_update(location.current()).await;
            if location.changed().await.is_err() {
                break;
            }
        }
    }

    async fn fetch_page(&self, epoch: u64, params: QueryParams, cursor: Option<String>) {
        let replace = cursor.is_none();
        let query = ListingQuery {
            center: params.center,
            radius_meters: params.radius_meters,
            cursor,
            limit: self.settings.page_size,
        };
        let result = self.gateway.fetch_listings(&query).await;

        let mut state = self.state.lock().expect("engine state lock");
        if state.epoch != epoch {
            debug!("stale response discarded (query params changed mid-flight)");
            return;
        }
        match result {
            Ok(page) => {
                state.cursor = page.next_cursor.clone();
                state.phase = FeedPhase::Idle;
                let action = if replace {
                    FeedAction::SetListings {
                        items: page.items,
                        cursor: page.next_cursor,
                    }
                } else {
                    FeedAction::AppendListings {
                        items: page.items,
                        cursor: page.next_cursor,
                    }
                };
                // One atomic store write per terminal outcome.
                self.store
                    .apply_many([action, FeedAction::SetPhase(FeedPhase::Idle)]);
            }
            Err(err) => {
                match &err {
                    GatewayError::Network(_) => warn!(?err, "listing fetch failed (network)"),
                    GatewayError::Rejected { .. } => {
                        warn!(?err, "listing fetch rejected by backend")
                    }
                    _ => warn!(?err, "listing fetch failed"),
                }
                state.phase = FeedPhase::Error;
                self.store.apply(FeedAction::SetPhase(FeedPhase::Error));
            }
        }
    }
}
