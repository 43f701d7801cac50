//! Shared feed state: one writer (the sync engine), many observers.
//!
//! The store is a `tokio::sync::watch` channel carrying whole snapshots, so
//! an observer never sees a half-updated listings/cursor pair. All collection
//! mutation goes through [`FeedStore::apply`], which is where the dedup and
//! ordering invariants live.

use std::collections::HashSet;
use tokio::sync::watch;

use crate::model::{FeedPhase, Listing, QueryParams};

/// Read-only view of a feed at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    pub listings: Vec<Listing>,
    pub cursor: Option<String>,
    pub phase: FeedPhase,
    pub liked_ids: HashSet<String>,
    pub query_params: Option<QueryParams>,
}

/// The only mutations the store accepts. `SetListings` and `AppendListings`
/// are the sole paths that touch the collection.
#[derive(Debug)]
pub enum FeedAction {
    /// Wholesale replace, used by initialize/refresh.
    SetListings {
        items: Vec<Listing>,
        cursor: Option<String>,
    },
    /// Last-used query params, published when a fetch trigger (re)sets them
    /// so observers track the engine even while the fetch is in flight.
    SetQueryParams(QueryParams),
    /// Append a page, used by load-more. Ids already present are dropped,
    /// keeping their first-seen position.
    AppendListings {
        items: Vec<Listing>,
        cursor: Option<String>,
    },
    SetLikedIds(HashSet<String>),
    SetPhase(FeedPhase),
}

/// Writer half, owned by the engine for its feed.
pub struct FeedStore {
    tx: watch::Sender<FeedSnapshot>,
}

/// Observer half. Cheap to clone; one per UI surface.
#[derive(Clone)]
pub struct FeedReader {
    rx: watch::Receiver<FeedSnapshot>,
}

impl FeedStore {
    pub fn new() -> (FeedStore, FeedReader) {
        let (tx, rx) = watch::channel(FeedSnapshot::default());
        (FeedStore { tx }, FeedReader { rx })
    }

    pub fn subscribe(&self) -> FeedReader {
        FeedReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.tx.borrow().clone()
    }

    /// Apply one action as a single atomic write.
    pub fn apply(&self, action: FeedAction) {
        self.apply_many(std::iter::once(action));
    }

    /// Apply a batch of actions as one atomic write; observers are notified
    /// once and never see an intermediate state.
    pub fn apply_many(&self, actions: impl IntoIterator<Item = FeedAction>) {
        self.tx.send_modify(|state| {
            for action in actions {
                Self::reduce(state, action);
            }
        });
    }

    fn reduce(state: &mut FeedSnapshot, action: FeedAction) {
        match action {
            FeedAction::SetListings { items, cursor } => {
                state.listings = dedup_in_order(items, &HashSet::new());
                state.cursor = cursor;
            }
            FeedAction::SetQueryParams(params) => {
                state.query_params = Some(params);
            }
            FeedAction::AppendListings { items, cursor } => {
                let seen: HashSet<String> =
                    state.listings.iter().map(|l| l.id.clone()).collect();
                state.listings.extend(dedup_in_order(items, &seen));
                state.cursor = cursor;
            }
            FeedAction::SetLikedIds(ids) => {
                state.liked_ids = ids;
            }
            FeedAction::SetPhase(phase) => {
                state.phase = phase;
            }
        }
    }
}

impl FeedReader {
    /// Current snapshot; never blocks.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next store write. Returns `Err` once the owning engine
    /// (and its store) has been dropped.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

/// Keep each id's first occurrence, skipping ids in `seen` and duplicates
/// within `items` itself. Order is fetch order.
fn dedup_in_order(items: Vec<Listing>, seen: &HashSet<String>) -> Vec<Listing> {
    let mut kept = Vec::with_capacity(items.len());
    let mut ids: HashSet<String> = HashSet::new();
    for item in items {
        if seen.contains(&item.id) || !ids.insert(item.id.clone()) {
            continue;
        }
        kept.push(item);
    }
    kept
}
