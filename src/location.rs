//! Device location as a current-value container.
//!
//! Platform glue (the permission prompt, the OS location callback) pushes
//! into [`LocationProvider`]; the engine and UI read through cloneable
//! [`LocationReader`]s. Reads never suspend; `changed().await` is the
//! transition notification.

use std::sync::Mutex;
use tokio::sync::watch;
use tracing::info;

use crate::model::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

pub struct LocationProvider {
    tx: watch::Sender<Option<GeoPoint>>,
    permission: Mutex<PermissionStatus>,
}

#[derive(Clone)]
pub struct LocationReader {
    rx: watch::Receiver<Option<GeoPoint>>,
}

impl LocationProvider {
    pub fn new() -> (LocationProvider, LocationReader) {
        let (tx, rx) = watch::channel(None);
        (
            LocationProvider {
                tx,
                permission: Mutex::new(PermissionStatus::Denied),
            },
            LocationReader { rx },
        )
    }

    pub fn subscribe(&self) -> LocationReader {
        LocationReader {
            rx: self.tx.subscribe(),
        }
    }

    /// Last recorded permission decision. The prompt itself belongs to the
    /// platform layer; it reports the outcome here via `grant`/`deny`.
    pub fn request_permission(&self) -> PermissionStatus {
        *self.permission.lock().expect("permission lock")
    }

    pub fn grant(&self) {
        *self.permission.lock().expect("permission lock") = PermissionStatus::Granted;
        info!("location permission granted");
    }

    /// Record a denial and drop the current fix.
    pub fn deny(&self) {
        *self.permission.lock().expect("permission lock") = PermissionStatus::Denied;
        info!("location permission denied");
        self.tx.send_replace(None);
    }

    /// New fix from the platform. Ignored while permission is denied.
    pub fn update(&self, location: GeoPoint) {
        if self.request_permission() == PermissionStatus::Denied {
            return;
        }
        self.tx.send_replace(Some(location));
    }

    /// Fix lost (e.g. no GPS signal) without a permission change.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl LocationReader {
    /// Last-known value; returns immediately.
    pub fn current(&self) -> Option<GeoPoint> {
        *self.rx.borrow()
    }

    /// Wait for the next transition of the current value.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_are_ignored_while_denied() {
        let (provider, reader) = LocationProvider::new();
        assert_eq!(provider.request_permission(), PermissionStatus::Denied);
        provider.update(GeoPoint { lat: 6.5, lon: 3.3 });
        assert!(reader.current().is_none());
    }

    #[test]
    fn grant_then_update_exposes_fix() {
        let (provider, reader) = LocationProvider::new();
        provider.grant();
        provider.update(GeoPoint { lat: 6.5, lon: 3.3 });
        assert_eq!(reader.current(), Some(GeoPoint { lat: 6.5, lon: 3.3 }));
    }

    #[test]
    fn deny_drops_the_fix() {
        let (provider, reader) = LocationProvider::new();
        provider.grant();
        provider.update(GeoPoint { lat: 6.5, lon: 3.3 });
        provider.deny();
        assert!(reader.current().is_none());
    }

    #[tokio::test]
    async fn readers_observe_transitions() {
        let (provider, mut reader) = LocationProvider::new();
        provider.grant();
        provider.update(GeoPoint { lat: 1.0, lon: 2.0 });
        reader.changed().await.unwrap();
        assert!(reader.current().is_some());
    }
}
