//! Collaborator interfaces consumed by the peripheral manager.

use crate::domain::models::{DeviceId, DeviceRecord, ResolvedDevice};
use crate::error::{AdapterError, StoreError};
use async_trait::async_trait;

/// A platform Bluetooth central.
///
/// Requests are fire-and-forget: their outcome arrives later as an
/// [`AdapterEvent`](crate::domain::models::AdapterEvent) on the channel the
/// adapter was constructed with.
#[async_trait]
pub trait RadioAdapter: Send {
    /// Begin scanning for nearby peripherals.
    async fn start_scan(&mut self) -> Result<(), AdapterError>;

    /// Stop an active scan. Stopping when idle is not an error.
    async fn stop_scan(&mut self) -> Result<(), AdapterError>;

    /// Request a connection. Does not time out; the radio keeps trying until
    /// the device is in range or the request is cancelled.
    async fn connect(&mut self, id: DeviceId) -> Result<(), AdapterError>;

    /// Cancel a pending connection or tear down an established one.
    async fn cancel_connect(&mut self, id: DeviceId) -> Result<(), AdapterError>;

    /// Map stored identifiers to peripherals the platform still knows about.
    /// Identifiers that cannot be resolved are simply absent from the result.
    async fn resolve_known(&mut self, ids: &[DeviceId]) -> Result<Vec<ResolvedDevice>, AdapterError>;
}

/// Durable key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<serde_json::Value>;

    fn set(&mut self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// Receives the full device list whenever it changes.
pub trait DeviceObserver: Send {
    fn devices_changed(&mut self, devices: &[DeviceRecord]);
}

impl<F> DeviceObserver for F
where
    F: FnMut(&[DeviceRecord]) + Send,
{
    fn devices_changed(&mut self, devices: &[DeviceRecord]) {
        self(devices)
    }
}
