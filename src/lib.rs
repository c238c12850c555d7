//! Discovery and automatic reconnection of Bluetooth LE peripherals.
//!
//! [`PeripheralManager`] sits between a platform [`RadioAdapter`] and any
//! number of [`DeviceObserver`]s, remembering every device it successfully
//! connects to and reconnecting them whenever the radio powers on.

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::manager::PeripheralManager;
pub use domain::models::{
    AdapterEvent, AdapterState, ConnectionState, DeviceId, DeviceRecord, ManagerCommand,
    ResolvedDevice,
};
pub use domain::ports::{DeviceObserver, KeyValueStore, RadioAdapter};
pub use error::{AdapterError, ManagerError, StoreError};
