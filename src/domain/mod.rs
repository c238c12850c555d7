pub mod adapter_state;
pub mod known_devices;
pub mod manager;
pub mod models;
pub mod ports;
pub mod registry;
pub mod settings;
