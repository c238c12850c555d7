//! WinRT Radio Adapter
//!
//! Discovery uses an advertisement watcher. A "connection" is a `GattSession`
//! with `MaintainConnection` set, which makes Windows keep (and re-establish)
//! the link until the session is closed.

use crate::domain::models::{AdapterEvent, AdapterState, DeviceId, ResolvedDevice};
use crate::domain::ports::RadioAdapter;
use crate::error::AdapterError;
use crate::infrastructure::bluetooth::AdapterEventSender;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};
use windows::core::IInspectable;
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementReceivedEventArgs, BluetoothLEAdvertisementWatcher,
    BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::GenericAttributeProfile::GattSession;
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothConnectionStatus, BluetoothLEDevice};
use windows::Devices::Radios::{Radio, RadioState};
use windows::Foundation::TypedEventHandler;

impl From<windows::core::Error> for AdapterError {
    fn from(e: windows::core::Error) -> Self {
        AdapterError::Platform(e.to_string())
    }
}

fn map_radio_state(state: RadioState) -> AdapterState {
    match state {
        RadioState::On => AdapterState::PoweredOn,
        RadioState::Off | RadioState::Disabled => AdapterState::PoweredOff,
        _ => AdapterState::Unknown,
    }
}

struct Connection {
    device: BluetoothLEDevice,
    session: GattSession,
    status_token: i64,
}

impl Connection {
    fn close(self) {
        let _ = self.device.RemoveConnectionStatusChanged(self.status_token);
        let _ = self.session.SetMaintainConnection(false);
        let _ = self.session.Close();
        let _ = self.device.Close();
    }
}

pub struct WinRtAdapter {
    events: AdapterEventSender,
    radio: Option<(Radio, i64)>,
    watcher: Option<BluetoothLEAdvertisementWatcher>,
    connections: HashMap<DeviceId, Connection>,
}

impl WinRtAdapter {
    /// Open the default Bluetooth adapter and start reporting its power state.
    /// The current state is sent immediately.
    pub async fn new(events: AdapterEventSender) -> Result<Self, AdapterError> {
        let adapter = BluetoothAdapter::GetDefaultAsync()?
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        let mut this = Self {
            events,
            radio: None,
            watcher: None,
            connections: HashMap::new(),
        };

        if !adapter.IsLowEnergySupported()? {
            warn!("Default Bluetooth adapter does not support LE");
            this.send(AdapterEvent::PowerStateChanged(AdapterState::Unsupported));
            return Ok(this);
        }

        let radio = adapter.GetRadioAsync()?.await?;
        let sender = this.events.clone();
        let handler = TypedEventHandler::new(
            move |radio: windows::core::Ref<Radio>, _: windows::core::Ref<IInspectable>| {
                if let Some(radio) = radio.as_ref() {
                    let state = map_radio_state(radio.State()?);
                    let _ = sender.send(AdapterEvent::PowerStateChanged(state));
                }
                Ok(())
            },
        );
        let token = radio.StateChanged(&handler)?;

        let initial = map_radio_state(radio.State()?);
        info!("Bluetooth radio {:?}, state {}", radio.Name()?, initial);
        this.send(AdapterEvent::PowerStateChanged(initial));
        this.radio = Some((radio, token));

        Ok(this)
    }

    fn send(&self, event: AdapterEvent) {
        let _ = self.events.send(event);
    }

    async fn open_connection(&self, id: DeviceId) -> windows::core::Result<Connection> {
        let device = BluetoothLEDevice::FromBluetoothAddressAsync(id.address())?.await?;

        let device_id = device.BluetoothDeviceId()?;
        let session = GattSession::FromDeviceIdAsync(&device_id)?.await?;
        session.SetMaintainConnection(true)?;

        let sender = self.events.clone();
        let handler =
            TypedEventHandler::new(move |dev: windows::core::Ref<BluetoothLEDevice>, _| {
                if let Some(dev) = dev.as_ref() {
                    let event = match dev.ConnectionStatus()? {
                        BluetoothConnectionStatus::Connected => AdapterEvent::Connected(id),
                        _ => AdapterEvent::Disconnected(id),
                    };
                    let _ = sender.send(event);
                }
                Ok(())
            });
        let status_token = device.ConnectionStatusChanged(&handler)?;

        if device.ConnectionStatus()? == BluetoothConnectionStatus::Connected {
            self.send(AdapterEvent::Connected(id));
        }

        Ok(Connection {
            device,
            session,
            status_token,
        })
    }
}

#[async_trait]
impl RadioAdapter for WinRtAdapter {
    async fn start_scan(&mut self) -> Result<(), AdapterError> {
        self.stop_scan().await?;

        let watcher = BluetoothLEAdvertisementWatcher::new()?;
        watcher.SetScanningMode(BluetoothLEScanningMode::Active)?;

        let sender = self.events.clone();
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    let name = args.Advertisement()?.LocalName()?.to_string();
                    let _ = sender.send(AdapterEvent::Discovered {
                        id: DeviceId::from_address(args.BluetoothAddress()?),
                        name: if name.is_empty() { None } else { Some(name) },
                        signal_strength: Some(args.RawSignalStrengthInDBm()?),
                    });
                }
                Ok(())
            },
        );

        watcher.Received(&handler)?;
        watcher.Start()?;
        self.watcher = Some(watcher);
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<(), AdapterError> {
        if let Some(watcher) = self.watcher.take() {
            watcher.Stop()?;
        }
        Ok(())
    }

    async fn connect(&mut self, id: DeviceId) -> Result<(), AdapterError> {
        if let Some(connection) = self.connections.get(&id) {
            // Already tracked; repeat the live status so callers stay in sync
            if connection.device.ConnectionStatus()? == BluetoothConnectionStatus::Connected {
                self.send(AdapterEvent::Connected(id));
            }
            return Ok(());
        }

        match self.open_connection(id).await {
            Ok(connection) => {
                self.connections.insert(id, connection);
            }
            Err(e) => {
                warn!("Could not open connection to {}: {}", id, e);
                self.send(AdapterEvent::ConnectFailed(id));
            }
        }
        Ok(())
    }

    async fn cancel_connect(&mut self, id: DeviceId) -> Result<(), AdapterError> {
        if let Some(connection) = self.connections.remove(&id) {
            connection.close();
        }
        self.send(AdapterEvent::Disconnected(id));
        Ok(())
    }

    async fn resolve_known(&mut self, ids: &[DeviceId]) -> Result<Vec<ResolvedDevice>, AdapterError> {
        let mut resolved = Vec::new();
        for &id in ids {
            let device = match BluetoothLEDevice::FromBluetoothAddressAsync(id.address())?.await {
                Ok(device) => device,
                Err(e) => {
                    info!("Known device {} not resolvable: {}", id, e);
                    continue;
                }
            };
            let name = device
                .Name()
                .map(|n| n.to_string())
                .ok()
                .filter(|n| !n.is_empty());
            let _ = device.Close();
            resolved.push(ResolvedDevice { id, name });
        }
        Ok(resolved)
    }
}

impl Drop for WinRtAdapter {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.Stop();
        }
        if let Some((radio, token)) = self.radio.take() {
            let _ = radio.RemoveStateChanged(token);
        }
        for (_, connection) in self.connections.drain() {
            connection.close();
        }
    }
}
