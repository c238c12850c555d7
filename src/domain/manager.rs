//! Peripheral Manager
//!
//! Owns the device registry, the known-device store and the adapter power
//! state, and is the only thing that mutates them. Adapter events and caller
//! commands are handled one at a time, either directly through
//! [`PeripheralManager::handle_event`] or by the [`PeripheralManager::run`]
//! loop.
//!
//! ```text
//!   RadioAdapter ──AdapterEvent──▶ ┌──────────────────┐ ──devices_changed──▶ observers
//!        ▲                         │ PeripheralManager│
//!        └──scan/connect/resolve── └───┬─────────┬────┘
//!                                      │         │
//!                               DeviceRegistry  KnownDeviceStore ──▶ KeyValueStore
//! ```

use crate::domain::adapter_state::{AdapterStateMachine, PowerTransition};
use crate::domain::known_devices::{KnownDeviceSet, KnownDeviceStore};
use crate::domain::models::{
    AdapterEvent, AdapterState, ConnectionState, DeviceId, DeviceRecord, ManagerCommand,
};
use crate::domain::ports::{DeviceObserver, KeyValueStore, RadioAdapter};
use crate::domain::registry::DeviceRegistry;
use crate::domain::settings::ManagerSettings;
use crate::error::ManagerError;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct PeripheralManager<A, S> {
    adapter: A,
    store: KnownDeviceStore<S>,
    registry: DeviceRegistry,
    power: AdapterStateMachine,
    settings: ManagerSettings,
    scanning: bool,
    observers: Vec<Box<dyn DeviceObserver>>,
}

impl<A: RadioAdapter, S: KeyValueStore> PeripheralManager<A, S> {
    pub fn new(adapter: A, store: S, settings: ManagerSettings) -> Self {
        Self {
            adapter,
            store: KnownDeviceStore::new(store),
            registry: DeviceRegistry::new(),
            power: AdapterStateMachine::new(),
            settings,
            scanning: false,
            observers: Vec::new(),
        }
    }

    /// Register a sink that is handed the full device list after every change.
    pub fn add_observer(&mut self, observer: impl DeviceObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        self.registry.all()
    }

    pub fn adapter_state(&self) -> AdapterState {
        self.power.state()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn known_devices(&self) -> KnownDeviceSet {
        self.store.load()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn ensure_powered_on(&self) -> Result<(), ManagerError> {
        if self.power.is_powered_on() {
            Ok(())
        } else {
            Err(ManagerError::AdapterNotReady(self.power.state()))
        }
    }

    fn notify(&mut self) {
        let devices = self.registry.all();
        for observer in self.observers.iter_mut() {
            observer.devices_changed(devices);
        }
    }

    pub async fn start_scan(&mut self) -> Result<(), ManagerError> {
        self.ensure_powered_on()?;
        self.adapter.start_scan().await?;
        self.scanning = true;
        info!("Scan started");
        Ok(())
    }

    pub async fn stop_scan(&mut self) -> Result<(), ManagerError> {
        self.ensure_powered_on()?;
        self.adapter.stop_scan().await?;
        self.scanning = false;
        info!("Scan stopped");
        Ok(())
    }

    /// Ask the adapter to connect. There is no timeout here; use
    /// [`cancel_connect`](Self::cancel_connect) to give up.
    pub async fn connect(&mut self, id: DeviceId) -> Result<(), ManagerError> {
        self.ensure_powered_on()?;
        self.request_connect(id).await?;
        self.notify();
        Ok(())
    }

    pub async fn cancel_connect(&mut self, id: DeviceId) -> Result<(), ManagerError> {
        self.ensure_powered_on()?;
        info!("Cancelling connection to {}", id);
        self.adapter.cancel_connect(id).await?;
        self.registry.set_state(id, ConnectionState::Disconnecting);
        self.notify();
        Ok(())
    }

    /// Stop reconnecting `id` on future power-ons. The registry keeps its record.
    pub fn forget_device(&mut self, id: DeviceId) -> Result<(), ManagerError> {
        if self.store.remove(id)? {
            info!("Forgot peripheral {}", id);
        }
        Ok(())
    }

    pub fn forget_all_devices(&mut self) -> Result<(), ManagerError> {
        self.store.clear()?;
        info!("Forgot all known peripherals");
        Ok(())
    }

    async fn request_connect(&mut self, id: DeviceId) -> Result<(), ManagerError> {
        info!("Sending a connect request to {}", id);
        self.adapter.connect(id).await?;
        // Live or pending links keep their state; the adapter reports the outcome
        let idle = matches!(
            self.registry.get(id).map(|d| d.connection_state),
            Some(ConnectionState::Disconnected | ConnectionState::Disconnecting)
        );
        if idle {
            self.registry.set_state(id, ConnectionState::Connecting);
        }
        Ok(())
    }

    /// Reconnect every remembered device the adapter can still resolve.
    ///
    /// Adapter failures are logged rather than returned; a store with no
    /// entries performs no adapter calls and no notifications. Otherwise
    /// observers are notified once, even if nothing resolved.
    pub async fn reconnect_known(&mut self) {
        let known = self.store.load();
        if known.is_empty() {
            info!("No known peripherals found");
            return;
        }

        let resolved = match self.adapter.resolve_known(known.as_slice()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Could not resolve known peripherals: {}", e);
                return;
            }
        };
        info!(
            "Resolved {} of {} known peripherals",
            resolved.len(),
            known.len()
        );
        for device in &resolved {
            self.registry
                .upsert_discovered(device.id, device.name.clone(), None);
        }
        self.notify();

        for device in resolved {
            if let Err(e) = self.request_connect(device.id).await {
                warn!("Connect request for {} failed: {}", device.id, e);
            }
        }
    }

    /// Apply one adapter event.
    pub async fn handle_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::PowerStateChanged(state) => self.on_power_state(state).await,
            AdapterEvent::Discovered {
                id,
                name,
                signal_strength,
            } => self.on_discovered(id, name, signal_strength),
            AdapterEvent::Connected(id) => self.on_connected(id),
            AdapterEvent::Disconnected(id) => {
                info!("Did disconnect peripheral {}", id);
                self.registry.set_state(id, ConnectionState::Disconnected);
                self.notify();
            }
            AdapterEvent::ConnectFailed(id) => {
                warn!("Failed to connect peripheral {}", id);
                self.registry.set_state(id, ConnectionState::Disconnected);
                self.notify();
            }
        }
    }

    async fn on_power_state(&mut self, state: AdapterState) {
        match self.power.observe(state) {
            PowerTransition::EnteredPoweredOn => {
                self.reconnect_known().await;
                if self.settings.scan_on_power_on {
                    if let Err(e) = self.start_scan().await {
                        warn!("Automatic scan failed: {}", e);
                    }
                }
            }
            PowerTransition::LeftPoweredOn => {
                self.scanning = false;
                if self.settings.reset_on_power_loss {
                    let reset = self.registry.reset_connections();
                    if reset > 0 {
                        info!("Radio lost power, reset {} connection(s)", reset);
                        self.notify();
                    }
                }
            }
            PowerTransition::Unchanged => {}
        }
    }

    fn on_discovered(&mut self, id: DeviceId, name: Option<String>, signal_strength: Option<i16>) {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => {
                debug!("Ignoring anonymous peripheral {}", id);
                return;
            }
        };

        let upsert = self
            .registry
            .upsert_discovered(id, Some(name), signal_strength);
        if upsert.inserted {
            info!(
                "Discovered peripheral {} ({}) rssi {:?}",
                upsert.record.display_name(),
                id,
                signal_strength
            );
            self.notify();
        }
    }

    fn on_connected(&mut self, id: DeviceId) {
        info!("Did connect peripheral {}", id);
        self.registry.set_state(id, ConnectionState::Connected);
        if let Err(e) = self.store.add(id) {
            warn!("Could not remember {}: {}", id, e);
        }
        self.notify();
    }

    /// Execute one caller command. Returns `false` for `Shutdown`.
    pub async fn execute(&mut self, command: ManagerCommand) -> bool {
        let result = match command.clone() {
            ManagerCommand::StartScan => self.start_scan().await,
            ManagerCommand::StopScan => self.stop_scan().await,
            ManagerCommand::Connect(id) => self.connect(id).await,
            ManagerCommand::CancelConnect(id) => self.cancel_connect(id).await,
            ManagerCommand::ForgetDevice(id) => self.forget_device(id),
            ManagerCommand::ForgetAll => self.forget_all_devices(),
            ManagerCommand::ReconnectKnown => {
                self.reconnect_known().await;
                Ok(())
            }
            ManagerCommand::Shutdown => return false,
        };
        if let Err(e) = result {
            error!("{:?} failed: {}", command, e);
        }
        true
    }

    /// Process adapter events and commands until `Shutdown` arrives or both
    /// channels close. Hands the manager back afterwards.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<AdapterEvent>,
        mut commands: mpsc::UnboundedReceiver<ManagerCommand>,
    ) -> Self {
        info!("Peripheral manager running");
        loop {
            tokio::select! {
                // Pending adapter events go first so commands see current state
                biased;
                Some(event) = events.recv() => self.handle_event(event).await,
                Some(command) = commands.recv() => {
                    if !self.execute(command).await {
                        break;
                    }
                }
                else => break,
            }
        }
        info!("Peripheral manager stopped");
        self
    }
}
