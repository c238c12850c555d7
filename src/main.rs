use peripheral_manager::domain::settings::{Settings, SettingsService};
use peripheral_manager::infrastructure::bluetooth::AdapterEventReceiver;
use peripheral_manager::infrastructure::logging;
use peripheral_manager::infrastructure::storage::JsonFileStore;
use peripheral_manager::{DeviceRecord, ManagerCommand, PeripheralManager, RadioAdapter};
use tokio::sync::mpsc;
use tracing::{error, info};

fn log_devices(devices: &[DeviceRecord]) {
    info!("{} device(s):", devices.len());
    for device in devices {
        info!(
            "  {} [{}] {}",
            device.display_name(),
            device.id,
            device.connection_state
        );
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
async fn run<A: RadioAdapter>(
    adapter: A,
    events: AdapterEventReceiver,
    settings: &Settings,
) -> anyhow::Result<()> {
    let store_path = SettingsService::config_dir()?.join(&settings.manager.store_file_name);
    info!("Known devices stored in {}", store_path.display());
    let store = JsonFileStore::open(store_path);

    let mut manager = PeripheralManager::new(adapter, store, settings.manager.clone());
    manager.add_observer(log_devices);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
        }
        let _ = cmd_tx.send(ManagerCommand::Shutdown);
    });

    manager.run(events, cmd_rx).await;
    Ok(())
}

#[cfg(windows)]
async fn start(settings: &Settings) -> anyhow::Result<()> {
    use peripheral_manager::infrastructure::bluetooth::{event_channel, WinRtAdapter};

    let (event_tx, event_rx) = event_channel();
    let adapter = WinRtAdapter::new(event_tx)
        .await
        .inspect_err(|e| error!("Could not open Bluetooth adapter: {}", e))?;
    run(adapter, event_rx, settings).await
}

#[cfg(not(windows))]
async fn start(_settings: &Settings) -> anyhow::Result<()> {
    error!("No Bluetooth backend is available on this platform");
    anyhow::bail!("unsupported platform")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Peripheral Manager");
    info!("Settings loaded from {}", settings_service.path().display());

    start(&settings).await
}
