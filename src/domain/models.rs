use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bluetooth device address identifying one physical peripheral.
///
/// Only the low 48 bits are meaningful. The canonical text form is
/// `AA:BB:CC:DD:EE:FF`, which is also what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

const ADDRESS_MASK: u64 = 0xFFFF_FFFF_FFFF;

impl DeviceId {
    pub fn from_address(address: u64) -> Self {
        Self(address & ADDRESS_MASK)
    }

    pub fn address(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid device identifier: {0:?}")]
pub struct DeviceIdError(pub String);

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    /// Accepts `AA:BB:CC:DD:EE:FF`, `AA-BB-CC-DD-EE-FF` or `AABBCCDDEEFF`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex: String = if trimmed.contains(':') || trimmed.contains('-') {
            let parts: Vec<&str> = trimmed.split(&[':', '-'][..]).collect();
            if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
                return Err(DeviceIdError(s.to_string()));
            }
            parts.concat()
        } else {
            trimmed.to_string()
        };

        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DeviceIdError(s.to_string()));
        }

        u64::from_str_radix(&hex, 16)
            .map(DeviceId)
            .map_err(|_| DeviceIdError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnecting => "Disconnecting",
        };
        f.write_str(s)
    }
}

/// Power/availability state of the local radio, as reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdapterState {
    #[default]
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterState::Unknown => "Unknown",
            AdapterState::Resetting => "Resetting",
            AdapterState::Unsupported => "Unsupported",
            AdapterState::Unauthorized => "Unauthorized",
            AdapterState::PoweredOff => "Powered Off",
            AdapterState::PoweredOn => "Powered On",
        };
        f.write_str(s)
    }
}

/// One peripheral known to the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub name: Option<String>,
    pub connection_state: ConnectionState,
    /// RSSI in dBm at first discovery
    pub signal_strength: Option<i16>,
}

impl DeviceRecord {
    pub fn new(id: DeviceId, name: Option<String>, signal_strength: Option<i16>) -> Self {
        Self {
            id,
            name,
            connection_state: ConnectionState::Disconnected,
            signal_strength,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// A stored identifier the adapter could map back to a reachable peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub id: DeviceId,
    pub name: Option<String>,
}

/// Events delivered by a radio adapter, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    PowerStateChanged(AdapterState),
    Discovered {
        id: DeviceId,
        name: Option<String>,
        signal_strength: Option<i16>,
    },
    Connected(DeviceId),
    Disconnected(DeviceId),
    ConnectFailed(DeviceId),
}

/// Requests accepted by the manager event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerCommand {
    StartScan,
    StopScan,
    Connect(DeviceId),
    CancelConnect(DeviceId),
    ForgetDevice(DeviceId),
    ForgetAll,
    ReconnectKnown,
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::from_address(0x0012_34AB_CDEF);
        assert_eq!(id.to_string(), "00:12:34:AB:CD:EF");
    }

    #[test]
    fn test_device_id_parse_forms() {
        let expected = DeviceId::from_address(0xAABB_CCDD_EEFF);
        assert_eq!("AA:BB:CC:DD:EE:FF".parse::<DeviceId>(), Ok(expected));
        assert_eq!("aa-bb-cc-dd-ee-ff".parse::<DeviceId>(), Ok(expected));
        assert_eq!("aabbccddeeff".parse::<DeviceId>(), Ok(expected));
        assert_eq!(
            expected.to_string().parse::<DeviceId>(),
            Ok(expected)
        );
    }

    #[test]
    fn test_device_id_rejects_garbage() {
        assert!("".parse::<DeviceId>().is_err());
        assert!("not-an-address".parse::<DeviceId>().is_err());
        assert!("AA:BB:CC:DD:EE".parse::<DeviceId>().is_err());
        assert!("AA:BB:CC:DD:EE:GG".parse::<DeviceId>().is_err());
        assert!("AABBCCDDEEFF00".parse::<DeviceId>().is_err());
        assert!("A:ABB:CC:DD:EE:FF".parse::<DeviceId>().is_err());
    }

    #[test]
    fn test_address_is_masked() {
        let id = DeviceId::from_address(0xFFFF_0000_0000_0001);
        assert_eq!(id.address(), 1);
    }
}
