//! In-memory registry of peripherals seen during this session.

use crate::domain::models::{ConnectionState, DeviceId, DeviceRecord};
use tracing::debug;

/// Result of [`DeviceRegistry::upsert_discovered`].
#[derive(Debug)]
pub struct Upsert<'a> {
    pub record: &'a DeviceRecord,
    /// `false` when the device was already registered
    pub inserted: bool,
}

/// Device records ordered most-recently-discovered first, one per identifier.
/// Records are never removed.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceRecord>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly seen device at the front. A device that is already
    /// registered is returned as-is, without refreshing name or signal.
    pub fn upsert_discovered(
        &mut self,
        id: DeviceId,
        name: Option<String>,
        signal_strength: Option<i16>,
    ) -> Upsert<'_> {
        if let Some(pos) = self.position(id) {
            return Upsert {
                record: &self.devices[pos],
                inserted: false,
            };
        }

        self.devices
            .insert(0, DeviceRecord::new(id, name, signal_strength));
        Upsert {
            record: &self.devices[0],
            inserted: true,
        }
    }

    /// Update a device's connection state. Unknown identifiers are ignored;
    /// returns whether a record was found.
    pub fn set_state(&mut self, id: DeviceId, state: ConnectionState) -> bool {
        match self.devices.iter_mut().find(|d| d.id == id) {
            Some(record) => {
                record.connection_state = state;
                true
            }
            None => {
                debug!("Ignoring state {} for unknown device {}", state, id);
                false
            }
        }
    }

    /// Force every record that is not already disconnected back to
    /// `Disconnected`. Returns how many records changed.
    pub fn reset_connections(&mut self) -> usize {
        let mut changed = 0;
        for record in self
            .devices
            .iter_mut()
            .filter(|d| d.connection_state != ConnectionState::Disconnected)
        {
            record.connection_state = ConnectionState::Disconnected;
            changed += 1;
        }
        changed
    }

    pub fn get(&self, id: DeviceId) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn all(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn position(&self, id: DeviceId) -> Option<usize> {
        self.devices.iter().position(|d| d.id == id)
    }
}
