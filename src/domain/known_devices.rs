//! Persistent set of devices we have connected to before.

use crate::domain::models::DeviceId;
use crate::domain::ports::KeyValueStore;
use crate::error::StoreError;
use serde_json::Value;
use tracing::{info, warn};

/// Storage key holding the identifier list.
pub const KNOWN_DEVICES_KEY: &str = "KnownPeripheralsIdentifiers";

/// Insertion-ordered identifiers without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownDeviceSet {
    ids: Vec<DeviceId>,
}

impl KnownDeviceSet {
    pub fn contains(&self, id: DeviceId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.ids.iter().copied()
    }

    pub fn as_slice(&self) -> &[DeviceId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn insert(&mut self, id: DeviceId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }
}

fn entry_id(entry: &Value) -> Option<DeviceId> {
    entry.as_str().and_then(|s| s.parse().ok())
}

/// Known-device persistence on top of a [`KeyValueStore`].
///
/// Every mutation is a read-modify-write under `&mut self`, so one store
/// instance never interleaves two updates.
pub struct KnownDeviceStore<S> {
    backend: S,
}

impl<S: KeyValueStore> KnownDeviceStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Read the stored identifiers. A missing or malformed value yields an
    /// empty set; individual entries that fail to parse are skipped.
    pub fn load(&self) -> KnownDeviceSet {
        let mut set = KnownDeviceSet::default();

        let entries = match self.backend.get(KNOWN_DEVICES_KEY) {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!("Ignoring malformed known-device list: {}", other);
                return set;
            }
            None => return set,
        };

        for entry in entries {
            match entry.as_str().map(str::parse::<DeviceId>) {
                Some(Ok(id)) => {
                    set.insert(id);
                }
                Some(Err(e)) => warn!("Skipping stored entry: {}", e),
                None => warn!("Skipping non-string stored entry: {}", entry),
            }
        }
        set
    }

    /// Stored entries as written, including ones `load` skips.
    fn raw_entries(&self) -> Vec<Value> {
        match self.backend.get(KNOWN_DEVICES_KEY) {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        }
    }

    /// Remember `id`. Returns `false` without writing if it was already known.
    /// Unparseable entries already in the list are left in place.
    pub fn add(&mut self, id: DeviceId) -> Result<bool, StoreError> {
        let mut entries = self.raw_entries();
        if entries.iter().any(|entry| entry_id(entry) == Some(id)) {
            return Ok(false);
        }
        entries.push(Value::String(id.to_string()));
        self.backend.set(KNOWN_DEVICES_KEY, Value::Array(entries))?;
        info!("Stored known device {}", id);
        Ok(true)
    }

    /// Forget `id`. Returns whether it was stored.
    pub fn remove(&mut self, id: DeviceId) -> Result<bool, StoreError> {
        let mut entries = self.raw_entries();
        let before = entries.len();
        entries.retain(|entry| entry_id(entry) != Some(id));
        if entries.len() == before {
            return Ok(false);
        }
        self.backend.set(KNOWN_DEVICES_KEY, Value::Array(entries))?;
        info!("Forgot known device {}", id);
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.backend.set(KNOWN_DEVICES_KEY, Value::Array(Vec::new()))
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryStore;
    use serde_json::json;

    fn id(n: u64) -> DeviceId {
        DeviceId::from_address(n)
    }

    #[test]
    fn test_empty_store_loads_empty() {
        let store = KnownDeviceStore::new(MemoryStore::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = KnownDeviceStore::new(MemoryStore::new());
        assert!(store.add(id(1)).unwrap());
        assert!(!store.add(id(1)).unwrap());
        assert!(store.add(id(2)).unwrap());
        assert!(!store.add(id(1)).unwrap());

        let known = store.load();
        assert_eq!(known.as_slice(), &[id(1), id(2)]);
        assert_eq!(
            store.backend().get(KNOWN_DEVICES_KEY),
            Some(json!(["00:00:00:00:00:01", "00:00:00:00:00:02"]))
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                KNOWN_DEVICES_KEY,
                json!(["AA:BB:CC:DD:EE:FF", "garbage", 42, "aa:bb:cc:dd:ee:ff", "00:00:00:00:00:07"]),
            )
            .unwrap();
        let store = KnownDeviceStore::new(backend);

        let known = store.load();
        assert_eq!(known.as_slice(), &[id(0xAABB_CCDD_EEFF), id(7)]);
    }

    #[test]
    fn test_writes_keep_unparseable_entries() {
        let mut backend = MemoryStore::new();
        backend
            .set(KNOWN_DEVICES_KEY, json!(["garbage", "00:00:00:00:00:07", 42]))
            .unwrap();
        let mut store = KnownDeviceStore::new(backend);

        assert!(!store.add(id(7)).unwrap());
        assert!(store.add(id(8)).unwrap());
        assert_eq!(
            store.backend().get(KNOWN_DEVICES_KEY),
            Some(json!(["garbage", "00:00:00:00:00:07", 42, "00:00:00:00:00:08"]))
        );

        assert!(store.remove(id(7)).unwrap());
        assert_eq!(
            store.backend().get(KNOWN_DEVICES_KEY),
            Some(json!(["garbage", 42, "00:00:00:00:00:08"]))
        );
        assert_eq!(store.load().as_slice(), &[id(8)]);
    }

    #[test]
    fn test_wrong_value_type_loads_empty() {
        let mut backend = MemoryStore::new();
        backend
            .set(KNOWN_DEVICES_KEY, json!({ "not": "a list" }))
            .unwrap();
        let mut store = KnownDeviceStore::new(backend);
        assert!(store.load().is_empty());

        // Adding over a corrupt value replaces it with a clean list
        assert!(store.add(id(3)).unwrap());
        assert_eq!(store.load().as_slice(), &[id(3)]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = KnownDeviceStore::new(MemoryStore::new());
        store.add(id(1)).unwrap();
        store.add(id(2)).unwrap();

        assert!(store.remove(id(1)).unwrap());
        assert!(!store.remove(id(1)).unwrap());
        assert_eq!(store.load().as_slice(), &[id(2)]);

        store.clear().unwrap();
        assert!(store.load().is_empty());
    }
}
