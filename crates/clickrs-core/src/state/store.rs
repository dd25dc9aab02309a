// Clickrs State Store
// Keyed collection of per-(device, button) records with per-device serialization

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::button::{ButtonNumber, DeviceId};
use crate::state::record::{ButtonSnapshot, ButtonState};

/// All button records of one device. Guarded by a single mutex so that an
/// edge, a timer expiry, and the neutralize-siblings sweep can never observe a
/// half-mutated device.
#[derive(Debug, Default)]
pub(crate) struct DeviceButtons {
    buttons: HashMap<ButtonNumber, ButtonState>,
}

impl DeviceButtons {
    pub(crate) fn get_or_create(&mut self, button: ButtonNumber) -> &mut ButtonState {
        self.buttons.entry(button).or_default()
    }

    pub(crate) fn get(&self, button: ButtonNumber) -> Option<&ButtonState> {
        self.buttons.get(&button)
    }

    pub(crate) fn get_mut(&mut self, button: ButtonNumber) -> Option<&mut ButtonState> {
        self.buttons.get_mut(&button)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&ButtonNumber, &ButtonState)> {
        self.buttons.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&ButtonNumber, &mut ButtonState)> {
        self.buttons.iter_mut()
    }

    fn teardown(&mut self) {
        for state in self.buttons.values_mut() {
            state.cancel_timers();
        }
        self.buttons.clear();
    }
}

/// Owner of all classification state, keyed by (device, button).
///
/// Records are created lazily on first observed input and torn down when the
/// device-detach notification arrives. The outer map is only touched on
/// attach/detach; the steady-state path takes a read lock plus the one device
/// mutex, so independent devices are processed fully in parallel.
#[derive(Debug, Default)]
pub struct StateStore {
    devices: RwLock<HashMap<DeviceId, Arc<Mutex<DeviceButtons>>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the serialization slot for a device, creating it on first sight.
    pub(crate) fn device(&self, device: DeviceId) -> Arc<Mutex<DeviceButtons>> {
        if let Some(slot) = self.devices.read().get(&device) {
            return Arc::clone(slot);
        }
        Arc::clone(self.devices.write().entry(device).or_default())
    }

    pub(crate) fn existing_device(&self, device: DeviceId) -> Option<Arc<Mutex<DeviceButtons>>> {
        self.devices.read().get(&device).cloned()
    }

    /// Device ids in ascending order, for deterministic whole-store scans.
    pub(crate) fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.devices.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Tear down everything for a detached device: cancel all of its timers
    /// and drop its records. Taking the device mutex orders the teardown
    /// after any in-flight edge for the same device.
    pub fn remove_device(&self, device: DeviceId) {
        let slot = self.devices.write().remove(&device);
        if let Some(slot) = slot {
            slot.lock().teardown();
            log::debug!("removed state for detached device {device}");
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    /// Externally observable state of one record, if it exists yet.
    pub fn snapshot(&self, device: DeviceId, button: ButtonNumber) -> Option<ButtonSnapshot> {
        let slot = self.existing_device(device)?;
        let buttons = slot.lock();
        buttons.get(button).map(ButtonState::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_record_for_same_key() {
        let store = StateStore::new();
        let d = DeviceId::new(1);
        let first = store.device(d);
        let second = store.device(d);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_snapshot_unknown_is_none() {
        let store = StateStore::new();
        assert!(store.snapshot(DeviceId::new(9), ButtonNumber::new(1)).is_none());
    }

    #[test]
    fn test_remove_device_drops_records() {
        let store = StateStore::new();
        let d = DeviceId::new(2);
        let b = ButtonNumber::new(3);
        {
            let slot = store.device(d);
            let mut buttons = slot.lock();
            buttons.get_or_create(b).click_level = 2;
        }
        assert!(store.snapshot(d, b).is_some());

        store.remove_device(d);
        assert_eq!(store.device_count(), 0);
        assert!(store.snapshot(d, b).is_none());
    }

    #[test]
    fn test_device_ids_sorted() {
        let store = StateStore::new();
        store.device(DeviceId::new(5));
        store.device(DeviceId::new(1));
        store.device(DeviceId::new(3));
        assert_eq!(
            store.device_ids(),
            vec![DeviceId::new(1), DeviceId::new(3), DeviceId::new(5)]
        );
    }
}
