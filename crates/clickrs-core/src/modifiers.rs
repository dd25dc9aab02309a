// Clickrs Button Modifiers
// Read-only chord view: which buttons are currently held, in press order

use std::sync::Arc;
use std::time::Instant;

use smallvec::SmallVec;

use crate::button::{ButtonNumber, DeviceId};
use crate::state::{DeviceButtons, StateStore};

/// One entry of a device's modifier chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveModifier {
    pub button: ButtonNumber,
    pub click_level: u32,
}

/// Chord list for one device; rarely more than a few buttons at once.
pub type ModifierChord = SmallVec<[ActiveModifier; 4]>;

/// Read-only view over a [`StateStore`] answering "which buttons act as
/// modifiers right now". A button qualifies while it is physically pressed
/// with a non-zero click level — zombified holds included, that is their
/// whole point.
#[derive(Clone)]
pub struct ButtonModifiers {
    store: Arc<StateStore>,
}

impl ButtonModifiers {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self { store }
    }

    /// Active modifiers of one device, ordered ascending by press time.
    pub fn active_modifiers(&self, device: DeviceId) -> ModifierChord {
        match self.store.existing_device(device) {
            Some(slot) => {
                let buttons = slot.lock();
                collect_chord(&buttons)
                    .into_iter()
                    .map(|(_, modifier)| modifier)
                    .collect()
            }
            None => ModifierChord::new(),
        }
    }

    /// Scan all devices and return the chord of the one holding the oldest
    /// active press, along with which device that is. `None` when no button
    /// is active anywhere.
    pub fn active_modifiers_any(&self) -> Option<(DeviceId, ModifierChord)> {
        let mut best: Option<(Instant, DeviceId, ModifierChord)> = None;

        for device in self.store.device_ids() {
            let Some(slot) = self.store.existing_device(device) else {
                continue;
            };
            let chord = {
                let buttons = slot.lock();
                collect_chord(&buttons)
            };
            let Some(&(first_press, _)) = chord.first() else {
                continue;
            };

            let replace = match &best {
                Some((oldest, _, _)) => first_press < *oldest,
                None => true,
            };
            if replace {
                best = Some((
                    first_press,
                    device,
                    chord.into_iter().map(|(_, modifier)| modifier).collect(),
                ));
            }
        }

        best.map(|(_, device, chord)| (device, chord))
    }
}

fn collect_chord(buttons: &DeviceButtons) -> SmallVec<[(Instant, ActiveModifier); 4]> {
    let mut chord: SmallVec<[(Instant, ActiveModifier); 4]> = buttons
        .iter()
        .filter(|(_, state)| state.pressed && state.click_level != 0)
        .filter_map(|(&button, state)| {
            state.pressed_at.map(|pressed_at| {
                (
                    pressed_at,
                    ActiveModifier {
                        button,
                        click_level: state.click_level,
                    },
                )
            })
        })
        .collect();
    chord.sort_by_key(|&(pressed_at, modifier)| (pressed_at, modifier.button));
    chord
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn press(store: &StateStore, device: DeviceId, button: ButtonNumber, level: u32, at: Instant) {
        let slot = store.device(device);
        let mut buttons = slot.lock();
        let state = buttons.get_or_create(button);
        state.pressed = true;
        state.click_level = level;
        state.pressed_at = Some(at);
    }

    #[test]
    fn test_ordered_by_press_time() {
        let store = Arc::new(StateStore::new());
        let d = DeviceId::new(1);
        let base = Instant::now();
        press(&store, d, ButtonNumber::new(5), 1, base + Duration::from_millis(20));
        press(&store, d, ButtonNumber::new(3), 2, base);

        let chord = ButtonModifiers::new(Arc::clone(&store)).active_modifiers(d);
        assert_eq!(
            chord.as_slice(),
            &[
                ActiveModifier { button: ButtonNumber::new(3), click_level: 2 },
                ActiveModifier { button: ButtonNumber::new(5), click_level: 1 },
            ]
        );
    }

    #[test]
    fn test_excludes_released_and_level_zero() {
        let store = Arc::new(StateStore::new());
        let d = DeviceId::new(1);
        let now = Instant::now();
        press(&store, d, ButtonNumber::new(1), 1, now);
        // Pressed but already reset to level 0: not a modifier.
        press(&store, d, ButtonNumber::new(2), 0, now);
        // Level retained but released: not a modifier either.
        {
            let slot = store.device(d);
            let mut buttons = slot.lock();
            let state = buttons.get_or_create(ButtonNumber::new(3));
            state.click_level = 1;
            state.pressed = false;
            state.pressed_at = Some(now);
        }

        let chord = ButtonModifiers::new(Arc::clone(&store)).active_modifiers(d);
        assert_eq!(chord.len(), 1);
        assert_eq!(chord[0].button, ButtonNumber::new(1));
    }

    #[test]
    fn test_zombified_hold_still_counts() {
        let store = Arc::new(StateStore::new());
        let d = DeviceId::new(1);
        press(&store, d, ButtonNumber::new(1), 1, Instant::now());
        {
            let slot = store.device(d);
            slot.lock().get_mut(ButtonNumber::new(1)).unwrap().zombified = true;
        }

        let chord = ButtonModifiers::new(Arc::clone(&store)).active_modifiers(d);
        assert_eq!(chord.len(), 1);
    }

    #[test]
    fn test_any_device_picks_oldest_press() {
        let store = Arc::new(StateStore::new());
        let base = Instant::now();
        press(&store, DeviceId::new(2), ButtonNumber::new(1), 1, base + Duration::from_millis(5));
        press(&store, DeviceId::new(7), ButtonNumber::new(4), 1, base);

        let (device, chord) = ButtonModifiers::new(Arc::clone(&store))
            .active_modifiers_any()
            .unwrap();
        assert_eq!(device, DeviceId::new(7));
        assert_eq!(chord[0].button, ButtonNumber::new(4));
    }

    #[test]
    fn test_any_device_empty() {
        let store = Arc::new(StateStore::new());
        store.device(DeviceId::new(1));
        assert!(ButtonModifiers::new(store).active_modifiers_any().is_none());
    }
}
