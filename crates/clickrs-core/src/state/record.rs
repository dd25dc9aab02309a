// Clickrs Button State Record
// One record per observed (device, button) pair

use std::time::Instant;

use crate::timer::TimerHandle;

/// Mutable classification state for one button on one device.
///
/// Always accessed under the owning device's mutex; the handles in the two
/// timer slots are what bounds each record to at most one live hold timer and
/// one live level timer.
#[derive(Debug, Default)]
pub(crate) struct ButtonState {
    /// Consecutive still-meaningful clicks in the current cycle, 0 when idle.
    pub(crate) click_level: u32,
    /// Physical button-down state, maintained by edges only.
    pub(crate) pressed: bool,
    /// Frozen mid-press: consumed as a hold/modifier, waiting for its release.
    pub(crate) zombified: bool,
    /// Set on every press transition; orders the device's modifier chord.
    pub(crate) pressed_at: Option<Instant>,
    pub(crate) hold_timer: Option<TimerHandle>,
    pub(crate) level_timer: Option<TimerHandle>,
}

impl ButtonState {
    pub(crate) fn cancel_hold_timer(&mut self) {
        if let Some(timer) = self.hold_timer.take() {
            timer.cancel();
        }
    }

    pub(crate) fn cancel_level_timer(&mut self) {
        if let Some(timer) = self.level_timer.take() {
            timer.cancel();
        }
    }

    pub(crate) fn cancel_timers(&mut self) {
        self.cancel_hold_timer();
        self.cancel_level_timer();
    }

    /// Back to the start of a click cycle: level 0, not zombified, no timers.
    /// The physical `pressed` flag is left alone; only edges move it.
    pub(crate) fn reset(&mut self) {
        self.cancel_timers();
        self.click_level = 0;
        self.zombified = false;
    }

    /// Freeze the record mid-press. The press has been consumed, so neither
    /// of its timers means anything anymore.
    pub(crate) fn zombify(&mut self) {
        debug_assert!(self.pressed, "only a pressed record can be zombified");
        self.cancel_timers();
        self.zombified = true;
    }

    pub(crate) fn snapshot(&self) -> ButtonSnapshot {
        ButtonSnapshot {
            click_level: self.click_level,
            pressed: self.pressed,
            zombified: self.zombified,
        }
    }
}

/// Read-only copy of a record's externally observable fields, for diagnostics
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSnapshot {
    pub click_level: u32,
    pub pressed: bool,
    pub zombified: bool,
}

impl ButtonSnapshot {
    pub fn is_idle(&self) -> bool {
        self.click_level == 0 && !self.pressed && !self.zombified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_level_and_zombie_but_not_pressed() {
        let mut state = ButtonState {
            click_level: 3,
            pressed: true,
            zombified: true,
            ..Default::default()
        };
        state.reset();
        assert_eq!(state.click_level, 0);
        assert!(!state.zombified);
        assert!(state.pressed);
    }

    #[test]
    fn test_zombify_keeps_click_level() {
        let mut state = ButtonState {
            click_level: 2,
            pressed: true,
            ..Default::default()
        };
        state.zombify();
        assert!(state.zombified);
        assert_eq!(state.click_level, 2);
    }

    #[test]
    fn test_snapshot_idle() {
        let state = ButtonState::default();
        assert!(state.snapshot().is_idle());
    }
}
