// Clickrs Classifier
// The per-button trigger classification state machine

use std::sync::Arc;
use std::time::Instant;

use crate::button::{ButtonNumber, DeviceId};
use crate::config::ClickTiming;
use crate::modifiers::ButtonModifiers;
use crate::oracle::CapabilityOracle;
use crate::state::{ButtonSnapshot, DeviceButtons, StateStore};
use crate::timer::{TimerError, TimerExpiry, TimerHandle, TimerKind, TimerSubsystem};
use crate::trigger::{PassThrough, Trigger, TriggerKind, TriggerSink};

/// Errors surfaced to the edge feed
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A ButtonDown arrived for a record that is currently zombified. A
    /// zombie must only ever receive its matching ButtonUp next, so this
    /// means the upstream down/up pairing (or this machine) is broken.
    /// Recovery: log loudly, force-reset the record, reprocess the edge.
    #[error("ButtonDown for zombified button {button} on device {device}")]
    ProtocolViolation {
        device: DeviceId,
        button: ButtonNumber,
    },

    /// The underlying scheduler refused a timer. The transition is abandoned
    /// before any record mutation, no trigger is emitted, and the caller
    /// should forward the hardware event unmodified.
    #[error("timer scheduling failed: {0}")]
    Timer(#[from] TimerError),
}

/// Decodes raw button edges into click/hold/level triggers.
///
/// One engine serves any number of devices. All mutation for a device happens
/// under that device's mutex, for edges and timer expiries alike; the oracle
/// (contractually pure) is consulted inside that region, while the trigger
/// sink is only ever invoked after the lock is released so it may synthesize
/// new edges without deadlocking.
pub struct ButtonEngine {
    store: Arc<StateStore>,
    timers: TimerSubsystem,
    timing: ClickTiming,
    oracle: Arc<dyn CapabilityOracle>,
    sink: Arc<dyn TriggerSink>,
}

impl ButtonEngine {
    pub fn new(
        timing: ClickTiming,
        oracle: Arc<dyn CapabilityOracle>,
        sink: Arc<dyn TriggerSink>,
    ) -> Result<Arc<Self>, TimerError> {
        let engine = Arc::new(Self {
            store: Arc::new(StateStore::new()),
            timers: TimerSubsystem::spawn()?,
            timing,
            oracle,
            sink,
        });

        let weak = Arc::downgrade(&engine);
        engine.timers.set_handler(move |expiry| {
            if let Some(engine) = weak.upgrade() {
                engine.on_timer_expired(expiry);
            }
        });

        Ok(engine)
    }

    /// Sole entry point for raw hardware edges.
    ///
    /// Returns the sink's pass-through decision for the original event. On
    /// error the record is in a consistent state and no trigger was emitted;
    /// forwarding the hardware event is the safe default for the caller.
    pub fn on_edge(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        is_down: bool,
        timestamp: Instant,
    ) -> Result<PassThrough, EngineError> {
        if is_down {
            match self.process_down(device, button, timestamp) {
                Err(EngineError::ProtocolViolation { device, button }) => {
                    log::error!(
                        "protocol violation: ButtonDown for zombified button {button} on \
                         device {device}; force-resetting the record"
                    );
                    self.force_reset(device, button);
                    self.process_down(device, button, timestamp)
                }
                other => other,
            }
        } else {
            Ok(self.process_up(device, button))
        }
    }

    /// Device registry notification: tear down every record of the device.
    pub fn on_device_detached(&self, device: DeviceId) {
        self.store.remove_device(device);
    }

    /// Administrative reset of one record (level 0, zombie cleared, timers
    /// cancelled). Emits nothing.
    pub fn reset_button(&self, device: DeviceId, button: ButtonNumber) {
        if let Some(slot) = self.store.existing_device(device) {
            if let Some(state) = slot.lock().get_mut(button) {
                state.reset();
            }
        }
    }

    /// Read-only chord view over this engine's state.
    pub fn modifiers(&self) -> ButtonModifiers {
        ButtonModifiers::new(Arc::clone(&self.store))
    }

    pub fn snapshot(&self, device: DeviceId, button: ButtonNumber) -> Option<ButtonSnapshot> {
        self.store.snapshot(device, button)
    }

    pub fn timing(&self) -> ClickTiming {
        self.timing
    }

    fn process_down(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        timestamp: Instant,
    ) -> Result<PassThrough, EngineError> {
        let slot = self.store.device(device);
        let trigger = {
            let mut buttons = slot.lock();

            let (zombified, fresh_cycle) = {
                let state = buttons.get_or_create(button);
                (state.zombified, state.click_level == 0)
            };
            if zombified {
                return Err(EngineError::ProtocolViolation { device, button });
            }

            // Take both timers before committing anything. If the scheduler
            // fails here the whole transition is abandoned: no sibling has
            // been swept, the record is exactly as it was, no trigger fires.
            let hold = self.schedule(device, button, TimerKind::Hold)?;
            let level = match self.schedule(device, button, TimerKind::Level) {
                Ok(timer) => timer,
                Err(err) => {
                    hold.cancel();
                    return Err(err);
                }
            };

            // A fresh press cycle claims the device: every sibling that was
            // part of an earlier gesture gets neutralized in the same
            // critical section, so no one observes a half-neutralized device.
            if fresh_cycle {
                neutralize_siblings(&mut buttons, button);
            }

            let state = buttons.get_or_create(button);
            state.cancel_timers();
            state.hold_timer = Some(hold);
            state.level_timer = Some(level);
            state.pressed = true;
            state.pressed_at = Some(timestamp);
            state.click_level += 1;

            // Cap the counter once no deeper click level can map to anything,
            // so rapid clicking past the last meaningful level wraps back to
            // a fresh single click.
            if !self
                .oracle
                .can_still_produce_effect(device, button, state.click_level)
            {
                state.click_level = 1;
            }

            log::debug!(
                "button {button} down on device {device} at click level {}",
                state.click_level
            );
            Trigger {
                device,
                button,
                kind: TriggerKind::Down,
                click_level: state.click_level,
            }
        };

        Ok(self.sink.handle(&trigger))
    }

    fn process_up(&self, device: DeviceId, button: ButtonNumber) -> PassThrough {
        let slot = self.store.device(device);
        let trigger = {
            let mut buttons = slot.lock();
            let state = buttons.get_or_create(button);

            // A release always clears zombie status; the trigger still
            // reports the level the gesture had.
            let level_before = state.click_level;
            if state.zombified {
                state.reset();
            }

            state.pressed = false;
            // The hold window is meaningless once the button is up. The
            // level timer keeps running: it decides whether the next press
            // continues this click cycle.
            state.cancel_hold_timer();

            log::debug!("button {button} up on device {device} at click level {level_before}");
            Trigger {
                device,
                button,
                kind: TriggerKind::Up,
                click_level: level_before,
            }
        };

        self.sink.handle(&trigger)
    }

    fn on_timer_expired(&self, expiry: TimerExpiry) {
        // Detached while the expiry was in flight.
        let Some(slot) = self.store.existing_device(expiry.device) else {
            return;
        };

        let trigger = {
            let mut buttons = slot.lock();
            let Some(state) = buttons.get_mut(expiry.button) else {
                return;
            };

            match expiry.kind {
                TimerKind::Hold => {
                    // Stale if the record's slot no longer holds this timer:
                    // a cancel or reschedule raced the expiry delivery.
                    if state.hold_timer.as_ref().map(TimerHandle::id) != Some(expiry.id) {
                        return;
                    }
                    state.hold_timer = None;
                    if !state.pressed {
                        return;
                    }

                    let level = state.click_level;
                    state.zombify();
                    log::debug!(
                        "hold window expired for button {} on device {} at level {level}",
                        expiry.button,
                        expiry.device
                    );
                    Trigger {
                        device: expiry.device,
                        button: expiry.button,
                        kind: TriggerKind::HoldExpired,
                        click_level: level,
                    }
                }
                TimerKind::Level => {
                    if state.level_timer.as_ref().map(TimerHandle::id) != Some(expiry.id) {
                        return;
                    }
                    state.level_timer = None;
                    // Idempotent on an already-reset record.
                    if state.click_level == 0 {
                        return;
                    }

                    let level = state.click_level;
                    state.reset();
                    log::debug!(
                        "click cycle ended for button {} on device {} at level {level}",
                        expiry.button,
                        expiry.device
                    );
                    Trigger {
                        device: expiry.device,
                        button: expiry.button,
                        kind: TriggerKind::LevelExpired,
                        click_level: level,
                    }
                }
            }
        };

        // Timer-driven triggers have no hardware event to pass through; the
        // sink's decision only matters for edges.
        let _ = self.sink.handle(&trigger);
    }

    fn schedule(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        kind: TimerKind,
    ) -> Result<TimerHandle, EngineError> {
        let delay = match kind {
            TimerKind::Hold => self.timing.hold_delay(),
            TimerKind::Level => self.timing.level_delay(),
        };
        self.timers
            .schedule(device, button, kind, delay)
            .map_err(|err| {
                log::error!("failed to schedule {kind} timer for button {button} on device {device}: {err}");
                err.into()
            })
    }

    fn force_reset(&self, device: DeviceId, button: ButtonNumber) {
        if let Some(slot) = self.store.existing_device(device) {
            if let Some(state) = slot.lock().get_mut(button) {
                state.reset();
            }
        }
    }
}

/// Zombify every other pressed button on the device and reset the released
/// ones: a device carries at most one semantically live click sequence.
/// Records already at level 0 are neutral and stay untouched — freezing one
/// would leave a zombie with no click cycle behind it.
fn neutralize_siblings(buttons: &mut DeviceButtons, fresh: ButtonNumber) {
    for (&number, state) in buttons.iter_mut() {
        if number == fresh || state.click_level == 0 {
            continue;
        }
        if state.pressed {
            if !state.zombified {
                state.zombify();
            }
        } else {
            state.reset();
        }
    }
}
