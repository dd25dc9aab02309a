// Clickrs Trigger Types
// Semantic trigger events emitted by the classifier, plus the sink interface

use std::fmt;

use crate::button::{ButtonNumber, DeviceId};

/// What kind of trigger the classifier derived from a raw edge or timer expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TriggerKind {
    /// A physical press, classified at the click level it reached.
    #[strum(serialize = "down")]
    Down,
    /// A physical release. Reports the click level that was active during
    /// the gesture, even when the release also cleared a zombie record.
    #[strum(serialize = "up")]
    Up,
    /// The press outlived the hold window and was consumed as a hold/modifier.
    #[strum(serialize = "hold-expired")]
    HoldExpired,
    /// The click cycle ended without a further press; multi-click is final.
    #[strum(serialize = "level-expired")]
    LevelExpired,
}

/// One classified trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub device: DeviceId,
    pub button: ButtonNumber,
    pub kind: TriggerKind,
    pub click_level: u32,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(device={}, button={}, level={})",
            self.kind, self.device, self.button, self.click_level
        )
    }
}

/// Whether the original hardware event should still reach the rest of the OS
/// after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassThrough {
    /// The dispatcher consumed the event; swallow the hardware edge.
    Suppress,
    /// Let the hardware edge continue unmodified. Safe default.
    #[default]
    Forward,
}

/// Consumer of classified triggers (the action dispatcher, externally owned).
///
/// Called with no internal locks held, so an implementation may synthesize new
/// edges synchronously; those re-enter the classifier as ordinary events.
pub trait TriggerSink: Send + Sync {
    fn handle(&self, trigger: &Trigger) -> PassThrough;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_display() {
        let trigger = Trigger {
            device: DeviceId::new(1),
            button: ButtonNumber::new(4),
            kind: TriggerKind::HoldExpired,
            click_level: 2,
        };
        assert_eq!(trigger.to_string(), "hold-expired(device=1, button=4, level=2)");
    }

    #[test]
    fn test_pass_through_default_is_forward() {
        assert_eq!(PassThrough::default(), PassThrough::Forward);
    }
}
