// Clickrs Capability Oracle
// Answers whether a click level can still produce a mapped effect

use std::collections::HashMap;

use crate::button::{ButtonNumber, DeviceId};

/// External capability query, consulted on every ButtonDown.
///
/// `can_still_produce_effect` answers: "could `candidate_level` or any deeper
/// click level of this button ever produce a mapped effect?" When it answers
/// `false`, the classifier collapses the click level back to 1 so the counter
/// cannot grow unboundedly on rapid clicking past the last meaningful level.
///
/// Implementations must be fast and side-effect-free: the oracle is consulted
/// inside the per-device serialized region and must not feed edges back in.
pub trait CapabilityOracle: Send + Sync {
    fn can_still_produce_effect(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        candidate_level: u32,
    ) -> bool;
}

/// Table-driven oracle: a global maximum meaningful click level with optional
/// per-(device, button) overrides.
///
/// This is what a remap-table assessment boils down to for most setups; hosts
/// with richer mapping landscapes implement [`CapabilityOracle`] directly.
#[derive(Debug, Clone)]
pub struct MaxClickLevel {
    default_max: u32,
    overrides: HashMap<(DeviceId, ButtonNumber), u32>,
}

impl MaxClickLevel {
    pub fn new(default_max: u32) -> Self {
        Self {
            default_max,
            overrides: HashMap::new(),
        }
    }

    /// Oracle that never caps: every click level might still map to something.
    pub fn unbounded() -> Self {
        Self::new(u32::MAX)
    }

    pub fn set_max(&mut self, device: DeviceId, button: ButtonNumber, max: u32) {
        self.overrides.insert((device, button), max);
    }

    pub fn max_for(&self, device: DeviceId, button: ButtonNumber) -> u32 {
        self.overrides
            .get(&(device, button))
            .copied()
            .unwrap_or(self.default_max)
    }
}

impl CapabilityOracle for MaxClickLevel {
    fn can_still_produce_effect(
        &self,
        device: DeviceId,
        button: ButtonNumber,
        candidate_level: u32,
    ) -> bool {
        candidate_level <= self.max_for(device, button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max() {
        let oracle = MaxClickLevel::new(2);
        let d = DeviceId::new(1);
        let b = ButtonNumber::new(1);
        assert!(oracle.can_still_produce_effect(d, b, 1));
        assert!(oracle.can_still_produce_effect(d, b, 2));
        assert!(!oracle.can_still_produce_effect(d, b, 3));
    }

    #[test]
    fn test_per_button_override() {
        let mut oracle = MaxClickLevel::new(1);
        let d = DeviceId::new(1);
        oracle.set_max(d, ButtonNumber::new(4), 3);
        assert!(!oracle.can_still_produce_effect(d, ButtonNumber::new(1), 2));
        assert!(oracle.can_still_produce_effect(d, ButtonNumber::new(4), 3));
        assert!(!oracle.can_still_produce_effect(d, ButtonNumber::new(4), 4));
    }

    #[test]
    fn test_unbounded_never_caps() {
        let oracle = MaxClickLevel::unbounded();
        assert!(oracle.can_still_produce_effect(DeviceId::new(1), ButtonNumber::new(1), 1_000_000));
    }
}
