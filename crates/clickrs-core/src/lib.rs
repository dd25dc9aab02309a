// Clickrs Core Library
// Button trigger classification for pointing-device remapping

pub mod button;
pub mod classifier;
pub mod config;
pub mod modifiers;
pub mod oracle;
pub mod state;
pub mod timer;
pub mod trigger;

pub use button::{ButtonNumber, DeviceId};
pub use classifier::{ButtonEngine, EngineError};
pub use config::{ClickTiming, ConfigError};
pub use modifiers::{ActiveModifier, ButtonModifiers, ModifierChord};
pub use oracle::{CapabilityOracle, MaxClickLevel};
pub use state::{ButtonSnapshot, StateStore};
pub use timer::{TimerError, TimerExpiry, TimerHandle, TimerKind, TimerSubsystem};
pub use trigger::{PassThrough, Trigger, TriggerKind, TriggerSink};
