// Clickrs State Layer
// Button records and the per-device keyed store

mod record;
mod store;

pub use record::ButtonSnapshot;
pub use store::StateStore;

pub(crate) use record::ButtonState;
pub(crate) use store::DeviceButtons;
