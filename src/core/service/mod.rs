//! Cross-cutting services: the observability bus, trade persistence, and
//! the operator control surface.

mod bus;
mod control;
mod events;
mod store;

pub use bus::{EventBus, EventStream};
pub use control::{control_channel, ControlHandle, OperatorCommand};
pub use events::{Event, EVENT_SCHEMA_VERSION};
pub use store::{JsonlTradeStore, MemoryTradeStore, TradeStore};
