//! Poll lifecycle events
//!
//! # Architecture
//!
//! 1. **Event Types** (`types.rs`): the events a poll emits from activation
//!    to deactivation.
//!
//! 2. **Event Bus** (`bus.rs`): Tokio broadcast-based pub/sub that the
//!    coordinator publishes to from its frame tick.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Coordinator  │────▶│  Event Bus   │────▶│  Subscribers │
//! │   (tick)     │     │  (broadcast) │     │ (display/log)│
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use poll_coordination::events::{EventBus, EventBusExt, EventFilter};
//!
//! let bus = EventBus::new().shared();
//! let mut shown = bus.subscribe_filtered(
//!     EventFilter::new().types(vec!["poll_activated", "poll_deactivated"]),
//! );
//!
//! let coordinator = Coordinator::new(settings).with_event_bus(bus.clone());
//! let event = shown.recv().await?;
//! ```

pub mod bus;
pub mod types;

pub use bus::{
    EventBus, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver,
    SharedEventBus,
};
pub use types::{DeactivationReason, PollEvent};
