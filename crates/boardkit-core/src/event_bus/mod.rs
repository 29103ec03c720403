//! # Event Bus Module
//!
//! Publish/subscribe plumbing for decoupled communication between the
//! editor core and whatever view layer drives it.
//!
//! - Publishers emit typed events without knowing subscribers
//! - Subscribers filter by category and receive events of interest
//! - Handlers can be scoped with a [`SubscriptionGuard`] that detaches on drop
//! - Async consumers can poll a tokio broadcast receiver instead
//!
//! There is no process-wide instance. Every owner constructs its bus and
//! shares it with `Arc`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boardkit_core::event_bus::{EventBus, EventFilter};
//!
//! let bus = EventBus::<MyEvent>::new();
//! let guard = bus.subscribe_scoped(EventFilter::All, |event| {
//!     println!("event: {:?}", event);
//! });
//! bus.publish(MyEvent::Ping).ok();
//! drop(guard); // handler detached
//! ```

mod bus;

pub use bus::*;

/// An event type that can travel over an [`EventBus`].
pub trait BusEvent: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Coarse grouping used by [`EventFilter::Categories`].
    type Category: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static;

    /// Category of this event.
    fn category(&self) -> Self::Category;
}
