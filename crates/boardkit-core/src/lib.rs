//! # BoardKit Core
//!
//! Core types and utilities for BoardKit: identifiers, planar geometry,
//! the generic event bus and the root error type.

pub mod error;
pub mod event_bus;
pub mod geometry;
pub mod types;

pub use error::{Error, GeometryError, Result};

pub use event_bus::{
    BusEvent, EventBus, EventBusConfig, EventBusError, EventFilter, SubscriptionGuard,
    SubscriptionId,
};

pub use geometry::{hit_tolerance, snap_to_grid, Point, Rect};

pub use types::{ItemId, NetId, StateId};
