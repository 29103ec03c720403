//! Board document model.

pub mod device;
pub mod document;
pub mod item;
pub mod layer;
pub mod shape;

pub use device::{Device, DeviceTemplate, DeviceText, Pad, PlacedPad};
pub use document::{ApprovalKey, Document, DrcSettings, Grid, Net};
pub use item::{
    BoardItem, Hole, ItemData, Plane, PlaneFragment, Polygon, StrokeText, Trace, Via, Zone,
    ZoneRules,
};
pub use layer::{Layer, LayerId};
pub use shape::Shape;
