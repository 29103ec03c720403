//! Placed devices (footprint instances) and their pads.

use boardkit_core::{NetId, Point, Rect};
use serde::{Deserialize, Serialize};

use super::layer::LayerId;
use super::shape::Shape;

/// A copper pad relative to its device origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub name: String,
    pub offset: Point,
    pub width: f64,
    pub height: f64,
    /// Plated drill; pads with a drill exist on every copper layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill: Option<f64>,
    #[serde(default)]
    pub net: Option<NetId>,
}

impl Pad {
    pub fn smd(name: &str, offset: Point, width: f64, height: f64) -> Self {
        Self {
            name: name.to_string(),
            offset,
            width,
            height,
            drill: None,
            net: None,
        }
    }

    pub fn tht(name: &str, offset: Point, size: f64, drill: f64) -> Self {
        Self {
            name: name.to_string(),
            offset,
            width: size,
            height: size,
            drill: Some(drill),
            net: None,
        }
    }
}

/// Text attached to a device, e.g. its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceText {
    pub text: String,
    pub offset: Point,
    pub height: f64,
}

/// Placement-ready description of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTemplate {
    pub name: String,
    pub pads: Vec<Pad>,
}

impl DeviceTemplate {
    pub fn is_placeable(&self) -> bool {
        !self.name.trim().is_empty()
            && self.pads.iter().all(|p| p.width > 0.0 && p.height > 0.0)
    }

    pub fn instantiate(&self, position: Point, rotation: f64, mirrored: bool) -> Device {
        Device {
            name: self.name.clone(),
            position,
            rotation,
            mirrored,
            pads: self.pads.clone(),
            texts: Device::default_texts(&self.pads),
        }
    }
}

/// Absolute geometry of one pad
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPad<'a> {
    pub index: usize,
    pub pad: &'a Pad,
    pub center: Point,
    pub outline: Vec<Point>,
    pub layers: Vec<LayerId>,
}

impl PlacedPad<'_> {
    pub fn shape(&self) -> Shape {
        Shape::Polygon {
            path: self.outline.clone(),
            margin: 0.0,
        }
    }

    pub fn on_layer(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub position: Point,
    /// Counter-clockwise rotation in degrees
    pub rotation: f64,
    /// Placed on the bottom side
    pub mirrored: bool,
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub texts: Vec<DeviceText>,
}

impl Device {
    /// Name and value texts above and below the pad area.
    pub fn default_texts(pads: &[Pad]) -> Vec<DeviceText> {
        let extent = pads
            .iter()
            .map(|p| p.offset.y.abs() + p.height / 2.0)
            .fold(0.0_f64, f64::max);
        vec![
            DeviceText {
                text: "{{NAME}}".to_string(),
                offset: Point::new(0.0, extent + 1.0),
                height: 1.0,
            },
            DeviceText {
                text: "{{VALUE}}".to_string(),
                offset: Point::new(0.0, -extent - 1.0),
                height: 1.0,
            },
        ]
    }

    /// Converts a device-relative offset to board coordinates.
    pub fn map(&self, offset: Point) -> Point {
        let local = if self.mirrored {
            Point::new(-offset.x, offset.y)
        } else {
            offset
        };
        (self.position + local).rotated_about(&self.position, self.rotation)
    }

    pub fn copper_side(&self) -> LayerId {
        if self.mirrored {
            LayerId::BottomCopper
        } else {
            LayerId::TopCopper
        }
    }

    pub fn silkscreen_side(&self) -> LayerId {
        if self.mirrored {
            LayerId::BottomSilkscreen
        } else {
            LayerId::TopSilkscreen
        }
    }

    pub fn placed_pads(&self) -> Vec<PlacedPad<'_>> {
        self.pads
            .iter()
            .enumerate()
            .map(|(index, pad)| {
                let (hw, hh) = (pad.width / 2.0, pad.height / 2.0);
                let outline = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
                    .iter()
                    .map(|&(dx, dy)| self.map(pad.offset + Point::new(dx, dy)))
                    .collect();
                let layers = if pad.drill.is_some() {
                    LayerId::COPPER.to_vec()
                } else {
                    vec![self.copper_side()]
                };
                PlacedPad {
                    index,
                    pad,
                    center: self.map(pad.offset),
                    outline,
                    layers,
                }
            })
            .collect()
    }

    pub fn bounds(&self) -> Rect {
        let pads = self.placed_pads();
        let points = pads.iter().flat_map(|p| p.outline.iter());
        Rect::from_points(points)
            .map(|r| r.including(&self.position))
            .unwrap_or_else(|| Rect::around(self.position, 0.5))
    }
}
