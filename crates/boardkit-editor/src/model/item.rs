//! Board items and the geometric operations tools apply to them.

use boardkit_core::geometry::{polygon_outline_distance, segment_distance};
use boardkit_core::{ItemId, NetId, Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::device::Device;
use super::layer::LayerId;
use super::shape::Shape;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub layer: LayerId,
    #[serde(default)]
    pub net: Option<NetId>,
    pub start: Point,
    pub end: Point,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Via {
    pub position: Point,
    pub size: f64,
    pub drill: f64,
    #[serde(default)]
    pub net: Option<NetId>,
}

/// Free polygon or polyline, e.g. silkscreen art or the board outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub layer: LayerId,
    pub path: Vec<Point>,
    pub width: f64,
    pub filled: bool,
}

impl Polygon {
    /// Filled polygons and paths ending where they start enclose an area.
    pub fn is_closed(&self) -> bool {
        self.path.len() >= 3
            && (self.filled
                || self
                    .path
                    .first()
                    .zip(self.path.last())
                    .is_some_and(|(a, b)| a.nearly_equal(b, 1e-6)))
    }

    /// Vertices of the enclosed area without a duplicated closing point.
    pub fn area_path(&self) -> Vec<Point> {
        let mut path = self.path.clone();
        if path.len() > 1
            && path
                .first()
                .zip(path.last())
                .is_some_and(|(a, b)| a.nearly_equal(b, 1e-6))
        {
            path.pop();
        }
        path
    }
}

/// Keep-out rules of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneRules {
    pub no_copper: bool,
    pub no_planes: bool,
    pub no_exposure: bool,
    pub no_devices: bool,
}

impl ZoneRules {
    pub fn any(&self) -> bool {
        self.no_copper || self.no_planes || self.no_exposure || self.no_devices
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub layers: BTreeSet<LayerId>,
    pub outline: Vec<Point>,
    pub rules: ZoneRules,
}

/// Copper pour; its actual copper is computed into fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub layer: LayerId,
    #[serde(default)]
    pub net: Option<NetId>,
    pub outline: Vec<Point>,
    pub min_width: f64,
    pub clearance: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub keep_orphans: bool,
}

/// Computed copper area of a plane: outline minus cutouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneFragment {
    pub outline: Vec<Point>,
    pub cutouts: Vec<Shape>,
}

impl PlaneFragment {
    pub fn contains(&self, p: &Point) -> bool {
        boardkit_core::geometry::point_in_polygon(p, &self.outline)
            && !self.cutouts.iter().any(|c| c.contains(p))
    }

    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(&self.outline)
    }
}

/// Non-plated hole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub position: Point,
    pub diameter: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeText {
    pub layer: LayerId,
    pub text: String,
    /// Bottom left corner before rotation
    pub position: Point,
    pub height: f64,
    pub stroke_width: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub mirrored: bool,
}

impl StrokeText {
    /// Approximate extent; glyph widths are taken as 0.8 of the height.
    pub fn outline(&self) -> Vec<Point> {
        let width = self.text.chars().count().max(1) as f64 * self.height * 0.8;
        let w = if self.mirrored { -width } else { width };
        [(0.0, 0.0), (w, 0.0), (w, self.height), (0.0, self.height)]
            .iter()
            .map(|&(dx, dy)| {
                (self.position + Point::new(dx, dy)).rotated_about(&self.position, self.rotation)
            })
            .collect()
    }
}

/// The payload of a board item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemData {
    Trace(Trace),
    Via(Via),
    Polygon(Polygon),
    Zone(Zone),
    Plane(Plane),
    Hole(Hole),
    StrokeText(StrokeText),
    Device(Device),
}

/// An item placed on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: ItemId,
    #[serde(default)]
    pub locked: bool,
    #[serde(flatten)]
    pub data: ItemData,
}

impl BoardItem {
    pub fn new(data: ItemData) -> Self {
        Self {
            id: ItemId::new(),
            locked: false,
            data,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.data {
            ItemData::Trace(_) => "trace",
            ItemData::Via(_) => "via",
            ItemData::Polygon(_) => "polygon",
            ItemData::Zone(_) => "zone",
            ItemData::Plane(_) => "plane",
            ItemData::Hole(_) => "hole",
            ItemData::StrokeText(_) => "text",
            ItemData::Device(_) => "device",
        }
    }

    /// Net the item belongs to; devices report none (their pads carry nets).
    pub fn net(&self) -> Option<NetId> {
        match &self.data {
            ItemData::Trace(t) => t.net,
            ItemData::Via(v) => v.net,
            ItemData::Plane(p) => p.net,
            _ => None,
        }
    }

    /// All nets referenced by the item, including pad nets.
    pub fn nets(&self) -> Vec<NetId> {
        match &self.data {
            ItemData::Device(d) => {
                let set: BTreeSet<NetId> = d.pads.iter().filter_map(|p| p.net).collect();
                set.into_iter().collect()
            }
            _ => self.net().into_iter().collect(),
        }
    }

    /// Layers the item occupies.
    pub fn layers(&self) -> BTreeSet<LayerId> {
        match &self.data {
            ItemData::Trace(t) => [t.layer].into(),
            ItemData::Via(_) | ItemData::Hole(_) => LayerId::COPPER.into_iter().collect(),
            ItemData::Polygon(p) => [p.layer].into(),
            ItemData::Zone(z) => z.layers.clone(),
            ItemData::Plane(p) => [p.layer].into(),
            ItemData::StrokeText(t) => [t.layer].into(),
            ItemData::Device(d) => {
                let mut layers: BTreeSet<LayerId> = d
                    .placed_pads()
                    .into_iter()
                    .flat_map(|p| p.layers)
                    .collect();
                layers.insert(d.silkscreen_side());
                layers
            }
        }
    }

    /// Copper layers the item occupies.
    pub fn copper_layers(&self) -> BTreeSet<LayerId> {
        self.layers().into_iter().filter(|l| l.is_copper()).collect()
    }

    /// Copper primitives of the item on `layer`. Planes report nothing; their copper is in fragments.
    pub fn copper_shapes(&self, layer: LayerId) -> Vec<(Option<NetId>, Shape)> {
        if !layer.is_copper() {
            return Vec::new();
        }
        match &self.data {
            ItemData::Trace(t) if t.layer == layer => vec![(
                t.net,
                Shape::Stadium {
                    a: t.start,
                    b: t.end,
                    radius: t.width / 2.0,
                },
            )],
            ItemData::Via(v) => vec![(
                v.net,
                Shape::Circle {
                    center: v.position,
                    radius: v.size / 2.0,
                },
            )],
            ItemData::Polygon(p) if p.layer == layer => {
                if p.is_closed() && p.filled {
                    vec![(
                        None,
                        Shape::Polygon {
                            path: p.area_path(),
                            margin: p.width / 2.0,
                        },
                    )]
                } else {
                    p.path
                        .windows(2)
                        .map(|w| {
                            (
                                None,
                                Shape::Stadium {
                                    a: w[0],
                                    b: w[1],
                                    radius: p.width / 2.0,
                                },
                            )
                        })
                        .collect()
                }
            }
            ItemData::Device(d) => d
                .placed_pads()
                .into_iter()
                .filter(|p| p.on_layer(layer))
                .map(|p| (p.pad.net, p.shape()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Plated or unplated drills as (center, diameter).
    pub fn drills(&self) -> Vec<(Point, f64)> {
        match &self.data {
            ItemData::Via(v) => vec![(v.position, v.drill)],
            ItemData::Hole(h) => vec![(h.position, h.diameter)],
            ItemData::Device(d) => d
                .placed_pads()
                .into_iter()
                .filter_map(|p| p.pad.drill.map(|drill| (p.center, drill)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn bounds(&self) -> Option<Rect> {
        match &self.data {
            ItemData::Trace(t) => Some(Rect::from_corners(t.start, t.end).expanded(t.width / 2.0)),
            ItemData::Via(v) => Some(Rect::around(v.position, v.size / 2.0)),
            ItemData::Polygon(p) => Rect::from_points(&p.path).map(|r| r.expanded(p.width / 2.0)),
            ItemData::Zone(z) => Rect::from_points(&z.outline),
            ItemData::Plane(p) => Rect::from_points(&p.outline),
            ItemData::Hole(h) => Some(Rect::around(h.position, h.diameter / 2.0)),
            ItemData::StrokeText(t) => Rect::from_points(&t.outline()),
            ItemData::Device(d) => Some(d.bounds()),
        }
    }

    /// Distance from `p` to the item's visible geometry, zero when on it.
    ///
    /// Areas (zones, planes) are only hit on their outline so that items
    /// inside them stay reachable.
    pub fn hit_distance(&self, p: &Point) -> f64 {
        let d = match &self.data {
            ItemData::Trace(t) => segment_distance(p, &t.start, &t.end) - t.width / 2.0,
            ItemData::Via(v) => p.distance(&v.position) - v.size / 2.0,
            ItemData::Polygon(poly) => {
                if poly.filled && poly.is_closed() {
                    boardkit_core::geometry::polygon_distance(p, &poly.area_path())
                } else {
                    poly.path
                        .windows(2)
                        .map(|w| segment_distance(p, &w[0], &w[1]))
                        .fold(f64::INFINITY, f64::min)
                        - poly.width / 2.0
                }
            }
            ItemData::Zone(z) => polygon_outline_distance(p, &z.outline),
            ItemData::Plane(pl) => polygon_outline_distance(p, &pl.outline),
            ItemData::Hole(h) => p.distance(&h.position) - h.diameter / 2.0,
            ItemData::StrokeText(t) => boardkit_core::geometry::polygon_distance(p, &t.outline()),
            ItemData::Device(d) => {
                let pads = d
                    .placed_pads()
                    .iter()
                    .map(|pad| pad.shape().distance_to_point(p))
                    .fold(f64::INFINITY, f64::min);
                pads.min(p.distance(&d.position) - 0.5)
            }
        };
        d.max(0.0)
    }

    /// Points other tools may snap to.
    pub fn vertices(&self) -> Vec<Point> {
        match &self.data {
            ItemData::Trace(t) => vec![t.start, t.end],
            ItemData::Via(v) => vec![v.position],
            ItemData::Polygon(p) => p.path.clone(),
            ItemData::Zone(z) => z.outline.clone(),
            ItemData::Plane(p) => p.outline.clone(),
            ItemData::Hole(h) => vec![h.position],
            ItemData::StrokeText(t) => vec![t.position],
            ItemData::Device(d) => {
                let mut v = vec![d.position];
                v.extend(d.placed_pads().iter().map(|p| p.center));
                v
            }
        }
    }

    pub fn translate(&mut self, delta: Point) {
        let mv = |p: &mut Point| *p = *p + delta;
        match &mut self.data {
            ItemData::Trace(t) => {
                mv(&mut t.start);
                mv(&mut t.end);
            }
            ItemData::Via(v) => mv(&mut v.position),
            ItemData::Polygon(p) => p.path.iter_mut().for_each(mv),
            ItemData::Zone(z) => z.outline.iter_mut().for_each(mv),
            ItemData::Plane(p) => p.outline.iter_mut().for_each(mv),
            ItemData::Hole(h) => mv(&mut h.position),
            ItemData::StrokeText(t) => mv(&mut t.position),
            ItemData::Device(d) => mv(&mut d.position),
        }
    }

    /// Rotates counter-clockwise about `center`.
    pub fn rotate(&mut self, center: &Point, degrees: f64) {
        let rot = |p: &mut Point| *p = p.rotated_about(center, degrees);
        match &mut self.data {
            ItemData::Trace(t) => {
                rot(&mut t.start);
                rot(&mut t.end);
            }
            ItemData::Via(v) => rot(&mut v.position),
            ItemData::Polygon(p) => p.path.iter_mut().for_each(rot),
            ItemData::Zone(z) => z.outline.iter_mut().for_each(rot),
            ItemData::Plane(p) => p.outline.iter_mut().for_each(rot),
            ItemData::Hole(h) => rot(&mut h.position),
            ItemData::StrokeText(t) => {
                rot(&mut t.position);
                t.rotation = (t.rotation + degrees).rem_euclid(360.0);
            }
            ItemData::Device(d) => {
                rot(&mut d.position);
                d.rotation = (d.rotation + degrees).rem_euclid(360.0);
            }
        }
    }

    /// Mirrors around the vertical axis `x = axis_x` and moves sided items to the other side.
    pub fn flip(&mut self, axis_x: f64) {
        let mir = |p: &mut Point| *p = p.mirrored_x(axis_x);
        match &mut self.data {
            ItemData::Trace(t) => {
                mir(&mut t.start);
                mir(&mut t.end);
                t.layer = t.layer.opposite_side();
            }
            ItemData::Via(v) => mir(&mut v.position),
            ItemData::Polygon(p) => {
                p.path.iter_mut().for_each(mir);
                p.layer = p.layer.opposite_side();
            }
            ItemData::Zone(z) => {
                z.outline.iter_mut().for_each(mir);
                z.layers = z.layers.iter().map(|l| l.opposite_side()).collect();
            }
            ItemData::Plane(p) => {
                p.outline.iter_mut().for_each(mir);
                p.layer = p.layer.opposite_side();
            }
            ItemData::Hole(h) => mir(&mut h.position),
            ItemData::StrokeText(t) => {
                mir(&mut t.position);
                t.layer = t.layer.opposite_side();
                t.mirrored = !t.mirrored;
                t.rotation = (-t.rotation).rem_euclid(360.0);
            }
            ItemData::Device(d) => {
                mir(&mut d.position);
                d.mirrored = !d.mirrored;
                d.rotation = (-d.rotation).rem_euclid(360.0);
            }
        }
    }

    /// Line width of items that have one.
    pub fn line_width_mut(&mut self) -> Option<&mut f64> {
        match &mut self.data {
            ItemData::Trace(t) => Some(&mut t.width),
            ItemData::Polygon(p) => Some(&mut p.width),
            _ => None,
        }
    }
}
