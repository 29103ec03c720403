//! Outline drawing: free polygons, keep-out zones and copper planes.
//!
//! All three share the same interaction. A press adds a vertex, a press on
//! the last vertex or a double click finishes, and Escape keeps what was
//! fixed so far if it already forms a valid shape.

use boardkit_core::{NetId, Point};
use boardkit_settings::ToolDefaults;
use std::collections::BTreeSet;

use super::{
    non_negative, AvailabilityWatch, Choice, CursorShape, EventResult, Key, Preview, Tool,
    ToolContext, ToolKind, ToolParameters, ToolSetting,
};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, ItemData, LayerId, Plane, Polygon, Zone, ZoneRules};
use crate::undo::BoardCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    Polygon,
    Zone,
    Plane,
}

#[derive(Debug)]
pub struct DrawAreaTool {
    kind: AreaKind,
    vertices: Vec<Point>,
    cursor: Point,
    layers: Choice<LayerId>,
    // polygon
    width: f64,
    filled: bool,
    // zone
    zone_layers: BTreeSet<LayerId>,
    rules: ZoneRules,
    // plane
    nets: Choice<NetId>,
    last_net: Option<NetId>,
    plane_min_width: f64,
    plane_clearance: f64,
    keep_orphans: bool,
    watch: Option<AvailabilityWatch>,
}

impl DrawAreaTool {
    pub fn new(kind: AreaKind, defaults: &ToolDefaults) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            cursor: Point::ORIGIN,
            layers: Choice::new(Vec::new(), None),
            width: defaults.polygon_width,
            filled: defaults.polygon_filled,
            zone_layers: [LayerId::TopCopper].into(),
            rules: ZoneRules {
                no_copper: true,
                no_planes: true,
                no_exposure: true,
                no_devices: false,
            },
            nets: Choice::new(Vec::new(), None),
            last_net: None,
            plane_min_width: defaults.plane_min_width,
            plane_clearance: defaults.plane_clearance,
            keep_orphans: defaults.plane_keep_orphans,
            watch: None,
        }
    }

    pub fn area_kind(&self) -> AreaKind {
        self.kind
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn is_drawing(&self) -> bool {
        !self.vertices.is_empty()
    }

    fn available_layers(&self, ctx: &ToolContext<'_>) -> Vec<LayerId> {
        match self.kind {
            AreaKind::Polygon => ctx.enabled_layers(false),
            AreaKind::Zone | AreaKind::Plane => ctx.enabled_layers(true),
        }
    }

    fn refresh_choices(&mut self, ctx: &ToolContext<'_>) -> bool {
        let layers = self.layers.refresh(self.available_layers(ctx));
        let nets = self.nets.refresh(ctx.document.net_ids());
        let copper: BTreeSet<LayerId> = ctx.enabled_layers(true).into_iter().collect();
        let before = self.zone_layers.len();
        self.zone_layers.retain(|l| copper.contains(l));
        layers || nets || before != self.zone_layers.len()
    }

    fn sync(&mut self, ctx: &mut ToolContext<'_>) {
        if self.watch.as_ref().is_some_and(|w| w.take()) && self.refresh_choices(ctx) {
            ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        }
    }

    fn min_vertices(&self) -> usize {
        match self.kind {
            AreaKind::Polygon if !self.filled => 2,
            _ => 3,
        }
    }

    fn update_preview(&self, ctx: &ToolContext<'_>) {
        let mut path = self.vertices.clone();
        path.push(self.cursor);
        ctx.preview(Preview::Path(path));
    }

    /// Builds the item for the fixed vertices, if they form a valid shape.
    fn build_item(&self) -> Result<Option<BoardItem>, String> {
        if self.vertices.len() < self.min_vertices() {
            return Ok(None);
        }
        let data = match self.kind {
            AreaKind::Polygon => {
                let layer = self.layers.selected().copied().ok_or("No layer available")?;
                ItemData::Polygon(Polygon {
                    layer,
                    path: self.vertices.clone(),
                    width: self.width,
                    filled: self.filled,
                })
            }
            AreaKind::Zone => {
                if self.zone_layers.is_empty() {
                    return Err("Zone has no layers".to_string());
                }
                ItemData::Zone(Zone {
                    layers: self.zone_layers.clone(),
                    outline: self.vertices.clone(),
                    rules: self.rules,
                })
            }
            AreaKind::Plane => {
                let layer = self.layers.selected().copied().ok_or("No copper layer available")?;
                let net = self
                    .nets
                    .selected()
                    .copied()
                    .ok_or("The board has no net to connect the plane to")?;
                ItemData::Plane(Plane {
                    layer,
                    net: Some(net),
                    outline: self.vertices.clone(),
                    min_width: self.plane_min_width,
                    clearance: self.plane_clearance,
                    priority: 0,
                    keep_orphans: self.keep_orphans,
                })
            }
        };
        Ok(Some(BoardItem::new(data)))
    }

    /// Commits what was drawn and resets for the next shape.
    fn finish(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        let created = match self.build_item() {
            Ok(Some(item)) => {
                tracing::debug!("Adding {} with {} vertices", item.kind_name(), self.vertices.len());
                ctx.execute(BoardCommand::AddItems(vec![item]))
            }
            Ok(None) => false,
            Err(message) => {
                ctx.status(message);
                false
            }
        };
        self.vertices.clear();
        ctx.preview(Preview::None);
        created
    }
}

impl Tool for DrawAreaTool {
    fn kind(&self) -> ToolKind {
        match self.kind {
            AreaKind::Polygon => ToolKind::DrawPolygon,
            AreaKind::Zone => ToolKind::DrawZone,
            AreaKind::Plane => ToolKind::DrawPlane,
        }
    }

    fn sync_availability(&mut self, ctx: &mut ToolContext<'_>) {
        self.sync(ctx);
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        let preferred = match self.kind {
            AreaKind::Polygon => LayerId::TopSilkscreen,
            _ => LayerId::TopCopper,
        };
        self.layers = Choice::new(self.available_layers(ctx), Some(preferred));
        let preferred_net = self
            .last_net
            .filter(|n| ctx.document.net(*n).is_some())
            .or_else(|| ctx.document.net_with_most_items());
        self.nets = Choice::new(ctx.document.net_ids(), preferred_net);
        self.refresh_choices(ctx);
        self.watch = Some(AvailabilityWatch::new(ctx.bus));
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.vertices.clear();
        self.watch = None;
        ctx.preview(Preview::None);
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        match self.kind {
            AreaKind::Polygon => ToolParameters::Polygon {
                layers: self.layers.available().to_vec(),
                layer: self.layers.selected().copied(),
                width: self.width,
                filled: self.filled,
            },
            AreaKind::Zone => ToolParameters::Zone {
                layers: self.zone_layers.clone(),
                rules: self.rules,
            },
            AreaKind::Plane => ToolParameters::Plane {
                layers: self.layers.available().to_vec(),
                layer: self.layers.selected().copied(),
                nets: self.nets.available().to_vec(),
                net: self.nets.selected().copied(),
            },
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.sync(ctx);
        let pos = ctx.snap(pos);
        self.cursor = pos;
        if self.vertices.last().is_some_and(|last| last.nearly_equal(&pos, 1e-9)) {
            self.finish(ctx);
        } else {
            self.vertices.push(pos);
            self.update_preview(ctx);
        }
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.cursor = ctx.snap(pos);
        if self.is_drawing() {
            self.update_preview(ctx);
            EventResult::Handled
        } else {
            EventResult::Unhandled
        }
    }

    fn double_click(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        if !self.is_drawing() {
            return EventResult::Unhandled;
        }
        let pos = ctx.snap(pos);
        if self.vertices.last().is_some_and(|last| !last.nearly_equal(&pos, 1e-9)) {
            self.vertices.push(pos);
        }
        self.finish(ctx);
        EventResult::Handled
    }

    fn right_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        // Swallowed while drawing so the click does not leave the tool.
        EventResult::from_handled(self.is_drawing())
    }

    fn key_pressed(&mut self, ctx: &mut ToolContext<'_>, key: Key) -> EventResult {
        match key {
            Key::Enter if self.is_drawing() => {
                self.finish(ctx);
                EventResult::Handled
            }
            Key::Backspace if self.is_drawing() => {
                self.vertices.pop();
                if self.is_drawing() {
                    self.update_preview(ctx);
                } else {
                    ctx.preview(Preview::None);
                }
                EventResult::Handled
            }
            _ => EventResult::Unhandled,
        }
    }

    fn abort(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.is_drawing() {
            self.finish(ctx);
            true
        } else {
            false
        }
    }

    fn configure(&mut self, ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        self.sync(ctx);
        let changed = match (self.kind, setting) {
            (AreaKind::Polygon | AreaKind::Plane, ToolSetting::Layer(layer)) => {
                let changed = self.layers.selected() != Some(&layer);
                if !self.layers.set(layer) {
                    return Err(EditorError::InvalidLayer(layer));
                }
                changed
            }
            (AreaKind::Polygon, ToolSetting::Width(width)) => {
                let width = non_negative("width", width)?;
                std::mem::replace(&mut self.width, width) != width
            }
            (AreaKind::Polygon, ToolSetting::Filled(filled)) => {
                std::mem::replace(&mut self.filled, filled) != filled
            }
            (AreaKind::Zone, ToolSetting::ZoneLayers(layers)) => {
                let copper = ctx.enabled_layers(true);
                if let Some(bad) = layers.iter().find(|l| !copper.contains(l)) {
                    return Err(EditorError::InvalidLayer(*bad));
                }
                std::mem::replace(&mut self.zone_layers, layers.clone()) != layers
            }
            (AreaKind::Zone, ToolSetting::ZoneRules(rules)) => {
                std::mem::replace(&mut self.rules, rules) != rules
            }
            (AreaKind::Plane, ToolSetting::Net(Some(net))) => {
                let changed = self.nets.selected() != Some(&net);
                if !self.nets.set(net) {
                    return Err(EditorError::UnknownNet(net));
                }
                self.last_net = Some(net);
                changed
            }
            (AreaKind::Plane, ToolSetting::Net(None)) => return Err(EditorError::InvalidNet),
            (_, other) => return Err(other.unsupported()),
        };
        if self.is_drawing() {
            self.update_preview(ctx);
        }
        Ok(changed)
    }
}
