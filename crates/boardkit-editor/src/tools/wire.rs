//! Trace routing tool.

use boardkit_core::{NetId, Point};
use boardkit_settings::{ToolDefaults, WireMode};

use super::{
    positive, AvailabilityWatch, Choice, CursorShape, EventResult, Key, Preview, Tool,
    ToolContext, ToolKind, ToolParameters, ToolSetting,
};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, ItemData, LayerId, Trace};
use crate::undo::BoardCommand;

/// Corner point between `p1` and `p2` for the given routing mode.
///
/// `Straight` returns `p1`, producing a single segment.
pub fn middle_point(mode: WireMode, p1: Point, p2: Point) -> Point {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let (sx, sy) = (dx.signum(), dy.signum());
    match mode {
        WireMode::HorizontalVertical => Point::new(p2.x, p1.y),
        WireMode::VerticalHorizontal => Point::new(p1.x, p2.y),
        WireMode::Deg9045 => {
            if dx.abs() >= dy.abs() {
                Point::new(p2.x - dy.abs() * sx, p1.y)
            } else {
                Point::new(p1.x, p2.y - dx.abs() * sy)
            }
        }
        WireMode::Deg4590 => {
            if dx.abs() >= dy.abs() {
                Point::new(p1.x + dy.abs() * sx, p2.y)
            } else {
                Point::new(p2.x, p1.y + dx.abs() * sy)
            }
        }
        WireMode::Straight => p1,
    }
}

/// Segment in progress
#[derive(Debug, Clone, Copy, PartialEq)]
struct Positioning {
    start: Point,
    net: Option<NetId>,
}

#[derive(Debug)]
pub struct DrawWireTool {
    mode: WireMode,
    width: f64,
    layers: Choice<LayerId>,
    nets: Choice<Option<NetId>>,
    positioning: Option<Positioning>,
    cursor: Point,
    watch: Option<AvailabilityWatch>,
}

impl DrawWireTool {
    pub fn new(defaults: &ToolDefaults) -> Self {
        Self {
            mode: defaults.wire_mode,
            width: defaults.trace_width,
            layers: Choice::new(Vec::new(), None),
            nets: Choice::new(vec![None], None),
            positioning: None,
            cursor: Point::ORIGIN,
            watch: None,
        }
    }

    pub fn mode(&self) -> WireMode {
        self.mode
    }

    pub fn is_positioning(&self) -> bool {
        self.positioning.is_some()
    }

    fn layer(&self) -> Option<LayerId> {
        self.layers.selected().copied()
    }

    fn refresh_choices(&mut self, ctx: &ToolContext<'_>) -> bool {
        let layers = self.layers.refresh(ctx.enabled_layers(true));
        let nets = self.nets.refresh(ctx.optional_nets());
        layers || nets
    }

    fn sync(&mut self, ctx: &mut ToolContext<'_>) {
        if self.watch.as_ref().is_some_and(|w| w.take()) && self.refresh_choices(ctx) {
            ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        }
    }

    /// Snapped target position and, if it hit existing copper, that copper's net.
    fn resolve(&self, ctx: &ToolContext<'_>, pos: Point) -> (Point, Option<Option<NetId>>) {
        if !ctx.modifiers.shift {
            if let Some(layer) = self.layer() {
                if let Some((p, net)) = ctx.document.copper_anchor_at(&pos, ctx.tolerance(), layer) {
                    return (p, Some(net));
                }
            }
        }
        (ctx.snap(pos), None)
    }

    /// Trace segments from the start to `target`, without zero length ones.
    fn segments(&self, positioning: &Positioning, target: Point) -> Vec<BoardItem> {
        let Some(layer) = self.layer() else {
            return Vec::new();
        };
        let middle = middle_point(self.mode, positioning.start, target);
        [(positioning.start, middle), (middle, target)]
            .into_iter()
            .filter(|(a, b)| !a.nearly_equal(b, boardkit_core::geometry::EPSILON))
            .map(|(start, end)| {
                BoardItem::new(ItemData::Trace(Trace {
                    layer,
                    net: positioning.net,
                    start,
                    end,
                    width: self.width,
                }))
            })
            .collect()
    }

    fn update_preview(&self, ctx: &ToolContext<'_>) {
        if let Some(positioning) = &self.positioning {
            let (target, _) = self.resolve(ctx, self.cursor);
            ctx.preview(Preview::Items(self.segments(positioning, target)));
        }
    }

    fn start_positioning(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> bool {
        let Some(layer) = self.layer() else {
            ctx.status("No copper layer available");
            return false;
        };
        if let Err(e) = ctx.undo.begin_group("Draw trace") {
            tracing::warn!("Cannot start trace: {}", e);
            return false;
        }
        let (start, anchor) = self.resolve(ctx, pos);
        let selected = self.nets.selected().copied().flatten();
        let net = anchor.flatten().or(selected);
        tracing::debug!("Start trace on {} at {}", layer, start);
        self.positioning = Some(Positioning { start, net });
        self.cursor = pos;
        self.update_preview(ctx);
        true
    }

    /// Commits the segment to `pos`. Returns false if the wire is finished.
    fn add_next_point(&mut self, ctx: &mut ToolContext<'_>, pos: Point, finish: bool) -> bool {
        let Some(positioning) = self.positioning else {
            return false;
        };
        self.cursor = pos;
        let (target, anchor) = self.resolve(ctx, pos);
        if target.nearly_equal(&positioning.start, boardkit_core::geometry::EPSILON) {
            self.abort_positioning(ctx);
            return false;
        }
        let mut positioning = positioning;
        if positioning.net.is_none() {
            positioning.net = anchor.flatten();
        }
        let segments = self.segments(&positioning, target);
        let result = ctx
            .undo
            .append_to_group(BoardCommand::AddItems(segments), ctx.document)
            .and_then(|_| ctx.undo.commit_group());
        if let Err(e) = result {
            tracing::warn!("Failed to add trace: {}", e);
            ctx.status(e.to_string());
            self.abort_positioning(ctx);
            return false;
        }
        self.positioning = None;
        if finish || anchor.is_some() {
            ctx.preview(Preview::None);
            return false;
        }
        // Continue from the end point in a new group.
        match ctx.undo.begin_group("Draw trace") {
            Ok(()) => {
                self.positioning = Some(Positioning {
                    start: target,
                    net: positioning.net,
                });
                self.update_preview(ctx);
                true
            }
            Err(e) => {
                tracing::warn!("Cannot continue trace: {}", e);
                ctx.preview(Preview::None);
                false
            }
        }
    }

    fn abort_positioning(&mut self, ctx: &mut ToolContext<'_>) {
        if self.positioning.take().is_some() {
            ctx.abort_group();
        }
        ctx.preview(Preview::None);
    }
}

impl Tool for DrawWireTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DrawWire
    }

    fn sync_availability(&mut self, ctx: &mut ToolContext<'_>) {
        self.sync(ctx);
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        self.layers = Choice::new(ctx.enabled_layers(true), Some(LayerId::TopCopper));
        self.nets = Choice::new(ctx.optional_nets(), None);
        self.watch = Some(AvailabilityWatch::new(ctx.bus));
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.abort_positioning(ctx);
        self.watch = None;
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::Wire {
            mode: self.mode,
            layers: self.layers.available().to_vec(),
            layer: self.layer(),
            nets: self.nets.available().to_vec(),
            net: self.nets.selected().copied().flatten(),
            width: self.width,
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.sync(ctx);
        if self.positioning.is_some() {
            self.add_next_point(ctx, pos, false);
            EventResult::Handled
        } else {
            self.start_positioning(ctx, pos);
            EventResult::Handled
        }
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.cursor = pos;
        if self.positioning.is_some() {
            self.update_preview(ctx);
            EventResult::Handled
        } else {
            EventResult::Unhandled
        }
    }

    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        // Releasing away from the anchor behaves like a click there.
        match self.positioning {
            Some(p) => {
                let (target, _) = self.resolve(ctx, pos);
                if !target.nearly_equal(&p.start, boardkit_core::geometry::EPSILON) {
                    self.add_next_point(ctx, pos, false);
                }
                EventResult::Handled
            }
            None => EventResult::Unhandled,
        }
    }

    fn double_click(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        if self.positioning.is_some() {
            self.add_next_point(ctx, pos, true);
            EventResult::Handled
        } else {
            EventResult::Unhandled
        }
    }

    fn right_up(&mut self, ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        if self.positioning.is_none() {
            return EventResult::Unhandled;
        }
        self.mode = self.mode.next();
        self.update_preview(ctx);
        ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        EventResult::Handled
    }

    fn key_pressed(&mut self, ctx: &mut ToolContext<'_>, key: Key) -> EventResult {
        match key {
            Key::Shift if self.positioning.is_some() => {
                self.update_preview(ctx);
                EventResult::Handled
            }
            _ => EventResult::Unhandled,
        }
    }

    fn key_released(&mut self, ctx: &mut ToolContext<'_>, key: Key) -> EventResult {
        self.key_pressed(ctx, key)
    }

    fn abort(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.positioning.is_some() {
            self.abort_positioning(ctx);
            true
        } else {
            false
        }
    }

    fn configure(&mut self, ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        self.sync(ctx);
        match setting {
            ToolSetting::WireMode(mode) => {
                let changed = mode != self.mode;
                self.mode = mode;
                self.update_preview(ctx);
                Ok(changed)
            }
            ToolSetting::Layer(layer) => {
                let changed = self.layer() != Some(layer);
                if !self.layers.set(layer) {
                    return Err(EditorError::InvalidLayer(layer));
                }
                self.update_preview(ctx);
                Ok(changed)
            }
            ToolSetting::Net(net) => {
                let changed = self.nets.selected() != Some(&net);
                if !self.nets.set(net) {
                    return Err(EditorError::InvalidNet);
                }
                Ok(changed)
            }
            ToolSetting::Width(width) => {
                let width = positive("width", width)?;
                let changed = width != self.width;
                self.width = width;
                self.update_preview(ctx);
                Ok(changed)
            }
            other => Err(other.unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_middle_point_table() {
        let (a, b) = (p(0.0, 0.0), p(10.0, 4.0));
        assert_eq!(middle_point(WireMode::HorizontalVertical, a, b), p(10.0, 0.0));
        assert_eq!(middle_point(WireMode::VerticalHorizontal, a, b), p(0.0, 4.0));
        assert_eq!(middle_point(WireMode::Deg9045, a, b), p(6.0, 0.0));
        assert_eq!(middle_point(WireMode::Deg4590, a, b), p(4.0, 4.0));
        assert_eq!(middle_point(WireMode::Straight, a, b), a);
    }

    #[test]
    fn test_middle_point_steep_and_negative() {
        let (a, b) = (p(0.0, 0.0), p(-2.0, -6.0));
        assert_eq!(middle_point(WireMode::Deg9045, a, b), p(0.0, -4.0));
        assert_eq!(middle_point(WireMode::Deg4590, a, b), p(-2.0, -2.0));
    }
}
