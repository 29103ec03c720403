use boardkit_core::Point;
use boardkit_settings::ToolDefaults;

use super::{
    positive, AvailabilityWatch, Choice, CursorShape, EventResult, Preview, RequestOutcome, Tool,
    ToolContext, ToolKind, ToolParameters, ToolRequest, ToolSetting,
};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, ItemData, LayerId, StrokeText};
use crate::undo::BoardCommand;

/// Places stroke texts; stays active after each placement.
#[derive(Debug)]
pub struct AddTextTool {
    layers: Choice<LayerId>,
    text: String,
    height: f64,
    stroke_width: f64,
    rotation: f64,
    mirrored: bool,
    cursor: Point,
    watch: Option<AvailabilityWatch>,
}

impl AddTextTool {
    pub fn new(defaults: &ToolDefaults) -> Self {
        Self {
            layers: Choice::new(Vec::new(), None),
            text: defaults.text.clone(),
            height: defaults.text_height,
            stroke_width: defaults.text_stroke_width,
            rotation: 0.0,
            mirrored: false,
            cursor: Point::ORIGIN,
            watch: None,
        }
    }

    fn sync(&mut self, ctx: &mut ToolContext<'_>) {
        if self.watch.as_ref().is_some_and(|w| w.take())
            && self.layers.refresh(ctx.enabled_layers(false))
        {
            ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        }
    }

    fn text_at(&self, position: Point) -> Option<BoardItem> {
        let layer = self.layers.selected().copied()?;
        Some(BoardItem::new(ItemData::StrokeText(StrokeText {
            layer,
            text: self.text.clone(),
            position,
            height: self.height,
            stroke_width: self.stroke_width,
            rotation: self.rotation,
            mirrored: self.mirrored,
        })))
    }

    fn update_preview(&self, ctx: &ToolContext<'_>) {
        let preview = match self.text_at(self.cursor) {
            Some(item) => Preview::Items(vec![item]),
            None => Preview::None,
        };
        ctx.preview(preview);
    }

    fn rotate(&mut self, ctx: &ToolContext<'_>) {
        self.rotation = (self.rotation + 90.0).rem_euclid(360.0);
        self.update_preview(ctx);
        ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
    }

    fn flip(&mut self, ctx: &ToolContext<'_>) {
        self.mirrored = !self.mirrored;
        self.rotation = (-self.rotation).rem_euclid(360.0);
        if let Some(layer) = self.layers.selected().copied() {
            self.layers.set(layer.opposite_side());
        }
        self.update_preview(ctx);
        ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
    }
}

impl Tool for AddTextTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddStrokeText
    }

    fn sync_availability(&mut self, ctx: &mut ToolContext<'_>) {
        self.sync(ctx);
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        let preferred = self.layers.selected().copied().or(Some(LayerId::TopSilkscreen));
        self.layers = Choice::new(ctx.enabled_layers(false), preferred);
        self.watch = Some(AvailabilityWatch::new(ctx.bus));
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.watch = None;
        ctx.preview(Preview::None);
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::Text {
            layers: self.layers.available().to_vec(),
            layer: self.layers.selected().copied(),
            text: self.text.clone(),
            height: self.height,
            rotation: self.rotation,
            mirrored: self.mirrored,
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.sync(ctx);
        self.cursor = ctx.snap(pos);
        match self.text_at(self.cursor) {
            Some(item) => {
                ctx.execute(BoardCommand::AddItems(vec![item]));
            }
            None => ctx.status("No layer available for the text"),
        }
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.cursor = ctx.snap(pos);
        self.update_preview(ctx);
        EventResult::Handled
    }

    fn right_up(&mut self, ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        self.rotate(ctx);
        EventResult::Handled
    }

    fn request(&mut self, ctx: &mut ToolContext<'_>, request: &ToolRequest) -> RequestOutcome {
        match request {
            ToolRequest::Rotate => self.rotate(ctx),
            ToolRequest::Flip => self.flip(ctx),
            _ => return RequestOutcome::Unsupported,
        }
        RequestOutcome::Handled
    }

    fn configure(&mut self, ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        self.sync(ctx);
        let changed = match setting {
            ToolSetting::Layer(layer) => {
                let changed = self.layers.selected() != Some(&layer);
                if !self.layers.set(layer) {
                    return Err(EditorError::InvalidLayer(layer));
                }
                changed
            }
            ToolSetting::Text(text) => {
                if text.trim().is_empty() {
                    return Err(EditorError::invalid("text", "must not be empty"));
                }
                std::mem::replace(&mut self.text, text.clone()) != text
            }
            ToolSetting::TextHeight(height) => {
                let height = positive("text height", height)?;
                std::mem::replace(&mut self.height, height) != height
            }
            ToolSetting::Width(width) => {
                let width = positive("stroke width", width)?;
                std::mem::replace(&mut self.stroke_width, width) != width
            }
            ToolSetting::Rotation(rotation) => {
                if !rotation.is_finite() {
                    return Err(EditorError::invalid("rotation", "must be finite"));
                }
                let rotation = rotation.rem_euclid(360.0);
                std::mem::replace(&mut self.rotation, rotation) != rotation
            }
            ToolSetting::Mirrored(mirrored) => {
                std::mem::replace(&mut self.mirrored, mirrored) != mirrored
            }
            other => return Err(other.unsupported()),
        };
        self.update_preview(ctx);
        Ok(changed)
    }
}
