use boardkit_core::Point;

use super::{
    CursorShape, EventResult, Preview, RequestOutcome, Tool, ToolContext, ToolKind,
    ToolParameters, ToolRequest, ToolSetting,
};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, DeviceTemplate, ItemData};
use crate::undo::BoardCommand;

/// Places a single device, then asks to leave.
///
/// Without a template the tool idles: presses only show a hint.
#[derive(Debug)]
pub struct AddDeviceTool {
    template: Option<DeviceTemplate>,
    rotation: f64,
    mirrored: bool,
    cursor: Point,
}

impl AddDeviceTool {
    pub fn new(template: Option<DeviceTemplate>) -> Self {
        Self {
            template,
            rotation: 0.0,
            mirrored: false,
            cursor: Point::ORIGIN,
        }
    }

    pub fn template(&self) -> Option<&DeviceTemplate> {
        self.template.as_ref()
    }

    /// Loads a template for placement. Rejected templates leave the tool idle.
    pub fn set_template(&mut self, template: DeviceTemplate) -> EditorResult<()> {
        if !template.is_placeable() {
            self.template = None;
            return Err(EditorError::invalid(
                "device",
                format!("'{}' cannot be placed", template.name),
            ));
        }
        self.template = Some(template);
        self.rotation = 0.0;
        self.mirrored = false;
        Ok(())
    }

    fn device_at(&self, position: Point) -> Option<BoardItem> {
        self.template.as_ref().map(|t| {
            BoardItem::new(ItemData::Device(t.instantiate(
                position,
                self.rotation,
                self.mirrored,
            )))
        })
    }

    fn update_preview(&self, ctx: &ToolContext<'_>) {
        let preview = match self.device_at(self.cursor) {
            Some(item) => Preview::Items(vec![item]),
            None => Preview::None,
        };
        ctx.preview(preview);
    }
}

impl Tool for AddDeviceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddDevice
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        if self.template.is_none() {
            ctx.status("Choose a device to place");
        }
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.template = None;
        ctx.preview(Preview::None);
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::Device {
            template: self.template.as_ref().map(|t| t.name.clone()),
            rotation: self.rotation,
            mirrored: self.mirrored,
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.cursor = ctx.snap(pos);
        let Some(item) = self.device_at(self.cursor) else {
            ctx.status("Choose a device to place");
            return EventResult::Handled;
        };
        if ctx.execute(BoardCommand::AddItems(vec![item])) {
            EventResult::Leave
        } else {
            EventResult::Handled
        }
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        if self.template.is_none() {
            return EventResult::Unhandled;
        }
        self.cursor = ctx.snap(pos);
        self.update_preview(ctx);
        EventResult::Handled
    }

    fn right_up(&mut self, ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        if self.template.is_none() {
            return EventResult::Unhandled;
        }
        self.request(ctx, &ToolRequest::Rotate);
        EventResult::Handled
    }

    fn request(&mut self, ctx: &mut ToolContext<'_>, request: &ToolRequest) -> RequestOutcome {
        match request {
            ToolRequest::Rotate => self.rotation = (self.rotation + 90.0).rem_euclid(360.0),
            ToolRequest::Flip => {
                self.mirrored = !self.mirrored;
                self.rotation = (-self.rotation).rem_euclid(360.0);
            }
            _ => return RequestOutcome::Unsupported,
        }
        self.update_preview(ctx);
        ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        RequestOutcome::Handled
    }

    fn configure(&mut self, ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        let changed = match setting {
            ToolSetting::Rotation(rotation) if rotation.is_finite() => {
                let rotation = rotation.rem_euclid(360.0);
                std::mem::replace(&mut self.rotation, rotation) != rotation
            }
            ToolSetting::Rotation(_) => {
                return Err(EditorError::invalid("rotation", "must be finite"))
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
