use boardkit_core::Point;
use boardkit_settings::ToolDefaults;

use super::{
    positive, CursorShape, EventResult, Preview, Tool, ToolContext, ToolKind, ToolParameters,
    ToolSetting,
};
use crate::error::EditorResult;
use crate::model::{BoardItem, Hole, ItemData};
use crate::undo::BoardCommand;

/// Places non-plated holes
#[derive(Debug)]
pub struct AddHoleTool {
    diameter: f64,
}

impl AddHoleTool {
    pub fn new(defaults: &ToolDefaults) -> Self {
        Self {
            diameter: defaults.hole_diameter,
        }
    }

    fn hole_at(&self, position: Point) -> BoardItem {
        BoardItem::new(ItemData::Hole(Hole {
            position,
            diameter: self.diameter,
        }))
    }
}

impl Tool for AddHoleTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddHole
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        ctx.preview(Preview::None);
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::Hole {
            diameter: self.diameter,
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        let hole = self.hole_at(ctx.snap(pos));
        ctx.execute(BoardCommand::AddItems(vec![hole]));
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        ctx.preview(Preview::Items(vec![self.hole_at(ctx.snap(pos))]));
        EventResult::Handled
    }

    fn configure(&mut self, _ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        match setting {
            ToolSetting::HoleDiameter(d) => {
                let d = positive("hole diameter", d)?;
                Ok(std::mem::replace(&mut self.diameter, d) != d)
            }
            other => Err(other.unsupported()),
        }
    }
}
