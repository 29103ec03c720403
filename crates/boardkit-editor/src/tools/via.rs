use boardkit_core::{NetId, Point};
use boardkit_settings::ToolDefaults;

use super::{
    positive, AvailabilityWatch, Choice, CursorShape, EventResult, Preview, Tool, ToolContext,
    ToolKind, ToolParameters, ToolSetting,
};
use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, ItemData, LayerId, Via};
use crate::undo::BoardCommand;

/// Places vias; stays active after each placement.
#[derive(Debug)]
pub struct AddViaTool {
    size: f64,
    drill: f64,
    nets: Choice<Option<NetId>>,
    auto_net: bool,
    cursor: Point,
    watch: Option<AvailabilityWatch>,
}

impl AddViaTool {
    pub fn new(defaults: &ToolDefaults) -> Self {
        Self {
            size: defaults.via_size,
            drill: defaults.via_drill,
            nets: Choice::new(vec![None], None),
            auto_net: true,
            cursor: Point::ORIGIN,
            watch: None,
        }
    }

    fn sync(&mut self, ctx: &mut ToolContext<'_>) {
        if self.watch.as_ref().is_some_and(|w| w.take()) && self.nets.refresh(ctx.optional_nets())
        {
            ctx.publish(EditorEvent::ParametersChanged(self.parameters()));
        }
    }

    /// Net of the copper under `pos` on any copper layer.
    fn detect_net(ctx: &ToolContext<'_>, pos: &Point) -> Option<NetId> {
        LayerId::COPPER.into_iter().find_map(|layer| {
            ctx.document
                .items()
                .flat_map(|item| item.copper_shapes(layer))
                .find(|(net, shape)| net.is_some() && shape.contains(pos))
                .and_then(|(net, _)| net)
        })
    }

    fn via_at(&self, ctx: &ToolContext<'_>, pos: Point) -> BoardItem {
        let net = if self.auto_net {
            Self::detect_net(ctx, &pos)
        } else {
            self.nets.selected().copied().flatten()
        };
        BoardItem::new(ItemData::Via(Via {
            position: pos,
            size: self.size,
            drill: self.drill,
            net,
        }))
    }
}

impl Tool for AddViaTool {
    fn kind(&self) -> ToolKind {
        ToolKind::AddVia
    }

    fn sync_availability(&mut self, ctx: &mut ToolContext<'_>) {
        self.sync(ctx);
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        let preferred = self.nets.selected().copied();
        self.nets = Choice::new(ctx.optional_nets(), preferred);
        self.watch = Some(AvailabilityWatch::new(ctx.bus));
        ctx.cursor(CursorShape::Cross);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.watch = None;
        ctx.preview(Preview::None);
        ctx.cursor(CursorShape::Arrow);
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::Via {
            size: self.size,
            drill: self.drill,
            nets: self.nets.available().to_vec(),
            net: self.nets.selected().copied().flatten(),
            auto_net: self.auto_net,
        }
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.sync(ctx);
        let pos = ctx.snap(pos);
        let via = self.via_at(ctx, pos);
        ctx.execute(BoardCommand::AddItems(vec![via]));
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        self.cursor = ctx.snap(pos);
        ctx.preview(Preview::Items(vec![self.via_at(ctx, self.cursor)]));
        EventResult::Handled
    }

    fn configure(&mut self, ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        self.sync(ctx);
        match setting {
            ToolSetting::ViaSize(size) => {
                let size = positive("via size", size)?;
                if self.drill >= size {
                    return Err(EditorError::invalid("via size", "must exceed the drill"));
                }
                Ok(std::mem::replace(&mut self.size, size) != size)
            }
            ToolSetting::ViaDrill(drill) => {
                let drill = positive("via drill", drill)?;
                if drill >= self.size {
                    return Err(EditorError::invalid("via drill", "must be smaller than the via"));
                }
                Ok(std::mem::replace(&mut self.drill, drill) != drill)
            }
            ToolSetting::Net(net) => {
                let changed = self.nets.selected() != Some(&net) || self.auto_net;
                if !self.nets.set(net) {
                    return Err(EditorError::InvalidNet);
                }
                self.auto_net = false;
                Ok(changed)
            }
            ToolSetting::AutoNet(auto) => Ok(std::mem::replace(&mut self.auto_net, auto) != auto),
            other => Err(other.unsupported()),
        }
    }
}
