//! Selection, drag-move and the structural edit requests.

use boardkit_core::{ItemId, Point, Rect};

use super::{
    CursorShape, EventResult, Preview, RequestOutcome, Tool, ToolContext, ToolKind, ToolRequest,
};
use crate::events::EditorEvent;
use crate::model::{BoardItem, Device, ItemData, LayerId, Polygon};
use crate::session::Clipboard;
use crate::undo::BoardCommand;

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// Dragging the unlocked part of the selection
    Moving {
        start: Point,
        ids: Vec<ItemId>,
        delta: Point,
    },
    Rubberband {
        start: Point,
        add: bool,
    },
}

#[derive(Debug)]
pub struct SelectTool {
    gesture: Gesture,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectTool {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    fn publish_selection(ctx: &ToolContext<'_>) {
        ctx.publish(EditorEvent::SelectionChanged(ctx.session.selected_ids()));
    }

    fn outcome(changed: bool) -> RequestOutcome {
        if changed {
            RequestOutcome::Handled
        } else {
            RequestOutcome::Ignored
        }
    }

    /// Modifies every unlocked selected item as one undo step.
    fn update_selected(
        ctx: &mut ToolContext<'_>,
        mut modify: impl FnMut(&mut BoardItem),
    ) -> RequestOutcome {
        let pairs: Vec<(BoardItem, BoardItem)> = ctx
            .session
            .unlocked_selection(ctx.document)
            .into_iter()
            .filter_map(|id| ctx.document.item(id).cloned())
            .map(|old| {
                let mut new = old.clone();
                modify(&mut new);
                (old, new)
            })
            .collect();
        Self::outcome(ctx.execute(BoardCommand::UpdateItems(pairs)))
    }

    /// Grid point at the centre of the selection.
    fn selection_center(ctx: &ToolContext<'_>) -> Option<Point> {
        ctx.session
            .selection_bounds(ctx.document)
            .map(|b| ctx.document.grid.snap(b.center()))
    }

    fn copy(ctx: &mut ToolContext<'_>) -> bool {
        let items: Vec<BoardItem> = ctx
            .session
            .selection()
            .iter()
            .filter_map(|id| ctx.document.item(*id).cloned())
            .collect();
        let Some(origin) = Self::selection_center(ctx) else {
            return false;
        };
        tracing::debug!("Copied {} item(s) to the clipboard", items.len());
        ctx.session.set_clipboard(Clipboard { items, origin });
        true
    }

    fn remove_selected(ctx: &mut ToolContext<'_>) -> bool {
        let ids = ctx.session.unlocked_selection(ctx.document);
        if ids.is_empty() {
            return false;
        }
        let removed = match BoardCommand::remove_ids(ctx.document, &ids) {
            Ok(cmd) => ctx.execute(cmd),
            Err(e) => {
                tracing::warn!("Cannot remove selection: {}", e);
                false
            }
        };
        if removed {
            ctx.session.retain_existing(ctx.document);
            Self::publish_selection(ctx);
        }
        removed
    }

    fn paste(ctx: &mut ToolContext<'_>) -> bool {
        let Some(clipboard) = ctx.session.clipboard() else {
            return false;
        };
        let step = ctx.document.grid.interval;
        let items = clipboard.instantiate(Point::new(step, step));
        if items.is_empty() {
            return false;
        }
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        if !ctx.execute(BoardCommand::AddItems(items)) {
            return false;
        }
        ctx.session.select(ids, false);
        Self::publish_selection(ctx);
        true
    }

    fn set_locked(ctx: &mut ToolContext<'_>, locked: bool) -> bool {
        let ids = ctx.session.selected_ids();
        match BoardCommand::set_locked(ctx.document, &ids, locked) {
            Ok(cmd) => ctx.execute(cmd),
            Err(e) => {
                tracing::warn!("Cannot change lock state: {}", e);
                false
            }
        }
    }

    fn import_graphics(ctx: &mut ToolContext<'_>, paths: &[Vec<Point>], layer: LayerId) -> bool {
        if !ctx.document.is_layer_enabled(layer) {
            ctx.status(format!("Layer {} is disabled", layer));
            return false;
        }
        let width = ctx.config.tools.polygon_width;
        let items: Vec<BoardItem> = paths
            .iter()
            .filter(|path| path.len() >= 2)
            .map(|path| {
                BoardItem::new(ItemData::Polygon(Polygon {
                    layer,
                    path: path.clone(),
                    width,
                    filled: false,
                }))
            })
            .collect();
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();
        if !ctx.execute(BoardCommand::AddItems(items)) {
            return false;
        }
        ctx.session.select(ids, false);
        Self::publish_selection(ctx);
        true
    }

    fn moved_preview(ctx: &ToolContext<'_>, ids: &[ItemId], delta: Point) -> Preview {
        Preview::Items(
            ids.iter()
                .filter_map(|id| ctx.document.item(*id).cloned())
                .map(|mut item| {
                    item.translate(delta);
                    item
                })
                .collect(),
        )
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn enter(&mut self, ctx: &mut ToolContext<'_>) {
        self.gesture = Gesture::Idle;
        ctx.cursor(CursorShape::Arrow);
    }

    fn leave(&mut self, ctx: &mut ToolContext<'_>) {
        self.gesture = Gesture::Idle;
        ctx.preview(Preview::None);
    }

    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        let add = ctx.modifiers.shift;
        match ctx.item_at(pos) {
            Some(id) if add => {
                ctx.session.toggle(id);
                Self::publish_selection(ctx);
            }
            Some(id) => {
                if !ctx.session.is_selected(id) && ctx.session.select([id], false) {
                    Self::publish_selection(ctx);
                }
                let ids = ctx.session.unlocked_selection(ctx.document);
                if !ids.is_empty() {
                    ctx.cursor(CursorShape::Move);
                    self.gesture = Gesture::Moving {
                        start: pos,
                        ids,
                        delta: Point::ORIGIN,
                    };
                }
            }
            None => {
                if !add && ctx.session.clear_selection() {
                    Self::publish_selection(ctx);
                }
                self.gesture = Gesture::Rubberband { start: pos, add };
            }
        }
        EventResult::Handled
    }

    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        match &mut self.gesture {
            Gesture::Idle => EventResult::Unhandled,
            Gesture::Moving { start, ids, delta } => {
                let snapped = ctx.snap(pos - *start);
                if !snapped.nearly_equal(delta, 1e-9) {
                    *delta = snapped;
                    ctx.preview(Self::moved_preview(ctx, ids, snapped));
                }
                EventResult::Handled
            }
            Gesture::Rubberband { start, .. } => {
                ctx.preview(Preview::Rubberband(Rect::from_corners(*start, pos)));
                EventResult::Handled
            }
        }
    }

    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => EventResult::Unhandled,
            Gesture::Moving { ids, delta, .. } => {
                ctx.preview(Preview::None);
                ctx.cursor(CursorShape::Arrow);
                ctx.execute(BoardCommand::MoveItems { ids, delta });
                EventResult::Handled
            }
            Gesture::Rubberband { start, add, .. } => {
                ctx.preview(Preview::None);
                let rect = Rect::from_corners(start, pos);
                let ids = ctx.document.items_in_rect(&rect);
                if ctx.session.select(ids, add) {
                    Self::publish_selection(ctx);
                }
                EventResult::Handled
            }
        }
    }

    fn double_click(&mut self, ctx: &mut ToolContext<'_>, pos: Point) -> EventResult {
        match ctx.item_at(pos) {
            Some(item) => {
                ctx.publish(EditorEvent::PropertiesRequested { item });
                EventResult::Handled
            }
            None => EventResult::Unhandled,
        }
    }

    fn abort(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.gesture != Gesture::Idle {
            self.gesture = Gesture::Idle;
            ctx.preview(Preview::None);
            ctx.cursor(CursorShape::Arrow);
            return true;
        }
        if ctx.session.clear_selection() {
            Self::publish_selection(ctx);
            return true;
        }
        false
    }

    fn request(&mut self, ctx: &mut ToolContext<'_>, request: &ToolRequest) -> RequestOutcome {
        if self.gesture != Gesture::Idle {
            return RequestOutcome::Ignored;
        }
        match request {
            ToolRequest::SelectAll => {
                let ids: Vec<ItemId> = ctx.document.items().map(|i| i.id).collect();
                let changed = ctx.session.select(ids, false);
                if changed {
                    Self::publish_selection(ctx);
                }
                Self::outcome(changed)
            }
            ToolRequest::Copy => Self::outcome(Self::copy(ctx)),
            ToolRequest::Cut => Self::outcome(Self::copy(ctx) && Self::remove_selected(ctx)),
            ToolRequest::Paste => Self::outcome(Self::paste(ctx)),
            ToolRequest::Remove => Self::outcome(Self::remove_selected(ctx)),
            ToolRequest::Rotate => match Self::selection_center(ctx) {
                Some(center) => Self::update_selected(ctx, |item| item.rotate(&center, 90.0)),
                None => RequestOutcome::Ignored,
            },
            ToolRequest::Flip => match Self::selection_center(ctx) {
                Some(center) => Self::update_selected(ctx, |item| item.flip(center.x)),
                None => RequestOutcome::Ignored,
            },
            ToolRequest::SnapToGrid => {
                let grid = ctx.document.grid;
                Self::update_selected(ctx, |item| {
                    if let Some(anchor) = item.vertices().first().copied() {
                        item.translate(grid.snap(anchor) - anchor);
                    }
                })
            }
            ToolRequest::ResetTexts => Self::update_selected(ctx, |item| {
                if let ItemData::Device(device) = &mut item.data {
                    device.texts = Device::default_texts(&device.pads);
                }
            }),
            ToolRequest::Lock => Self::outcome(Self::set_locked(ctx, true)),
            ToolRequest::Unlock => Self::outcome(Self::set_locked(ctx, false)),
            ToolRequest::EditProperties => match ctx.session.selection().iter().next() {
                Some(&item) => {
                    ctx.publish(EditorEvent::PropertiesRequested { item });
                    RequestOutcome::Handled
                }
                None => RequestOutcome::Ignored,
            },
            ToolRequest::ChangeLineWidth(steps) => {
                let delta = f64::from(*steps) * ctx.config.view.line_width_step;
                Self::update_selected(ctx, |item| {
                    if let Some(width) = item.line_width_mut() {
                        *width = (*width + delta).max(0.0);
                    }
                })
            }
            ToolRequest::ImportGraphics { paths, layer } => {
                Self::outcome(Self::import_graphics(ctx, paths, *layer))
            }
        }
    }
}
