//! Tool state machine.
//!
//! Owns the active tool and routes view input to it. Exactly one tool is
//! active at any time; switching runs the old tool's leave hook before the
//! new tool's enter hook.

use boardkit_core::Point;
use boardkit_settings::Config;

use crate::error::EditorResult;
use crate::events::EditorEvent;
use crate::model::DeviceTemplate;
use crate::tools::{
    AddDeviceTool, EventResult, Key, Modifiers, RequestOutcome, Tool, ToolContext, ToolKind,
    ToolRequest, ToolSetting, ToolState,
};

#[derive(Debug)]
pub struct ToolFsm {
    state: ToolState,
    previous: Option<ToolKind>,
    modifiers: Modifiers,
}

impl ToolFsm {
    /// Starts in Select. Call [`ToolFsm::start`] once a context is available.
    pub fn new(config: &Config) -> Self {
        Self {
            state: ToolState::create(ToolKind::Select, config),
            previous: None,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn current(&self) -> ToolKind {
        self.state.kind()
    }

    pub fn state(&self) -> &ToolState {
        &self.state
    }

    /// Tool an unhandled right click in Select returns to.
    pub fn previous(&self) -> Option<ToolKind> {
        self.previous
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn tool(&self) -> &dyn Tool {
        self.state.tool()
    }

    /// Runs the enter hook of the initial tool.
    pub fn start(&mut self, ctx: &mut ToolContext<'_>) {
        self.state.tool_mut().enter(ctx);
        self.publish_tool(ctx);
    }

    fn publish_tool(&self, ctx: &ToolContext<'_>) {
        let kind = self.current();
        ctx.publish(EditorEvent::ToolChanged {
            tool: kind,
            capabilities: kind.capabilities(),
            parameters: self.state.tool().parameters(),
        });
    }

    fn switch_to(&mut self, next: ToolState, ctx: &mut ToolContext<'_>) {
        let old = self.current();
        self.state.tool_mut().leave(ctx);
        ctx.preview(Default::default());
        ctx.overlay(None);
        if !matches!(old, ToolKind::Select | ToolKind::AddDevice) {
            self.previous = Some(old);
        }
        self.state = next;
        tracing::debug!("Tool {} -> {}", old, self.current());
        self.state.tool_mut().enter(ctx);
        self.publish_tool(ctx);
    }

    /// Makes `kind` the active tool. Activating the current tool does nothing.
    pub fn activate(&mut self, kind: ToolKind, ctx: &mut ToolContext<'_>) -> bool {
        if kind != self.current() {
            let next = ToolState::create(kind, ctx.config);
            self.switch_to(next, ctx);
        }
        true
    }

    /// Switches to the device tool loaded with `template`.
    ///
    /// A template that cannot be placed sends the machine back to the
    /// previously memorised tool and returns false.
    pub fn start_add_device(&mut self, template: DeviceTemplate, ctx: &mut ToolContext<'_>) -> bool {
        if self.current() != ToolKind::AddDevice {
            let next = ToolState::AddDevice(AddDeviceTool::new(None));
            self.switch_to(next, ctx);
        }
        let loaded = match &mut self.state {
            ToolState::AddDevice(tool) => tool.set_template(template),
            _ => return false,
        };
        match loaded {
            Ok(()) => {
                ctx.publish(EditorEvent::ParametersChanged(self.state.tool().parameters()));
                true
            }
            Err(e) => {
                tracing::warn!("Cannot add device: {}", e);
                ctx.status(e.to_string());
                let back = self.previous.unwrap_or(ToolKind::Select);
                self.activate(back, ctx);
                false
            }
        }
    }

    fn dispatch(
        &mut self,
        ctx: &mut ToolContext<'_>,
        handler: impl FnOnce(&mut dyn Tool, &mut ToolContext<'_>) -> EventResult,
    ) -> EventResult {
        ctx.modifiers = self.modifiers;
        let result = handler(self.state.tool_mut(), ctx);
        if result == EventResult::Leave {
            self.activate(ToolKind::Select, ctx);
        }
        result
    }

    pub fn pointer_down(&mut self, pos: Point, ctx: &mut ToolContext<'_>) -> bool {
        self.dispatch(ctx, |t, c| t.pointer_down(c, pos)).is_handled()
    }

    pub fn pointer_move(&mut self, pos: Point, ctx: &mut ToolContext<'_>) -> bool {
        self.dispatch(ctx, |t, c| t.pointer_move(c, pos)).is_handled()
    }

    pub fn pointer_up(&mut self, pos: Point, ctx: &mut ToolContext<'_>) -> bool {
        self.dispatch(ctx, |t, c| t.pointer_up(c, pos)).is_handled()
    }

    pub fn double_click(&mut self, pos: Point, ctx: &mut ToolContext<'_>) -> bool {
        self.dispatch(ctx, |t, c| t.double_click(c, pos)).is_handled()
    }

    /// Right click release. Unhandled clicks leave a drawing tool, or in
    /// Select go back to the last drawing tool.
    pub fn right_up(&mut self, pos: Point, ctx: &mut ToolContext<'_>) -> bool {
        if self.dispatch(ctx, |t, c| t.right_up(c, pos)).is_handled() {
            return true;
        }
        match (self.current(), self.previous) {
            (ToolKind::Select, Some(previous)) => self.activate(previous, ctx),
            (ToolKind::Select, None) => false,
            _ => self.activate(ToolKind::Select, ctx),
        }
    }

    fn track_modifier(&mut self, key: Key, down: bool) {
        match key {
            Key::Shift => self.modifiers.shift = down,
            Key::Control => self.modifiers.ctrl = down,
            _ => {}
        }
    }

    pub fn key_pressed(&mut self, key: Key, ctx: &mut ToolContext<'_>) -> bool {
        self.track_modifier(key, true);
        if key == Key::Escape {
            ctx.modifiers = self.modifiers;
            return self.abort(ctx);
        }
        self.dispatch(ctx, |t, c| t.key_pressed(c, key)).is_handled()
    }

    pub fn key_released(&mut self, key: Key, ctx: &mut ToolContext<'_>) -> bool {
        self.track_modifier(key, false);
        self.dispatch(ctx, |t, c| t.key_released(c, key)).is_handled()
    }

    /// Escape: the tool drops its in-progress work first, otherwise the
    /// machine falls back to Select.
    pub fn abort(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.state.tool_mut().abort(ctx) {
            return true;
        }
        if self.current() != ToolKind::Select {
            return self.activate(ToolKind::Select, ctx);
        }
        false
    }

    /// Lets the active tool catch up with net or layer changes.
    pub fn refresh_availability(&mut self, ctx: &mut ToolContext<'_>) {
        self.state.tool_mut().sync_availability(ctx);
    }

    /// Drops the active tool's in-progress work without switching tools.
    pub fn cancel_operation(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        let canceled = self.state.tool_mut().abort(ctx);
        ctx.abort_group();
        canceled
    }

    /// Structural request, gated by the active tool's capabilities.
    pub fn request(&mut self, request: &ToolRequest, ctx: &mut ToolContext<'_>) -> RequestOutcome {
        if !self.current().capabilities().contains(request.capability()) {
            tracing::debug!("{} does not support {:?}", self.current(), request);
            return RequestOutcome::Unsupported;
        }
        ctx.modifiers = self.modifiers;
        self.state.tool_mut().request(ctx, request)
    }

    pub fn configure(&mut self, setting: ToolSetting, ctx: &mut ToolContext<'_>) -> EditorResult<bool> {
        ctx.modifiers = self.modifiers;
        let changed = self.state.tool_mut().configure(ctx, setting)?;
        if changed {
            ctx.publish(EditorEvent::ParametersChanged(self.state.tool().parameters()));
        }
        Ok(changed)
    }
}
