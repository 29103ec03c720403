//! Interactive editing tools.
//!
//! Each tool implements [`Tool`]; the closed set of tools is the
//! [`ToolState`] union the state machine switches between. Tools never own
//! the document: every handler gets a [`ToolContext`] borrowed for the
//! duration of the call.

mod choice;
mod device;
mod draw_area;
mod hole;
mod measure;
mod select;
mod text;
mod via;
mod wire;

pub use choice::{AvailabilityWatch, Choice};
pub use device::AddDeviceTool;
pub use draw_area::{AreaKind, DrawAreaTool};
pub use hole::AddHoleTool;
pub use measure::MeasureTool;
pub use select::SelectTool;
pub use text::AddTextTool;
pub use via::AddViaTool;
pub use wire::{middle_point, DrawWireTool};

use boardkit_core::{hit_tolerance, EventBus, ItemId, NetId, Point, Rect};
use boardkit_settings::{Config, WireMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::model::{BoardItem, Document, LayerId, ZoneRules};
use crate::session::Session;
use crate::undo::{BoardCommand, UndoLog};

/// The available tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Select,
    DrawWire,
    DrawPolygon,
    DrawZone,
    DrawPlane,
    AddVia,
    AddHole,
    AddStrokeText,
    AddDevice,
    Measure,
}

impl ToolKind {
    pub const ALL: [ToolKind; 10] = [
        ToolKind::Select,
        ToolKind::DrawWire,
        ToolKind::DrawPolygon,
        ToolKind::DrawZone,
        ToolKind::DrawPlane,
        ToolKind::AddVia,
        ToolKind::AddHole,
        ToolKind::AddStrokeText,
        ToolKind::AddDevice,
        ToolKind::Measure,
    ];

    /// Operations the tool supports. Fixed per tool.
    pub fn capabilities(self) -> Capabilities {
        match self {
            ToolKind::Select => Capabilities::SELECT
                | Capabilities::CUT
                | Capabilities::COPY
                | Capabilities::PASTE
                | Capabilities::REMOVE
                | Capabilities::ROTATE
                | Capabilities::FLIP
                | Capabilities::SNAP_TO_GRID
                | Capabilities::RESET_TEXTS
                | Capabilities::LOCK
                | Capabilities::UNLOCK
                | Capabilities::PROPERTIES
                | Capabilities::MODIFY_LINE_WIDTH
                | Capabilities::IMPORT_GRAPHICS,
            ToolKind::AddStrokeText | ToolKind::AddDevice => {
                Capabilities::ROTATE | Capabilities::FLIP
            }
            ToolKind::DrawWire
            | ToolKind::DrawPolygon
            | ToolKind::DrawZone
            | ToolKind::DrawPlane
            | ToolKind::AddVia
            | ToolKind::AddHole
            | ToolKind::Measure => Capabilities::empty(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::DrawWire => "Draw Wire",
            ToolKind::DrawPolygon => "Draw Polygon",
            ToolKind::DrawZone => "Draw Zone",
            ToolKind::DrawPlane => "Draw Plane",
            ToolKind::AddVia => "Add Via",
            ToolKind::AddHole => "Add Hole",
            ToolKind::AddStrokeText => "Add Text",
            ToolKind::AddDevice => "Add Device",
            ToolKind::Measure => "Measure",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of operations a tool supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const SELECT: Capabilities = Capabilities(1 << 0);
    pub const CUT: Capabilities = Capabilities(1 << 1);
    pub const COPY: Capabilities = Capabilities(1 << 2);
    pub const PASTE: Capabilities = Capabilities(1 << 3);
    pub const REMOVE: Capabilities = Capabilities(1 << 4);
    pub const ROTATE: Capabilities = Capabilities(1 << 5);
    pub const FLIP: Capabilities = Capabilities(1 << 6);
    pub const SNAP_TO_GRID: Capabilities = Capabilities(1 << 7);
    pub const RESET_TEXTS: Capabilities = Capabilities(1 << 8);
    pub const LOCK: Capabilities = Capabilities(1 << 9);
    pub const UNLOCK: Capabilities = Capabilities(1 << 10);
    pub const PROPERTIES: Capabilities = Capabilities(1 << 11);
    pub const MODIFY_LINE_WIDTH: Capabilities = Capabilities(1 << 12);
    pub const IMPORT_GRAPHICS: Capabilities = Capabilities(1 << 13);

    const NAMES: [(Capabilities, &'static str); 14] = [
        (Self::SELECT, "select"),
        (Self::CUT, "cut"),
        (Self::COPY, "copy"),
        (Self::PASTE, "paste"),
        (Self::REMOVE, "remove"),
        (Self::ROTATE, "rotate"),
        (Self::FLIP, "flip"),
        (Self::SNAP_TO_GRID, "snap_to_grid"),
        (Self::RESET_TEXTS, "reset_texts"),
        (Self::LOCK, "lock"),
        (Self::UNLOCK, "unlock"),
        (Self::PROPERTIES, "properties"),
        (Self::MODIFY_LINE_WIDTH, "modify_line_width"),
        (Self::IMPORT_GRAPHICS, "import_graphics"),
    ];

    pub const fn empty() -> Self {
        Capabilities(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the contained flags.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

/// Structural edit requests routed to the active tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SelectAll,
    Cut,
    Copy,
    Paste,
    Remove,
    Rotate,
    Flip,
    SnapToGrid,
    ResetTexts,
    Lock,
    Unlock,
    EditProperties,
    /// Positive steps widen, negative steps narrow
    ChangeLineWidth(i32),
    ImportGraphics { paths: Vec<Vec<Point>>, layer: LayerId },
}

impl ToolRequest {
    /// Capability the active tool needs to accept this request.
    pub fn capability(&self) -> Capabilities {
        match self {
            ToolRequest::SelectAll => Capabilities::SELECT,
            ToolRequest::Cut => Capabilities::CUT,
            ToolRequest::Copy => Capabilities::COPY,
            ToolRequest::Paste => Capabilities::PASTE,
            ToolRequest::Remove => Capabilities::REMOVE,
            ToolRequest::Rotate => Capabilities::ROTATE,
            ToolRequest::Flip => Capabilities::FLIP,
            ToolRequest::SnapToGrid => Capabilities::SNAP_TO_GRID,
            ToolRequest::ResetTexts => Capabilities::RESET_TEXTS,
            ToolRequest::Lock => Capabilities::LOCK,
            ToolRequest::Unlock => Capabilities::UNLOCK,
            ToolRequest::EditProperties => Capabilities::PROPERTIES,
            ToolRequest::ChangeLineWidth(_) => Capabilities::MODIFY_LINE_WIDTH,
            ToolRequest::ImportGraphics { .. } => Capabilities::IMPORT_GRAPHICS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The request changed something
    Handled,
    /// Supported, but there was nothing to act on
    Ignored,
    /// The active tool lacks the capability
    Unsupported,
}

/// Tool parameter updates coming from the view
#[derive(Debug, Clone, PartialEq)]
pub enum ToolSetting {
    WireMode(WireMode),
    Layer(LayerId),
    /// `None` selects "no net"
    Net(Option<NetId>),
    /// Take the net from the copper under the cursor
    AutoNet(bool),
    Width(f64),
    ViaSize(f64),
    ViaDrill(f64),
    Filled(bool),
    Mirrored(bool),
    Rotation(f64),
    Text(String),
    TextHeight(f64),
    ZoneLayers(BTreeSet<LayerId>),
    ZoneRules(ZoneRules),
    HoleDiameter(f64),
}

impl ToolSetting {
    pub fn name(&self) -> &'static str {
        match self {
            ToolSetting::WireMode(_) => "wire mode",
            ToolSetting::Layer(_) => "layer",
            ToolSetting::Net(_) => "net",
            ToolSetting::AutoNet(_) => "auto net",
            ToolSetting::Width(_) => "width",
            ToolSetting::ViaSize(_) => "via size",
            ToolSetting::ViaDrill(_) => "via drill",
            ToolSetting::Filled(_) => "filled",
            ToolSetting::Mirrored(_) => "mirrored",
            ToolSetting::Rotation(_) => "rotation",
            ToolSetting::Text(_) => "text",
            ToolSetting::TextHeight(_) => "text height",
            ToolSetting::ZoneLayers(_) => "zone layers",
            ToolSetting::ZoneRules(_) => "zone rules",
            ToolSetting::HoleDiameter(_) => "hole diameter",
        }
    }

    /// Error for a setting the tool does not have.
    pub(crate) fn unsupported(&self) -> EditorError {
        EditorError::UnsupportedSetting(self.name())
    }
}

/// Current parameters of the active tool, for the view to display
#[derive(Debug, Clone, PartialEq)]
pub enum ToolParameters {
    None,
    Wire {
        mode: WireMode,
        layers: Vec<LayerId>,
        layer: Option<LayerId>,
        nets: Vec<Option<NetId>>,
        net: Option<NetId>,
        width: f64,
    },
    Polygon {
        layers: Vec<LayerId>,
        layer: Option<LayerId>,
        width: f64,
        filled: bool,
    },
    Zone {
        layers: BTreeSet<LayerId>,
        rules: ZoneRules,
    },
    Plane {
        layers: Vec<LayerId>,
        layer: Option<LayerId>,
        nets: Vec<NetId>,
        net: Option<NetId>,
    },
    Via {
        size: f64,
        drill: f64,
        nets: Vec<Option<NetId>>,
        net: Option<NetId>,
        auto_net: bool,
    },
    Hole {
        diameter: f64,
    },
    Text {
        layers: Vec<LayerId>,
        layer: Option<LayerId>,
        text: String,
        height: f64,
        rotation: f64,
        mirrored: bool,
    },
    Device {
        template: Option<String>,
        rotation: f64,
        mirrored: bool,
    },
}

/// Transient geometry the view draws on top of the board
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Preview {
    #[default]
    None,
    Items(Vec<BoardItem>),
    Path(Vec<Point>),
    Rubberband(Rect),
    Measure { start: Point, end: Point },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Arrow,
    Cross,
    Move,
    PointingHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Backspace,
    Shift,
    Control,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// What a tool did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Unhandled,
    Handled,
    /// Handled; the tool is done and wants to go back to Select
    Leave,
}

impl EventResult {
    pub fn from_handled(handled: bool) -> Self {
        if handled {
            EventResult::Handled
        } else {
            EventResult::Unhandled
        }
    }

    pub fn is_handled(self) -> bool {
        self != EventResult::Unhandled
    }
}

/// Everything a tool may touch while handling one event
pub struct ToolContext<'a> {
    pub document: &'a mut Document,
    pub undo: &'a mut UndoLog,
    pub session: &'a mut Session,
    pub config: &'a Config,
    pub bus: &'a EventBus<EditorEvent>,
    /// Current view scale
    pub pixels_per_mm: f64,
    pub modifiers: Modifiers,
}

impl ToolContext<'_> {
    /// Hit test radius in millimetres for the current zoom.
    pub fn tolerance(&self) -> f64 {
        hit_tolerance(self.config.view.hit_tolerance_px, self.pixels_per_mm)
    }

    /// Snaps to the document grid unless Shift is held.
    pub fn snap(&self, pos: Point) -> Point {
        if self.modifiers.shift {
            pos
        } else {
            self.document.grid.snap(pos)
        }
    }

    /// Publishes an event; having no listeners is fine.
    pub fn publish(&self, event: EditorEvent) {
        let _ = self.bus.publish(event);
    }

    pub fn status(&self, text: impl Into<String>) {
        self.publish(EditorEvent::StatusMessage {
            text: text.into(),
            timeout: Some(Duration::from_millis(self.config.view.status_timeout_ms)),
        });
    }

    pub fn preview(&self, preview: Preview) {
        self.publish(EditorEvent::PreviewChanged(preview));
    }

    pub fn overlay(&self, text: Option<String>) {
        self.publish(EditorEvent::OverlayText(text));
    }

    pub fn cursor(&self, shape: CursorShape) {
        self.publish(EditorEvent::Cursor(shape));
    }

    /// Executes a command as one undo step, reporting failures on the status line.
    pub fn execute(&mut self, cmd: BoardCommand) -> bool {
        match self.undo.execute(cmd, self.document) {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!("Command failed: {}", e);
                self.status(e.to_string());
                false
            }
        }
    }

    /// Appends to the active group, or executes directly if no group is open.
    pub fn append(&mut self, cmd: BoardCommand) -> EditorResult<()> {
        if self.undo.is_group_active() {
            self.undo.append_to_group(cmd, self.document)
        } else {
            self.undo.execute(cmd, self.document).map(|_| ())
        }
    }

    /// Aborts the open command group, if any.
    pub fn abort_group(&mut self) {
        if self.undo.is_group_active() {
            if let Err(e) = self.undo.abort_group(self.document) {
                tracing::warn!("Failed to abort command group: {}", e);
            }
        }
    }

    /// Layers a new object may be placed on.
    pub fn enabled_layers(&self, copper_only: bool) -> Vec<LayerId> {
        if copper_only {
            self.document.enabled_copper_layers()
        } else {
            self.document.enabled_layers()
        }
    }

    /// Net choices including "no net" first.
    pub fn optional_nets(&self) -> Vec<Option<NetId>> {
        std::iter::once(None)
            .chain(self.document.net_ids().into_iter().map(Some))
            .collect()
    }

    pub fn item_at(&self, pos: Point) -> Option<ItemId> {
        self.document.items_at(&pos, self.tolerance()).first().copied()
    }
}

/// Behaviour shared by all tools
///
/// Event handlers default to "not handled"; requests default to
/// "unsupported". Enter and leave must not fail.
pub trait Tool: Send {
    fn kind(&self) -> ToolKind;

    /// Called after the tool became active.
    fn enter(&mut self, ctx: &mut ToolContext<'_>);

    /// Called before another tool becomes active. Must drop all transient state.
    fn leave(&mut self, ctx: &mut ToolContext<'_>);

    fn parameters(&self) -> ToolParameters {
        ToolParameters::None
    }

    /// Text the view shows next to the cursor.
    fn overlay_text(&self) -> Option<String> {
        None
    }

    /// Re-validates layer and net choices after the net list or the layer
    /// stack changed.
    fn sync_availability(&mut self, _ctx: &mut ToolContext<'_>) {}

    fn pointer_down(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        EventResult::Unhandled
    }

    fn pointer_move(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        EventResult::Unhandled
    }

    fn pointer_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        EventResult::Unhandled
    }

    fn double_click(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        EventResult::Unhandled
    }

    fn right_up(&mut self, _ctx: &mut ToolContext<'_>, _pos: Point) -> EventResult {
        EventResult::Unhandled
    }

    fn key_pressed(&mut self, _ctx: &mut ToolContext<'_>, _key: Key) -> EventResult {
        EventResult::Unhandled
    }

    fn key_released(&mut self, _ctx: &mut ToolContext<'_>, _key: Key) -> EventResult {
        EventResult::Unhandled
    }

    /// Escape. Returns true if the tool consumed it (e.g. dropped an in-progress path).
    fn abort(&mut self, _ctx: &mut ToolContext<'_>) -> bool {
        false
    }

    fn request(&mut self, _ctx: &mut ToolContext<'_>, _request: &ToolRequest) -> RequestOutcome {
        RequestOutcome::Unsupported
    }

    /// Applies a setting. Returns whether the parameters changed.
    fn configure(&mut self, _ctx: &mut ToolContext<'_>, setting: ToolSetting) -> EditorResult<bool> {
        Err(setting.unsupported())
    }
}

/// The active tool
#[derive(Debug)]
pub enum ToolState {
    Select(SelectTool),
    DrawWire(DrawWireTool),
    DrawArea(DrawAreaTool),
    AddVia(AddViaTool),
    AddHole(AddHoleTool),
    AddStrokeText(AddTextTool),
    AddDevice(AddDeviceTool),
    Measure(MeasureTool),
}

impl ToolState {
    /// A fresh tool of the given kind with configured defaults.
    pub fn create(kind: ToolKind, config: &Config) -> ToolState {
        match kind {
            ToolKind::Select => ToolState::Select(SelectTool::new()),
            ToolKind::DrawWire => ToolState::DrawWire(DrawWireTool::new(&config.tools)),
            ToolKind::DrawPolygon => {
                ToolState::DrawArea(DrawAreaTool::new(AreaKind::Polygon, &config.tools))
            }
            ToolKind::DrawZone => {
                ToolState::DrawArea(DrawAreaTool::new(AreaKind::Zone, &config.tools))
            }
            ToolKind::DrawPlane => {
                ToolState::DrawArea(DrawAreaTool::new(AreaKind::Plane, &config.tools))
            }
            ToolKind::AddVia => ToolState::AddVia(AddViaTool::new(&config.tools)),
            ToolKind::AddHole => ToolState::AddHole(AddHoleTool::new(&config.tools)),
            ToolKind::AddStrokeText => ToolState::AddStrokeText(AddTextTool::new(&config.tools)),
            ToolKind::AddDevice => ToolState::AddDevice(AddDeviceTool::new(None)),
            ToolKind::Measure => ToolState::Measure(MeasureTool::new()),
        }
    }

    pub fn tool(&self) -> &dyn Tool {
        match self {
            ToolState::Select(t) => t,
            ToolState::DrawWire(t) => t,
            ToolState::DrawArea(t) => t,
            ToolState::AddVia(t) => t,
            ToolState::AddHole(t) => t,
            ToolState::AddStrokeText(t) => t,
            ToolState::AddDevice(t) => t,
            ToolState::Measure(t) => t,
        }
    }

    pub fn tool_mut(&mut self) -> &mut dyn Tool {
        match self {
            ToolState::Select(t) => t,
            ToolState::DrawWire(t) => t,
            ToolState::DrawArea(t) => t,
            ToolState::AddVia(t) => t,
            ToolState::AddHole(t) => t,
            ToolState::AddStrokeText(t) => t,
            ToolState::AddDevice(t) => t,
            ToolState::Measure(t) => t,
        }
    }

    pub fn kind(&self) -> ToolKind {
        self.tool().kind()
    }
}

/// Validates that a length setting is positive and finite.
pub(crate) fn positive(name: &'static str, value: f64) -> EditorResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EditorError::invalid(name, format!("{} must be > 0", value)))
    }
}

/// Validates that a length setting is zero or positive.
pub(crate) fn non_negative(name: &'static str, value: f64) -> EditorResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EditorError::invalid(name, format!("{} must be >= 0", value)))
    }
}
