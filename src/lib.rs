//! # BoardKit
//!
//! A toolkit-agnostic core for interactive PCB board editors.
//!
//! ## Architecture
//!
//! BoardKit is organized as a workspace with multiple crates:
//!
//! 1. **boardkit-core** - Identifiers, planar geometry, the event bus
//! 2. **boardkit-settings** - Configuration and its persistence
//! 3. **boardkit-editor** - Tool state machine, undo log, plane and rule
//!    check builders, rebuild scheduling and the editor coordinator
//! 4. **boardkit** - Command line front end that integrates all crates
//!
//! A view layer forwards input to [`EditorCoordinator`], calls
//! [`EditorCoordinator::tick`] every `scheduler.tick_interval_ms` and renders
//! from [`EditorSnapshot`] plus the events published on the bus.

pub use boardkit_core::{EventBus, EventBusConfig, EventFilter, ItemId, NetId, Point, StateId};
pub use boardkit_editor::{
    ApprovalKey, BoardCommand, BoardItem, BuildEvent, DocumentEvent, DrcReport, EditorCoordinator,
    EditorError, EditorEvent, EditorSnapshot, ItemData, JsonFileStore, LayerId, RuleCheckEntry,
    RuleCheckStatus, Severity, ToolKind, UndoLog,
};
pub use boardkit_editor::model::Document;
pub use boardkit_settings::{Config, LoggingSettings};

use boardkit_editor::model::{Net, Plane, Polygon, Trace, Via};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging from the logging settings
///
/// `RUST_LOG` overrides the configured level. Output goes to stderr, either
/// human readable or as JSON lines.
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if settings.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))
}

/// A small two layer board with a ground plane and a few traces.
///
/// The traces on `SIG` leave a gap that the full rule check reports as a
/// missing connection, and one trace sits too close to the board edge.
pub fn sample_board() -> anyhow::Result<Document> {
    let mut doc = Document::new("Sample");
    let mut undo = UndoLog::new(16);

    let gnd = Net {
        id: NetId::new(),
        name: "GND".to_string(),
    };
    let sig = Net {
        id: NetId::new(),
        name: "SIG".to_string(),
    };
    let (gnd_id, sig_id) = (gnd.id, sig.id);
    undo.execute(BoardCommand::AddNet(gnd), &mut doc)?;
    undo.execute(BoardCommand::AddNet(sig), &mut doc)?;

    let rect = |x0: f64, y0: f64, x1: f64, y1: f64| {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    };
    let trace = |net, from: Point, to: Point| {
        BoardItem::new(ItemData::Trace(Trace {
            layer: LayerId::TopCopper,
            net: Some(net),
            start: from,
            end: to,
            width: 0.3,
        }))
    };

    let items = vec![
        BoardItem::new(ItemData::Polygon(Polygon {
            layer: LayerId::BoardOutline,
            path: rect(0.0, 0.0, 40.0, 30.0),
            width: 0.0,
            filled: true,
        })),
        BoardItem::new(ItemData::Plane(Plane {
            layer: LayerId::BottomCopper,
            net: Some(gnd_id),
            outline: rect(1.0, 1.0, 39.0, 29.0),
            min_width: 0.2,
            clearance: 0.3,
            priority: 0,
            keep_orphans: false,
        })),
        BoardItem::new(ItemData::Via(Via {
            position: Point::new(10.0, 10.0),
            size: 0.7,
            drill: 0.3,
            net: Some(gnd_id),
        })),
        trace(gnd_id, Point::new(5.0, 10.0), Point::new(10.0, 10.0)),
        trace(sig_id, Point::new(5.0, 20.0), Point::new(15.0, 20.0)),
        trace(sig_id, Point::new(20.0, 20.0), Point::new(30.0, 20.0)),
        trace(sig_id, Point::new(30.0, 20.0), Point::new(39.9, 20.0)),
    ];
    undo.execute(BoardCommand::AddItems(items), &mut doc)?;
    Ok(doc)
}
