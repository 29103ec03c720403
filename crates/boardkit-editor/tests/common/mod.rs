//! Board fixtures shared by the integration tests.
#![allow(dead_code)]

use boardkit_core::{EventBus, EventBusConfig, NetId, Point};
use boardkit_editor::model::{BoardItem, Document, ItemData, LayerId, Net, Plane, Polygon, Trace};
use boardkit_editor::{BoardCommand, EditorCoordinator, EditorEvent, UndoLog};
use boardkit_settings::Config;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(30);

pub fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![p(x0, y0), p(x1, y0), p(x1, y1), p(x0, y1)]
}

pub fn outline(size: f64) -> BoardItem {
    BoardItem::new(ItemData::Polygon(Polygon {
        layer: LayerId::BoardOutline,
        path: rect(0.0, 0.0, size, size),
        width: 0.0,
        filled: true,
    }))
}

pub fn trace(layer: LayerId, net: Option<NetId>, from: Point, to: Point) -> BoardItem {
    BoardItem::new(ItemData::Trace(Trace {
        layer,
        net,
        start: from,
        end: to,
        width: 0.3,
    }))
}

pub fn plane(layer: LayerId, net: NetId, outline: Vec<Point>) -> BoardItem {
    BoardItem::new(ItemData::Plane(Plane {
        layer,
        net: Some(net),
        outline,
        min_width: 0.2,
        clearance: 0.3,
        priority: 0,
        keep_orphans: false,
    }))
}

pub fn net(name: &str) -> Net {
    Net {
        id: NetId::new(),
        name: name.to_string(),
    }
}

/// A document holding `nets` and `items`, built through an undo log.
pub fn board(nets: Vec<Net>, items: Vec<BoardItem>) -> Document {
    let mut doc = Document::new("Test");
    let mut undo = UndoLog::new(8);
    for net in nets {
        undo.execute(BoardCommand::AddNet(net), &mut doc).unwrap();
    }
    undo.execute(BoardCommand::AddItems(items), &mut doc).unwrap();
    doc
}

/// Two traces of different nets 0.1 mm apart: exactly one clearance finding.
pub fn clearance_board() -> (Document, BoardItem) {
    let a = net("A");
    let b = net("B");
    let lower = trace(LayerId::TopCopper, Some(b.id), p(5.0, 5.4), p(15.0, 5.4));
    let doc = board(
        vec![a.clone(), b],
        vec![
            outline(20.0),
            trace(LayerId::TopCopper, Some(a.id), p(5.0, 5.0), p(15.0, 5.0)),
            lower.clone(),
        ],
    );
    (doc, lower)
}

pub fn bus_with_history() -> Arc<EventBus<EditorEvent>> {
    Arc::new(EventBus::with_config(EventBusConfig {
        enable_history: true,
        ..Default::default()
    }))
}

pub fn editor(doc: Document) -> EditorCoordinator {
    EditorCoordinator::new(doc, Arc::new(Config::default()), bus_with_history())
}

/// A point in time past every debounce and pause interval of the defaults.
pub fn later(secs: u64) -> Instant {
    Instant::now() + Duration::from_secs(secs)
}
