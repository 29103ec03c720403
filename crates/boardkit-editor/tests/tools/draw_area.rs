use std::collections::BTreeSet;

use boardkit_editor::model::{ItemData, LayerId, Plane, Polygon, Zone, ZoneRules};
use boardkit_editor::{EditorCoordinator, EditorEvent, Key, ToolKind, ToolParameters, ToolSetting};

use crate::common::{board, editor, net, p, trace};

fn square(editor: &mut EditorCoordinator) {
    for pos in [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)] {
        editor.pointer_down(pos);
    }
}

fn planes(editor: &EditorCoordinator) -> Vec<Plane> {
    editor
        .document()
        .items()
        .filter_map(|i| match &i.data {
            ItemData::Plane(plane) => Some(plane.clone()),
            _ => None,
        })
        .collect()
}

fn zones(editor: &EditorCoordinator) -> Vec<Zone> {
    editor
        .document()
        .items()
        .filter_map(|i| match &i.data {
            ItemData::Zone(zone) => Some(zone.clone()),
            _ => None,
        })
        .collect()
}

fn polygons(editor: &EditorCoordinator) -> Vec<Polygon> {
    editor
        .document()
        .items()
        .filter_map(|i| match &i.data {
            ItemData::Polygon(polygon) => Some(polygon.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_plane_defaults_to_busiest_net() {
    let gnd = net("GND");
    let vcc = net("VCC");
    let vcc_id = vcc.id;
    let items = vec![
        trace(LayerId::TopCopper, Some(gnd.id), p(0.0, 20.0), p(5.0, 20.0)),
        trace(LayerId::TopCopper, Some(vcc_id), p(0.0, 22.0), p(5.0, 22.0)),
        trace(LayerId::TopCopper, Some(vcc_id), p(0.0, 24.0), p(5.0, 24.0)),
    ];
    let mut editor = editor(board(vec![gnd, vcc], items));
    editor.activate_tool(ToolKind::DrawPlane);

    match editor.snapshot().parameters {
        ToolParameters::Plane { net, layer, .. } => {
            assert_eq!(net, Some(vcc_id));
            assert_eq!(layer, Some(LayerId::TopCopper));
        }
        other => panic!("unexpected parameters {:?}", other),
    }

    square(&mut editor);
    assert!(editor.key_pressed(Key::Enter));
    let planes = planes(&editor);
    assert_eq!(planes.len(), 1);
    assert_eq!(planes[0].net, Some(vcc_id));
    assert_eq!(planes[0].layer, LayerId::TopCopper);
    assert_eq!(planes[0].outline.len(), 3);
}

#[test]
fn test_plane_without_nets_reports_and_creates_nothing() {
    let mut editor = editor(board(vec![], vec![]));
    let before = editor.undo_log().state_id();
    editor.activate_tool(ToolKind::DrawPlane);

    square(&mut editor);
    assert!(editor.key_pressed(Key::Enter));

    assert!(planes(&editor).is_empty());
    assert_eq!(editor.undo_log().state_id(), before);
    assert!(editor.bus().history(None).iter().any(|e| matches!(
        e,
        EditorEvent::StatusMessage { text, .. } if text.contains("no net")
    )));
    assert_eq!(editor.current_tool(), ToolKind::DrawPlane);
}

#[test]
fn test_zone_takes_configured_layers_and_rules() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawZone);
    let layers: BTreeSet<LayerId> = [LayerId::TopCopper, LayerId::BottomCopper].into();
    let rules = ZoneRules {
        no_copper: false,
        no_planes: true,
        no_exposure: false,
        no_devices: true,
    };
    assert!(editor.configure(ToolSetting::ZoneLayers(layers.clone())).unwrap());
    assert!(editor.configure(ToolSetting::ZoneRules(rules)).unwrap());

    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_down(p(10.0, 0.0));
    editor.double_click(p(10.0, 10.0));

    let zones = zones(&editor);
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].layers, layers);
    assert_eq!(zones[0].rules, rules);
    assert_eq!(zones[0].outline, vec![p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)]);
}

#[test]
fn test_zone_rejects_disabled_layer() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawZone);
    let layers: BTreeSet<LayerId> = [LayerId::Inner1].into();
    assert!(editor.configure(ToolSetting::ZoneLayers(layers)).is_err());
}

#[test]
fn test_escape_commits_valid_partial_polygon() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawPolygon);
    // An open polygon needs only two vertices.
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_down(p(5.0, 0.0));

    assert!(editor.key_pressed(Key::Escape));
    let polygons = polygons(&editor);
    assert_eq!(polygons.len(), 1);
    assert_eq!(polygons[0].path, vec![p(0.0, 0.0), p(5.0, 0.0)]);
    assert_eq!(polygons[0].layer, LayerId::TopSilkscreen);
    assert_eq!(editor.current_tool(), ToolKind::DrawPolygon);

    // A single vertex is not a shape: Escape drops it.
    editor.pointer_down(p(0.0, 5.0));
    assert!(editor.key_pressed(Key::Escape));
    assert_eq!(editor.document().item_count(), 1);
    assert_eq!(editor.current_tool(), ToolKind::DrawPolygon);

    assert!(editor.key_pressed(Key::Escape));
    assert_eq!(editor.current_tool(), ToolKind::Select);
}
