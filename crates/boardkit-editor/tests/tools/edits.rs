use boardkit_editor::model::{ItemData, LayerId};
use boardkit_editor::{BoardCommand, EditorError, EditorEvent, ToolKind, ToolParameters, ToolSetting};

use crate::common::{board, editor, net, p, trace};

fn parameter_updates(editor: &boardkit_editor::EditorCoordinator) -> usize {
    editor
        .bus()
        .history(None)
        .iter()
        .filter(|e| matches!(e, EditorEvent::ParametersChanged(_)))
        .count()
}

#[test]
fn test_failed_edit_changes_nothing() {
    let kept = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(10.0, 0.0));
    let missing = trace(LayerId::TopCopper, None, p(0.0, 5.0), p(10.0, 5.0));
    let mut editor = editor(board(vec![], vec![kept.clone()]));
    let before = editor.undo_log().state_id();

    let result = editor.execute(BoardCommand::RemoveItems(vec![kept.clone(), missing.clone()]));
    assert!(matches!(result, Err(EditorError::UnknownItem(id)) if id == missing.id));
    assert!(editor.document().contains(kept.id));
    assert_eq!(editor.undo_log().state_id(), before);
    assert!(!editor.snapshot().can_undo);
}

#[test]
fn test_removed_net_leaves_plane_tool_at_once() {
    let gnd = net("GND");
    let vcc = net("VCC");
    let (gnd_id, vcc_id) = (gnd.id, vcc.id);
    let mut editor = editor(board(vec![gnd, vcc.clone()], vec![]));
    editor.activate_tool(ToolKind::DrawPlane);
    editor.configure(ToolSetting::Net(Some(vcc_id))).unwrap();
    let updates = parameter_updates(&editor);

    editor.execute(BoardCommand::RemoveNet(vcc)).unwrap();

    // No tool input happened in between.
    match editor.snapshot().parameters {
        ToolParameters::Plane { nets, net, .. } => {
            assert_eq!(nets, vec![gnd_id]);
            assert_eq!(net, Some(gnd_id));
        }
        other => panic!("unexpected parameters {:?}", other),
    }
    assert!(parameter_updates(&editor) > updates);

    // Undo brings the net back into the list.
    editor.undo().unwrap();
    match editor.snapshot().parameters {
        ToolParameters::Plane { nets, .. } => assert!(nets.contains(&vcc_id)),
        other => panic!("unexpected parameters {:?}", other),
    }
}

#[test]
fn test_disabled_layer_leaves_polygon_tool_at_once() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawPolygon);
    let updates = parameter_updates(&editor);

    editor
        .execute(BoardCommand::SetLayerEnabled {
            layer: LayerId::TopSilkscreen,
            enabled: false,
        })
        .unwrap();

    match editor.snapshot().parameters {
        ToolParameters::Polygon { layers, layer, .. } => {
            assert!(!layers.contains(&LayerId::TopSilkscreen));
            assert_ne!(layer, Some(LayerId::TopSilkscreen));
            assert!(layer.is_some());
        }
        other => panic!("unexpected parameters {:?}", other),
    }
    assert!(parameter_updates(&editor) > updates);
}

#[test]
fn test_edit_while_routing_ends_the_wire_first() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_up(p(5.0, 0.0));
    assert!(editor.undo_log().is_group_active());

    let gnd = net("GND");
    let gnd_id = gnd.id;
    assert!(editor.execute(BoardCommand::AddNet(gnd)).unwrap());

    assert!(!editor.undo_log().is_group_active());
    assert!(editor.document().net(gnd_id).is_some());
    assert_eq!(editor.undo_log().undo_text(), Some("Add net GND"));
    assert_eq!(editor.current_tool(), ToolKind::DrawWire);
    let traces = editor
        .document()
        .items()
        .filter(|i| matches!(i.data, ItemData::Trace(_)))
        .count();
    assert_eq!(traces, 1);
}
