use boardkit_editor::model::{DeviceTemplate, ItemData, LayerId, Pad};
use boardkit_editor::{
    EditorError, EditorEvent, Key, RequestOutcome, ToolKind, ToolRequest, ToolSetting,
};

use crate::common::{board, editor, net, outline, p, trace};

fn tool_changes(editor: &boardkit_editor::EditorCoordinator) -> Vec<ToolKind> {
    editor
        .bus()
        .history(None)
        .iter()
        .filter_map(|e| match e {
            EditorEvent::ToolChanged { tool, .. } => Some(*tool),
            _ => None,
        })
        .collect()
}

#[test]
fn test_starts_in_select() {
    let editor = editor(board(vec![], vec![]));
    assert_eq!(editor.current_tool(), ToolKind::Select);
    assert_eq!(tool_changes(&editor), vec![ToolKind::Select]);
    let snapshot = editor.snapshot();
    assert_eq!(snapshot.tool, ToolKind::Select);
    assert_eq!(snapshot.capabilities, ToolKind::Select.capabilities());
}

#[test]
fn test_right_click_leaves_and_returns() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawPolygon);
    assert!(editor.right_up(p(1.0, 1.0)));
    assert_eq!(editor.current_tool(), ToolKind::Select);
    // In Select an unhandled right click goes back to the last drawing tool.
    assert!(editor.right_up(p(1.0, 1.0)));
    assert_eq!(editor.current_tool(), ToolKind::DrawPolygon);
    assert_eq!(
        tool_changes(&editor),
        vec![ToolKind::Select, ToolKind::DrawPolygon, ToolKind::Select, ToolKind::DrawPolygon]
    );
}

#[test]
fn test_activating_current_tool_does_nothing() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddVia);
    editor.activate_tool(ToolKind::AddVia);
    assert_eq!(tool_changes(&editor), vec![ToolKind::Select, ToolKind::AddVia]);
}

#[test]
fn test_escape_in_idle_tool_returns_to_select() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddHole);
    assert!(editor.key_pressed(Key::Escape));
    assert_eq!(editor.current_tool(), ToolKind::Select);
    assert!(!editor.key_pressed(Key::Escape));
}

#[test]
fn test_polygon_drawn_by_clicks() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawPolygon);
    for pos in [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0)] {
        editor.pointer_down(pos);
    }
    assert!(editor.key_pressed(Key::Enter));
    assert_eq!(editor.document().item_count(), 1);
    assert_eq!(editor.undo_log().undo_text(), Some("Add polygon"));
    assert_eq!(editor.current_tool(), ToolKind::DrawPolygon);
}

#[test]
fn test_requests_gated_by_capabilities() {
    let gnd = net("GND");
    let item = trace(LayerId::TopCopper, Some(gnd.id), p(0.0, 0.0), p(10.0, 0.0));
    let mut editor = editor(board(vec![gnd], vec![outline(20.0), item.clone()]));

    editor.activate_tool(ToolKind::DrawWire);
    assert_eq!(editor.request(&ToolRequest::Remove), RequestOutcome::Unsupported);

    editor.activate_tool(ToolKind::Select);
    assert_eq!(editor.request(&ToolRequest::Remove), RequestOutcome::Ignored);
    editor.select([item.id]);
    assert_eq!(editor.request(&ToolRequest::Remove), RequestOutcome::Handled);
    assert!(!editor.document().contains(item.id));
    assert!(editor.session().selected_ids().is_empty());

    editor.undo().unwrap();
    assert!(editor.document().contains(item.id));
    assert!(editor.snapshot().can_redo);
}

#[test]
fn test_copy_paste_offsets_by_grid() {
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(10.0, 0.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    editor.select([item.id]);
    assert_eq!(editor.request(&ToolRequest::Copy), RequestOutcome::Handled);
    assert_eq!(editor.request(&ToolRequest::Paste), RequestOutcome::Handled);
    assert_eq!(editor.document().item_count(), 2);
    let pasted = editor
        .document()
        .traces()
        .find(|(i, _)| i.id != item.id)
        .map(|(_, t)| t.start)
        .unwrap();
    assert_eq!(pasted, p(0.5, 0.5));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddVia);
    assert!(matches!(
        editor.configure(ToolSetting::ViaDrill(5.0)),
        Err(EditorError::InvalidValue { .. })
    ));
    assert!(matches!(
        editor.configure(ToolSetting::Text("x".into())),
        Err(EditorError::UnsupportedSetting(_))
    ));
    assert_eq!(editor.configure(ToolSetting::ViaSize(0.8)).unwrap(), true);
    assert_eq!(editor.configure(ToolSetting::ViaSize(0.8)).unwrap(), false);
}

#[test]
fn test_via_takes_net_of_copper_below() {
    let gnd = net("GND");
    let gnd_id = gnd.id;
    let mut editor = editor(board(
        vec![gnd],
        vec![trace(LayerId::TopCopper, Some(gnd_id), p(0.0, 0.0), p(10.0, 0.0))],
    ));
    editor.activate_tool(ToolKind::AddVia);
    editor.pointer_down(p(5.0, 0.0));
    let via = editor
        .document()
        .items()
        .find_map(|i| match &i.data {
            ItemData::Via(v) => Some(v.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(via.net, Some(gnd_id));
    assert_eq!(editor.current_tool(), ToolKind::AddVia);
}

#[test]
fn test_unplaceable_device_returns_to_previous_tool() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    let bad = DeviceTemplate {
        name: " ".into(),
        pads: vec![],
    };
    assert!(!editor.start_add_device(bad));
    assert_eq!(editor.current_tool(), ToolKind::DrawWire);

    let good = DeviceTemplate {
        name: "R1".into(),
        pads: vec![
            Pad::smd("1", p(-1.0, 0.0), 1.0, 1.2),
            Pad::smd("2", p(1.0, 0.0), 1.0, 1.2),
        ],
    };
    assert!(editor.start_add_device(good));
    assert_eq!(editor.current_tool(), ToolKind::AddDevice);
    editor.pointer_down(p(10.0, 10.0));
    assert_eq!(editor.document().item_count(), 1);
    // A placed device hands back to Select.
    assert_eq!(editor.current_tool(), ToolKind::Select);
}

#[test]
fn test_measure_overlay_follows_pointer() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::Measure);
    assert_eq!(editor.snapshot().overlay_text, None);
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_move(p(3.0, 4.0));
    let text = editor.snapshot().overlay_text.unwrap();
    assert!(text.ends_with("distance: 5.000 mm"), "{}", text);
    editor.abort();
    assert_eq!(editor.snapshot().overlay_text, None);
    assert_eq!(editor.current_tool(), ToolKind::Measure);
}
