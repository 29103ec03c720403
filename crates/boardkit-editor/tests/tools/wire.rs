use boardkit_core::StateId;
use boardkit_editor::model::{ItemData, LayerId};
use boardkit_editor::{DocumentEvent, EditorError, EditorEvent, Key, ToolKind, ToolSetting};
use boardkit_settings::WireMode;

use crate::common::{board, editor, net, p, trace};

fn traces(editor: &boardkit_editor::EditorCoordinator) -> Vec<(LayerId, (f64, f64), (f64, f64))> {
    let mut all: Vec<_> = editor
        .document()
        .items()
        .filter_map(|i| match &i.data {
            ItemData::Trace(t) => Some((t.layer, (t.start.x, t.start.y), (t.end.x, t.end.y))),
            _ => None,
        })
        .collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap());
    all
}

#[test]
fn test_press_drag_release_commits_one_segment() {
    let mut editor = editor(board(vec![], vec![]));
    let before = editor.undo_log().state_id();
    editor.activate_tool(ToolKind::DrawWire);

    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_move(p(10.0, 0.0));
    editor.pointer_up(p(10.0, 0.0));

    assert_eq!(
        traces(&editor),
        vec![(LayerId::TopCopper, (0.0, 0.0), (10.0, 0.0))]
    );
    assert_eq!(editor.undo_log().state_id(), StateId(before.0 + 1));
    assert!(editor.bus().history(None).iter().any(|e| matches!(
        e,
        EditorEvent::Document(DocumentEvent::Modified { state_id }) if state_id.0 == before.0 + 1
    )));
}

#[test]
fn test_corner_follows_wire_mode() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    editor.configure(ToolSetting::WireMode(WireMode::VerticalHorizontal)).unwrap();
    editor.pointer_down(p(0.0, 0.0));
    editor.double_click(p(4.0, 3.0));

    assert_eq!(
        traces(&editor),
        vec![
            (LayerId::TopCopper, (0.0, 0.0), (0.0, 3.0)),
            (LayerId::TopCopper, (0.0, 3.0), (4.0, 3.0)),
        ]
    );
    // Both segments form one undo step.
    assert_eq!(editor.undo_log().undo_text(), Some("Draw trace"));
    assert!(!editor.undo_log().is_group_active());
}

#[test]
fn test_escape_drops_only_the_open_segment() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_up(p(5.0, 0.0));
    editor.pointer_move(p(5.0, 5.0));
    let committed = editor.undo_log().state_id();

    assert!(editor.key_pressed(Key::Escape));
    assert_eq!(editor.current_tool(), ToolKind::DrawWire);
    assert_eq!(traces(&editor).len(), 1);
    assert_eq!(editor.undo_log().state_id(), committed);

    // A second Escape leaves the tool.
    assert!(editor.key_pressed(Key::Escape));
    assert_eq!(editor.current_tool(), ToolKind::Select);
}

#[test]
fn test_undo_while_routing_cancels_then_undoes() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_up(p(5.0, 0.0));
    assert!(editor.undo_log().is_group_active());
    assert!(!editor.snapshot().can_undo);

    editor.undo().unwrap();
    assert!(traces(&editor).is_empty());
    assert!(!editor.undo_log().is_group_active());

    editor.redo().unwrap();
    assert_eq!(traces(&editor).len(), 1);
    assert_eq!(editor.snapshot().redo_text, None);
}

#[test]
fn test_ending_on_copper_finishes_and_takes_its_net() {
    let gnd = net("GND");
    let gnd_id = gnd.id;
    let existing = trace(LayerId::TopCopper, Some(gnd_id), p(10.0, 0.0), p(10.0, 10.0));
    let mut editor = editor(board(vec![gnd], vec![existing]));
    editor.activate_tool(ToolKind::DrawWire);

    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_down(p(10.0, 0.0));
    assert!(!editor.undo_log().is_group_active());
    let nets: Vec<_> = editor
        .document()
        .traces()
        .map(|(_, t)| t.net)
        .collect();
    assert!(nets.iter().all(|n| *n == Some(gnd_id)));
}

#[test]
fn test_disabled_layer_is_rejected() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    assert!(matches!(
        editor.configure(ToolSetting::Layer(LayerId::Inner1)),
        Err(EditorError::InvalidLayer(LayerId::Inner1))
    ));
    assert!(editor.configure(ToolSetting::Layer(LayerId::BottomCopper)).unwrap());
    editor.pointer_down(p(0.0, 0.0));
    editor.double_click(p(2.0, 0.0));
    assert_eq!(traces(&editor)[0].0, LayerId::BottomCopper);
}

#[test]
fn test_right_click_cycles_mode_while_routing() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::DrawWire);
    editor.pointer_down(p(0.0, 0.0));
    assert!(editor.right_up(p(0.0, 0.0)));
    assert_eq!(editor.current_tool(), ToolKind::DrawWire);
    match editor.snapshot().parameters {
        boardkit_editor::ToolParameters::Wire { mode, .. } => {
            assert_eq!(mode, WireMode::HorizontalVertical.next())
        }
        other => panic!("unexpected parameters {:?}", other),
    }
}
