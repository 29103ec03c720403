use boardkit_core::StateId;
use boardkit_editor::model::{BoardItem, Device, DeviceTemplate, ItemData, LayerId, Pad, Trace};
use boardkit_editor::{EditorCoordinator, RequestOutcome, ToolKind, ToolRequest};

use crate::common::{board, editor, p, trace};

fn trace_of(editor: &EditorCoordinator, item: &BoardItem) -> Trace {
    match &editor.document().item(item.id).unwrap().data {
        ItemData::Trace(t) => t.clone(),
        other => panic!("expected a trace, got {:?}", other),
    }
}

#[test]
fn test_drag_moves_selection_as_one_step() {
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(10.0, 0.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    let before = editor.undo_log().state_id();

    editor.pointer_down(p(5.0, 0.0));
    editor.pointer_move(p(6.1, 0.2));
    editor.pointer_move(p(7.2, 0.1));
    // Nothing changes until the button is released.
    assert_eq!(trace_of(&editor, &item).start, p(0.0, 0.0));
    editor.pointer_up(p(7.2, 0.1));

    let moved = trace_of(&editor, &item);
    assert_eq!(moved.start, p(2.0, 0.0));
    assert_eq!(moved.end, p(12.0, 0.0));
    assert_eq!(editor.undo_log().state_id(), StateId(before.0 + 1));
    assert!(editor.session().is_selected(item.id));

    editor.undo().unwrap();
    assert_eq!(trace_of(&editor, &item).start, p(0.0, 0.0));
    assert!(!editor.snapshot().can_undo);
}

#[test]
fn test_rubberband_selects_enclosed_items() {
    let inside = trace(LayerId::TopCopper, None, p(2.0, 2.0), p(4.0, 2.0));
    let outside = trace(LayerId::TopCopper, None, p(12.0, 12.0), p(14.0, 12.0));
    let mut editor = editor(board(vec![], vec![inside.clone(), outside.clone()]));
    let before = editor.undo_log().state_id();

    editor.pointer_down(p(0.0, 0.0));
    editor.pointer_move(p(6.0, 6.0));
    editor.pointer_up(p(6.0, 6.0));

    assert_eq!(editor.session().selected_ids(), vec![inside.id]);
    assert_eq!(editor.undo_log().state_id(), before);
}

#[test]
fn test_rotate_turns_about_snapped_center() {
    // Bounds centre is (1.7, 0), which snaps to (1.5, 0).
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(3.4, 0.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    editor.select([item.id]);

    assert_eq!(editor.request(&ToolRequest::Rotate), RequestOutcome::Handled);
    let rotated = trace_of(&editor, &item);
    assert!(rotated.start.nearly_equal(&p(1.5, -1.5), 1e-9), "{:?}", rotated.start);
    assert!(rotated.end.nearly_equal(&p(1.5, 1.9), 1e-9), "{:?}", rotated.end);
    assert_eq!(editor.undo_log().undo_text(), Some("Modify items"));
}

#[test]
fn test_flip_mirrors_to_other_side() {
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(3.4, 1.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    editor.select([item.id]);

    assert_eq!(editor.request(&ToolRequest::Flip), RequestOutcome::Handled);
    let flipped = trace_of(&editor, &item);
    assert!(flipped.start.nearly_equal(&p(3.0, 0.0), 1e-9), "{:?}", flipped.start);
    assert!(flipped.end.nearly_equal(&p(-0.4, 1.0), 1e-9), "{:?}", flipped.end);
    assert_eq!(flipped.layer, LayerId::BottomCopper);
}

#[test]
fn test_locked_items_stay_in_place() {
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(10.0, 0.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    editor.select([item.id]);
    assert_eq!(editor.request(&ToolRequest::Lock), RequestOutcome::Handled);
    assert!(editor.document().item(item.id).unwrap().locked);
    let locked_at = editor.undo_log().state_id();

    editor.pointer_down(p(5.0, 0.0));
    editor.pointer_move(p(8.0, 0.0));
    editor.pointer_up(p(8.0, 0.0));
    assert_eq!(editor.request(&ToolRequest::Rotate), RequestOutcome::Ignored);
    assert_eq!(editor.request(&ToolRequest::Remove), RequestOutcome::Ignored);

    let unchanged = trace_of(&editor, &item);
    assert_eq!((unchanged.start, unchanged.end), (p(0.0, 0.0), p(10.0, 0.0)));
    assert_eq!(editor.undo_log().state_id(), locked_at);

    assert_eq!(editor.request(&ToolRequest::Unlock), RequestOutcome::Handled);
    assert_eq!(editor.request(&ToolRequest::Rotate), RequestOutcome::Handled);
}

#[test]
fn test_line_width_never_goes_negative() {
    let item = trace(LayerId::TopCopper, None, p(0.0, 0.0), p(10.0, 0.0));
    let mut editor = editor(board(vec![], vec![item.clone()]));
    editor.select([item.id]);

    assert_eq!(
        editor.request(&ToolRequest::ChangeLineWidth(2)),
        RequestOutcome::Handled
    );
    assert!((trace_of(&editor, &item).width - 0.4).abs() < 1e-9);

    assert_eq!(
        editor.request(&ToolRequest::ChangeLineWidth(-100)),
        RequestOutcome::Handled
    );
    assert_eq!(trace_of(&editor, &item).width, 0.0);
    // Already at zero: nothing left to change.
    assert_eq!(
        editor.request(&ToolRequest::ChangeLineWidth(-1)),
        RequestOutcome::Ignored
    );
}

#[test]
fn test_reset_texts_restores_device_defaults() {
    let template = DeviceTemplate {
        name: "U1".into(),
        pads: vec![
            Pad::smd("1", p(-1.0, 0.0), 1.0, 1.2),
            Pad::smd("2", p(1.0, 0.0), 1.0, 1.2),
        ],
    };
    let mut device = template.instantiate(p(10.0, 10.0), 0.0, false);
    device.texts.clear();
    let item = BoardItem::new(ItemData::Device(device));
    let mut editor = editor(board(vec![], vec![item.clone()]));

    editor.activate_tool(ToolKind::Select);
    editor.select([item.id]);
    assert_eq!(editor.request(&ToolRequest::ResetTexts), RequestOutcome::Handled);
    match &editor.document().item(item.id).unwrap().data {
        ItemData::Device(d) => assert_eq!(d.texts, Device::default_texts(&template.pads)),
        other => panic!("expected a device, got {:?}", other),
    }

    editor.undo().unwrap();
    match &editor.document().item(item.id).unwrap().data {
        ItemData::Device(d) => assert!(d.texts.is_empty()),
        other => panic!("expected a device, got {:?}", other),
    }
}
