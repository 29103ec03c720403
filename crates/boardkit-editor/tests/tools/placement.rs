use boardkit_editor::model::{DeviceTemplate, ItemData, LayerId, Pad};
use boardkit_editor::tools::Preview;
use boardkit_editor::{
    EditorCoordinator, EditorEvent, RequestOutcome, ToolKind, ToolParameters, ToolRequest,
    ToolSetting,
};

use crate::common::{board, editor, net, p};

fn only_item(editor: &EditorCoordinator) -> ItemData {
    let items: Vec<_> = editor.document().items().collect();
    assert_eq!(items.len(), 1);
    items[0].data.clone()
}

fn resistor() -> DeviceTemplate {
    DeviceTemplate {
        name: "R1".into(),
        pads: vec![
            Pad::smd("1", p(-1.0, 0.0), 1.0, 1.2),
            Pad::smd("2", p(1.0, 0.0), 1.0, 1.2),
        ],
    }
}

#[test]
fn test_via_placed_on_grid_with_chosen_net() {
    let vcc = net("VCC");
    let vcc_id = vcc.id;
    let mut editor = editor(board(vec![vcc], vec![]));
    editor.activate_tool(ToolKind::AddVia);
    assert!(editor.configure(ToolSetting::Net(Some(vcc_id))).unwrap());

    editor.pointer_down(p(3.1, 4.2));
    match only_item(&editor) {
        ItemData::Via(via) => {
            assert_eq!(via.position, p(3.0, 4.0));
            assert_eq!(via.net, Some(vcc_id));
            assert_eq!((via.size, via.drill), (0.7, 0.3));
        }
        other => panic!("expected a via, got {:?}", other),
    }
    assert_eq!(editor.undo_log().undo_text(), Some("Add via"));
    assert_eq!(editor.current_tool(), ToolKind::AddVia);
}

#[test]
fn test_hole_uses_configured_diameter() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddHole);
    assert!(editor.configure(ToolSetting::HoleDiameter(3.2)).unwrap());
    assert!(editor.configure(ToolSetting::HoleDiameter(0.0)).is_err());

    editor.pointer_down(p(5.2, 5.3));
    match only_item(&editor) {
        ItemData::Hole(hole) => {
            assert_eq!(hole.position, p(5.0, 5.5));
            assert_eq!(hole.diameter, 3.2);
        }
        other => panic!("expected a hole, got {:?}", other),
    }
    assert_eq!(editor.current_tool(), ToolKind::AddHole);
}

#[test]
fn test_right_click_rotates_text_preview() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddStrokeText);
    editor.pointer_move(p(2.0, 2.0));

    assert!(editor.right_up(p(2.0, 2.0)));
    assert_eq!(editor.current_tool(), ToolKind::AddStrokeText);
    match editor.snapshot().parameters {
        ToolParameters::Text { rotation, .. } => assert_eq!(rotation, 90.0),
        other => panic!("unexpected parameters {:?}", other),
    }
    let preview = editor.bus().history(None).iter().rev().find_map(|e| match e {
        EditorEvent::PreviewChanged(Preview::Items(items)) => Some(items.clone()),
        _ => None,
    });
    match preview.as_deref() {
        Some([item]) => match &item.data {
            ItemData::StrokeText(text) => {
                assert_eq!(text.rotation, 90.0);
                assert_eq!(text.position, p(2.0, 2.0));
            }
            other => panic!("expected a text preview, got {:?}", other),
        },
        other => panic!("expected one previewed item, got {:?}", other),
    }

    editor.pointer_down(p(2.0, 2.0));
    match only_item(&editor) {
        ItemData::StrokeText(text) => {
            assert_eq!(text.rotation, 90.0);
            assert_eq!(text.layer, LayerId::TopSilkscreen);
        }
        other => panic!("expected a text, got {:?}", other),
    }
}

#[test]
fn test_text_flip_moves_to_bottom_side() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddStrokeText);
    assert_eq!(editor.request(&ToolRequest::Flip), RequestOutcome::Handled);
    editor.pointer_down(p(1.0, 1.0));
    match only_item(&editor) {
        ItemData::StrokeText(text) => {
            assert!(text.mirrored);
            assert_eq!(text.layer, LayerId::BottomSilkscreen);
        }
        other => panic!("expected a text, got {:?}", other),
    }
}

#[test]
fn test_device_rotated_before_placement() {
    let mut editor = editor(board(vec![], vec![]));
    assert!(editor.start_add_device(resistor()));
    assert!(editor.right_up(p(0.0, 0.0)));
    assert_eq!(editor.current_tool(), ToolKind::AddDevice);

    editor.pointer_down(p(10.2, 9.9));
    match only_item(&editor) {
        ItemData::Device(device) => {
            assert_eq!(device.position, p(10.0, 10.0));
            assert_eq!(device.rotation, 90.0);
            assert_eq!(device.pads.len(), 2);
        }
        other => panic!("expected a device, got {:?}", other),
    }
    assert_eq!(editor.current_tool(), ToolKind::Select);
}

#[test]
fn test_device_tool_without_template_places_nothing() {
    let mut editor = editor(board(vec![], vec![]));
    editor.activate_tool(ToolKind::AddDevice);
    editor.pointer_down(p(1.0, 1.0));
    assert_eq!(editor.document().item_count(), 0);
    assert_eq!(editor.current_tool(), ToolKind::AddDevice);
}
