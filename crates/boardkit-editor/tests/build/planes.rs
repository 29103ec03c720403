use boardkit_editor::build::JobContext;
use boardkit_editor::model::LayerId;
use boardkit_editor::{BoardCommand, DocumentEvent, EditorEvent, PlaneJob};
use proptest::prelude::*;
use std::collections::BTreeSet;

use crate::common::{board, editor, later, net, outline, p, plane, rect, trace, TIMEOUT};

fn two_plane_board() -> boardkit_editor::model::Document {
    let gnd = net("GND");
    let vcc = net("VCC");
    let items = vec![
        outline(30.0),
        plane(LayerId::TopCopper, gnd.id, rect(1.0, 1.0, 29.0, 29.0)),
        plane(LayerId::BottomCopper, vcc.id, rect(1.0, 1.0, 29.0, 29.0)),
        trace(LayerId::TopCopper, None, p(5.0, 15.0), p(25.0, 15.0)),
        trace(LayerId::BottomCopper, None, p(15.0, 5.0), p(15.0, 25.0)),
    ];
    board(vec![gnd, vcc], items)
}

#[test]
fn test_first_observer_triggers_full_rebuild() {
    let mut editor = editor(two_plane_board());
    editor.tick(later(5));
    assert!(!editor.planes_busy());

    editor.add_plane_observer(BTreeSet::new());
    editor.tick(std::time::Instant::now());
    assert!(editor.wait_for_builds(TIMEOUT));

    let doc = editor.document();
    assert!(doc.planes().all(|(item, _)| !doc.fragments(item.id).is_empty()));
    assert!(doc.scheduled_plane_layers().is_empty());
    assert!(editor.bus().history(None).iter().any(|e| matches!(
        e,
        EditorEvent::Document(DocumentEvent::FragmentsUpdated { layers }) if layers.len() == 2
    )));
}

#[test]
fn test_restricted_rebuild_leaves_other_layers_scheduled() {
    let mut editor = editor(two_plane_board());
    let top: BTreeSet<_> = [LayerId::TopCopper].into();
    let observer = editor.add_plane_observer(top);
    editor.tick(std::time::Instant::now());
    assert!(editor.wait_for_builds(TIMEOUT));

    let bottom_trace = trace(LayerId::BottomCopper, None, p(5.0, 5.0), p(8.0, 5.0));
    editor
        .execute(BoardCommand::AddItems(vec![bottom_trace.clone()]))
        .unwrap();
    editor.tick(later(5));
    assert!(!editor.planes_busy());
    assert!(editor
        .document()
        .scheduled_plane_layers()
        .contains(&LayerId::BottomCopper));

    let both: BTreeSet<_> = [LayerId::TopCopper, LayerId::BottomCopper].into();
    assert!(editor.update_plane_observer(observer, both));
    editor
        .execute(BoardCommand::MoveItems {
            ids: vec![bottom_trace.id],
            delta: p(1.0, 0.0),
        })
        .unwrap();
    editor.tick(later(10));
    assert!(editor.planes_busy());
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(editor.document().scheduled_plane_layers().is_empty());
    assert!(editor.remove_plane_observer(observer));
}

#[test]
fn test_edits_inside_group_do_not_trigger_rebuild() {
    let mut editor = editor(two_plane_board());
    editor.add_plane_observer(BTreeSet::new());
    editor.tick(std::time::Instant::now());
    assert!(editor.wait_for_builds(TIMEOUT));

    editor.activate_tool(boardkit_editor::ToolKind::DrawWire);
    editor.pointer_down(p(2.0, 20.0));
    editor.pointer_up(p(6.0, 20.0));
    // The wire tool keeps a group open for the next segment.
    assert!(editor.undo_log().is_group_active());
    editor.tick(later(5));
    assert!(!editor.planes_busy());

    editor.abort();
    assert!(!editor.undo_log().is_group_active());
    editor.tick(later(10));
    assert!(editor.planes_busy());
    assert!(editor.wait_for_builds(TIMEOUT));
}

#[test]
fn test_forced_rebuild_without_observers() {
    let mut editor = editor(two_plane_board());
    editor.rebuild_planes();
    assert!(editor.planes_busy());
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(!editor.plane_status_history().is_empty());
    let doc = editor.document();
    assert!(doc.planes().all(|(item, _)| !doc.fragments(item.id).is_empty()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_wider_restriction_covers_narrower(top in any::<bool>(), extra in any::<bool>()) {
        let doc = two_plane_board();
        let mut narrow = BTreeSet::new();
        if top {
            narrow.insert(LayerId::TopCopper);
        } else {
            narrow.insert(LayerId::BottomCopper);
        }
        let mut wide = narrow.clone();
        if extra {
            wide.insert(LayerId::TopCopper);
            wide.insert(LayerId::BottomCopper);
        }

        let ctx = JobContext::detached();
        let mut narrow_doc = doc.clone();
        let narrow_result = PlaneJob::create(&mut narrow_doc, Some(&narrow), true)
            .unwrap()
            .compute(&ctx)
            .unwrap();
        let mut wide_doc = doc.clone();
        let wide_result = PlaneJob::create(&mut wide_doc, Some(&wide), true)
            .unwrap()
            .compute(&ctx)
            .unwrap();

        prop_assert!(wide_result.layers.is_superset(&narrow_result.layers));
        for (plane, fragments) in &narrow_result.fragments {
            prop_assert_eq!(wide_result.fragments.get(plane), Some(fragments));
        }
    }
}
