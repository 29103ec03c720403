use boardkit_editor::model::LayerId;
use boardkit_editor::{BoardCommand, DocumentEvent, EditorEvent, RuleCheckStatus};

use crate::common::{clearance_board, editor, p, trace, TIMEOUT};

#[test]
fn test_not_run_yet_before_first_check() {
    let (doc, _) = clearance_board();
    let editor = editor(doc);
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::NotRunYet);
    assert!(editor.drc_messages().is_empty());
    assert_eq!(editor.snapshot().last_check, None);
}

#[test]
fn test_full_check_approve_and_rerun_is_up_to_date() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);

    assert!(editor.run_drc(false));
    assert!(editor.wait_for_builds(TIMEOUT));
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::UpToDate);
    let entries = editor.drc_messages();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message.rule, "copper_clearance");
    assert!(!entries[0].approved);
    assert_eq!(editor.snapshot().unapproved_count, 1);

    assert!(editor.set_approved(entries[0].message.approval.clone(), true));
    // Approving twice changes nothing.
    assert!(!editor.set_approved(entries[0].message.approval.clone(), true));

    assert!(editor.run_drc(false));
    assert!(editor.wait_for_builds(TIMEOUT));
    let snapshot = editor.snapshot();
    assert_eq!(snapshot.rule_check_status, RuleCheckStatus::UpToDate);
    assert_eq!(snapshot.message_count, 1);
    assert_eq!(snapshot.unapproved_count, 0);
    assert!(editor.drc_messages()[0].approved);
    assert!(snapshot.last_check.is_some());
    assert!(snapshot.can_save);
}

#[test]
fn test_edit_during_check_marks_result_outdated() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    let before = editor.undo_log().state_id();

    assert!(editor.run_drc(true));
    editor
        .execute(BoardCommand::AddItems(vec![trace(
            LayerId::BottomCopper,
            None,
            p(2.0, 18.0),
            p(8.0, 18.0),
        )]))
        .unwrap();
    assert!(editor.wait_for_builds(TIMEOUT));

    assert_eq!(editor.drc_state_id(), Some(before));
    assert_ne!(editor.undo_log().state_id(), before);
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::Outdated);
    assert_eq!(editor.drc_messages().len(), 1);
}

#[test]
fn test_restarted_check_discards_superseded_run() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);

    assert!(editor.run_drc(false));
    assert!(editor.run_drc(true));
    assert!(editor.wait_for_builds(TIMEOUT));
    // Let the canceled worker deliver whatever it still sends.
    std::thread::sleep(std::time::Duration::from_millis(50));
    editor.tick(std::time::Instant::now());

    assert_eq!(editor.drc_generation(), Some(2));
    assert!(editor.drc_report().unwrap().quick);
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::UpToDate);
}

#[test]
fn test_repeated_check_is_idempotent() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);

    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));
    let first_keys = editor.drc_report().unwrap().keys();
    let first_state = editor.drc_state_id();

    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));
    assert_eq!(editor.drc_report().unwrap().keys(), first_keys);
    assert_eq!(editor.drc_state_id(), first_state);
    assert_eq!(editor.drc_generation(), Some(2));
}

#[test]
fn test_check_reports_progress_and_status() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));

    let history = editor.drc_status_history();
    assert_eq!(history.first().map(String::as_str), Some("Rebuild planes..."));
    assert_eq!(
        history.last().map(String::as_str),
        Some("Finished with 1 message(s)!")
    );

    let events = editor.bus().history(None);
    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            EditorEvent::Build(boardkit_editor::BuildEvent::Progress { percent, .. }) => {
                Some(*percent)
            }
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(progress.last(), Some(&100));
    let finished = events
        .iter()
        .filter(|e| matches!(e, EditorEvent::Build(boardkit_editor::BuildEvent::Finished { .. })))
        .count();
    assert_eq!(finished, 1);
}

#[test]
fn test_full_check_applies_plane_fragments() {
    let gnd = crate::common::net("GND");
    let plane = crate::common::plane(
        LayerId::BottomCopper,
        gnd.id,
        crate::common::rect(1.0, 1.0, 19.0, 19.0),
    );
    let doc = crate::common::board(vec![gnd], vec![crate::common::outline(20.0), plane.clone()]);
    let mut editor = editor(doc);
    assert!(editor.document().fragments(plane.id).is_empty());

    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(!editor.document().fragments(plane.id).is_empty());
    assert!(editor.bus().history(None).iter().any(|e| matches!(
        e,
        EditorEvent::Document(DocumentEvent::FragmentsUpdated { layers })
            if layers.contains(&LayerId::BottomCopper)
    )));
}

#[test]
fn test_first_observer_runs_a_quick_check() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    editor.tick(std::time::Instant::now());
    assert!(!editor.drc_busy());

    let observer = editor.add_drc_observer();
    editor.tick(std::time::Instant::now());
    assert!(editor.drc_busy());
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(editor.drc_report().unwrap().quick);
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::UpToDate);
    assert!(editor.remove_drc_observer(observer));
}
