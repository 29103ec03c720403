use boardkit_core::Point;
use boardkit_editor::model::Document;
use boardkit_editor::{
    BoardCommand, DocumentEvent, EditorEvent, JsonFileStore, MemoryStore, RuleCheckStatus,
};

use crate::common::{clearance_board, editor, TIMEOUT};

fn checked(doc: Document, quick: bool) -> boardkit_editor::EditorCoordinator {
    let mut editor = editor(doc);
    editor.run_drc(quick);
    assert!(editor.wait_for_builds(TIMEOUT));
    editor
}

#[test]
fn test_approval_survives_quick_check_and_is_pruned_by_full_check() {
    let (doc, lower) = clearance_board();
    let mut editor = checked(doc, false);
    let key = editor.drc_messages()[0].message.approval.clone();
    editor.set_approved(key.clone(), true);

    // Move the offending trace out of reach.
    editor
        .execute(BoardCommand::MoveItems {
            ids: vec![lower.id],
            delta: Point::new(0.0, 5.0),
        })
        .unwrap();

    editor.run_drc(true);
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(editor.drc_messages().is_empty());
    assert!(editor.document().is_approved(&key));

    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));
    assert!(!editor.document().is_approved(&key));
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::UpToDate);
}

#[test]
fn test_unknown_approvals_are_kept() {
    let (mut doc, _) = clearance_board();
    let foreign = boardkit_editor::ApprovalKey("(imported_rule (item x))".to_string());
    doc.set_approved(foreign.clone(), true);
    let editor = checked(doc, false);
    assert!(editor.document().is_approved(&foreign));
}

#[test]
fn test_approvals_are_persisted() {
    let (doc, _) = clearance_board();
    let mut editor = checked(doc, false);
    let store = MemoryStore::new();
    editor.set_store(Box::new(store.clone()));

    let key = editor.drc_messages()[0].message.approval.clone();
    let state = editor.undo_log().state_id();
    editor.set_approved(key.clone(), true);
    assert_eq!(store.saved().map(|s| s.contains(&key)), Some(true));
    assert!(!editor.document().approvals_dirty());
    // Approvals live outside the undo log.
    assert_eq!(editor.undo_log().state_id(), state);
    assert_eq!(editor.rule_check_status(), RuleCheckStatus::UpToDate);
}

#[test]
fn test_failed_persist_keeps_in_memory_approval() {
    let (doc, _) = clearance_board();
    let mut editor = checked(doc, false);
    let store = MemoryStore::new();
    store.set_failing(true);
    editor.set_store(Box::new(store.clone()));

    let key = editor.drc_messages()[0].message.approval.clone();
    assert!(editor.set_approved(key.clone(), true));
    assert!(editor.document().is_approved(&key));
    assert!(editor.document().approvals_dirty());
    assert_eq!(store.saved(), None);
    assert_eq!(editor.snapshot().unapproved_count, 0);

    let events = editor.bus().history(None);
    assert!(events
        .iter()
        .any(|e| matches!(e, EditorEvent::Document(DocumentEvent::ApprovalsChanged))));
    assert!(events.iter().any(|e| matches!(
        e,
        EditorEvent::StatusMessage { text, .. } if text.starts_with("Failed to save approvals")
    )));
}

#[test]
fn test_json_store_writes_board_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.json");
    let (doc, _) = clearance_board();
    doc.save_json(&path).unwrap();

    let mut editor = checked(Document::load_json(&path).unwrap(), false);
    editor.set_store(Box::new(JsonFileStore::new(&path)));
    let key = editor.drc_messages()[0].message.approval.clone();
    editor.set_approved(key.clone(), true);

    let reloaded = Document::load_json(&path).unwrap();
    assert!(reloaded.is_approved(&key));
}
