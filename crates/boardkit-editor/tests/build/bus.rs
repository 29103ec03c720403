use boardkit_core::EventFilter;
use boardkit_editor::{BuildEvent, BuildOutcome, BuilderKind, EditorCategory, EditorEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::common::{clearance_board, editor, TIMEOUT};

#[tokio::test]
async fn test_async_receiver_sees_build_lifecycle() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    let mut rx = editor.bus().receiver();

    editor.run_drc(true);
    assert!(editor.wait_for_builds(TIMEOUT));

    let mut started = false;
    let mut outcome = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            EditorEvent::Build(BuildEvent::Started { builder, .. }) => {
                assert_eq!(builder, BuilderKind::Drc);
                started = true;
            }
            EditorEvent::Build(BuildEvent::Finished { outcome: o, .. }) => outcome = Some(o),
            _ => {}
        }
    }
    assert!(started);
    assert_eq!(outcome, Some(BuildOutcome::Completed));
}

#[test]
fn test_canceled_run_reports_canceled_outcome() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    let canceled = Arc::new(AtomicUsize::new(0));
    let counter = canceled.clone();
    let _guard = editor.bus().subscribe_scoped(
        EventFilter::Categories(vec![EditorCategory::Build]),
        move |event| {
            if let EditorEvent::Build(BuildEvent::Finished {
                outcome: BuildOutcome::Canceled,
                ..
            }) = event
            {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        },
    );

    editor.run_drc(false);
    editor.run_drc(false);
    assert!(editor.wait_for_builds(TIMEOUT));
    assert_eq!(canceled.load(Ordering::SeqCst), 1);
    assert_eq!(editor.drc_generation(), Some(2));
}

#[test]
fn test_scoped_subscription_detaches_on_drop() {
    let (doc, _) = clearance_board();
    let mut editor = editor(doc);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let guard = editor.bus().subscribe_scoped(EventFilter::All, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    editor.activate_tool(boardkit_editor::ToolKind::Measure);
    let after_first = seen.load(Ordering::SeqCst);
    assert!(after_first > 0);

    drop(guard);
    editor.activate_tool(boardkit_editor::ToolKind::Select);
    assert_eq!(seen.load(Ordering::SeqCst), after_first);
}
