use boardkit_editor::{EditorEvent, Key, RequestOutcome, ToolKind, ToolRequest};
use proptest::prelude::*;

use crate::common::{board, editor, outline, p};

#[derive(Debug, Clone)]
enum Step {
    Activate(ToolKind),
    RightClick,
    Escape,
    Click(f64, f64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..ToolKind::ALL.len()).prop_map(|i| Step::Activate(ToolKind::ALL[i])),
        1 => Just(Step::RightClick),
        1 => Just(Step::Escape),
        2 => (0.0..20.0f64, 0.0..20.0f64).prop_map(|(x, y)| Step::Click(x, y)),
    ]
}

fn probes() -> Vec<ToolRequest> {
    vec![
        ToolRequest::Copy,
        ToolRequest::Rotate,
        ToolRequest::Flip,
        ToolRequest::Lock,
    ]
}

#[test]
fn test_only_select_supports_clipboard() {
    let mut editor = editor(board(vec![], vec![outline(20.0)]));
    for kind in ToolKind::ALL {
        editor.activate_tool(kind);
        let outcome = editor.request(&ToolRequest::Copy);
        if kind == ToolKind::Select {
            assert_ne!(outcome, RequestOutcome::Unsupported);
        } else {
            assert_eq!(outcome, RequestOutcome::Unsupported, "{}", kind);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_capabilities_follow_active_tool(steps in prop::collection::vec(step(), 1..20)) {
        let mut editor = editor(board(vec![], vec![outline(20.0)]));
        for step in steps {
            match step {
                Step::Activate(kind) => {
                    editor.activate_tool(kind);
                }
                Step::RightClick => {
                    editor.right_up(p(1.0, 1.0));
                }
                Step::Escape => {
                    editor.key_pressed(Key::Escape);
                }
                Step::Click(x, y) => {
                    editor.pointer_down(p(x, y));
                    editor.pointer_up(p(x, y));
                }
            }

            let tool = editor.current_tool();
            let snapshot = editor.snapshot();
            prop_assert_eq!(snapshot.tool, tool);
            prop_assert_eq!(snapshot.capabilities, tool.capabilities());

            let last = editor.bus().history(None).iter().rev().find_map(|e| match e {
                EditorEvent::ToolChanged { tool, capabilities, .. } => Some((*tool, *capabilities)),
                _ => None,
            });
            prop_assert_eq!(last, Some((tool, tool.capabilities())));

            for request in probes() {
                let supported = tool.capabilities().contains(request.capability());
                let outcome = editor.request(&request);
                prop_assert_eq!(outcome == RequestOutcome::Unsupported, !supported);
            }
        }
    }
}
