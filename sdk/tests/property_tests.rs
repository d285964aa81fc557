use proptest::prelude::*;
use sdk::errors::{EngineError, ForemanErrorExt};
use sdk::types::{
    history_is_well_formed, CommandResult, Message, ToolInvocation, ToolResult,
};
use std::collections::HashMap;

fn invocation(id: String) -> ToolInvocation {
    ToolInvocation {
        id,
        capability_name: "shell".to_string(),
        arguments: HashMap::new(),
    }
}

proptest! {
    #[test]
    fn test_normalized_layout_with_stderr_and_exit(
        stdout in "\\PC*",
        stderr in "\\PC*[a-z]\\PC*",
        exit_code in 1i32..256
    ) {
        let result = CommandResult {
            stdout,
            stderr,
            exit_code,
            timed_out: false,
        };
        let text = result.normalized();

        let exit_line = format!("Exit code: {}", exit_code);
        prop_assert!(text.ends_with(&exit_line));

        let stderr_pos = text.find("STDERR:").expect("stderr section present");
        let exit_pos = text.rfind(&exit_line).expect("exit line present");
        prop_assert!(stderr_pos < exit_pos);
    }
}

proptest! {
    #[test]
    fn test_normalized_is_trimmed(
        stdout in "\\PC*",
        stderr in "\\PC*",
        exit_code in 0i32..256
    ) {
        let result = CommandResult {
            stdout,
            stderr,
            exit_code,
            timed_out: false,
        };
        let text = result.normalized();
        prop_assert_eq!(text.trim(), text.as_str());
    }
}

proptest! {
    #[test]
    fn test_zero_exit_has_no_exit_line(stdout in "[a-z ]*") {
        let result = CommandResult {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            timed_out: false,
        };
        let text = result.normalized();
        prop_assert!(!text.contains("Exit code:"));
        prop_assert!(!text.contains("STDERR:"));
    }
}

/// Build a history of complete exchanges: each entry is the number of
/// tool calls in that turn (zero means a plain assistant answer).
fn build_history(turns: &[u8]) -> Vec<Message> {
    let mut history = vec![Message::system("sys"), Message::user("go")];
    let mut next_id = 0u32;
    for &calls in turns {
        if calls == 0 {
            history.push(Message::assistant("answer"));
        } else {
            let ids: Vec<String> = (0..calls)
                .map(|_| {
                    next_id += 1;
                    format!("call_{}", next_id)
                })
                .collect();
            history.push(Message::assistant_with_calls(
                "",
                ids.iter().cloned().map(invocation).collect(),
            ));
            for id in ids {
                history.push(Message::tool_result(&ToolResult::success(id, "ok")));
            }
        }
    }
    history
}

proptest! {
    #[test]
    fn test_complete_exchanges_are_well_formed(turns in prop::collection::vec(0u8..4, 0..8)) {
        let history = build_history(&turns);
        prop_assert!(history_is_well_formed(&history));
    }
}

proptest! {
    #[test]
    fn test_duplicated_tool_result_breaks_history(turns in prop::collection::vec(1u8..4, 1..6)) {
        let mut history = build_history(&turns);
        // Duplicate the last tool message; its invocation is already answered.
        let dup = history
            .iter()
            .rev()
            .find(|m| m.tool_call_id.is_some())
            .cloned()
            .expect("at least one tool message");
        history.push(dup);
        prop_assert!(!history_is_well_formed(&history));
    }
}

proptest! {
    #[test]
    fn test_orphan_tool_result_breaks_history(turns in prop::collection::vec(0u8..4, 0..6)) {
        let mut history = build_history(&turns);
        history.push(Message::tool_result(&ToolResult::error(
            "call_unanswered",
            "orphan",
        )));
        prop_assert!(!history_is_well_formed(&history));
    }
}

proptest! {
    #[test]
    fn test_error_user_hints_are_safe(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::ReasoningUnavailable(error_str.clone()),
            EngineError::MissingCredential(error_str.clone()),
            EngineError::MalformedPayload(error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
        }
    }
}
