#![cfg(feature = "json")]

use std::process::{Command, Output};

fn qedit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qedit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute qedit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

#[test]
fn test_toggle_command() {
    let output = qedit(&["assigned:[me,team]", "toggle", "0", "me"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), "assigned:team");
}

#[test]
fn test_toggle_escapes_value() {
    let output = qedit(&["browser:chrome", "toggle", "0", "Mobile Safari", "--escape"]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), r#"browser:[chrome,"Mobile Safari"]"#);
}

#[test]
fn test_replace_text_and_delete() {
    let output = qedit(&["is:unresolved  assigned:me", "replace-text", "1", ""]);
    assert_eq!(stdout(&output), "is:unresolved assigned:me");

    let output = qedit(&["is:unresolved  assigned:me", "delete", "1"]);
    assert_eq!(stdout(&output), "is:unresolvedassigned:me");
}

#[test]
fn test_set_op_command() {
    let output = qedit(&["level:error", "set-op", "0", "!="]);
    assert_eq!(stdout(&output), "!level:error");

    let output = qedit(&["times_seen:10", "set-op", "0", ">="]);
    assert_eq!(stdout(&output), "times_seen:>=10");
}

#[test]
fn test_apply_actions_in_order() {
    let actions = r#"[
        {"type": "TOGGLE_FILTER_VALUE", "token": 0, "value": "me"},
        {"type": "DELETE_LAST_MULTI_SELECT_FILTER_VALUE", "token": 0},
        {"type": "NOT_A_REAL_ACTION"},
        {"type": "UPDATE_FREE_TEXT", "token": 1, "text": ""}
    ]"#;
    let output = qedit(&["--json", "assigned:[me,team]   is:unresolved", "apply", actions]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), r#"{"query":"assigned: is:unresolved"}"#);
}

#[test]
fn test_not_a_filter_fails() {
    let output = qedit(&["hello", "pop-value", "0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("expected a filter"));
}

#[test]
fn test_tokens_listing() {
    let output = qedit(&["is:unresolved hello", "tokens"]);
    let listing = stdout(&output);
    assert!(listing.contains("filter"), "{}", listing);
    assert!(listing.contains("free_text"), "{}", listing);
    assert!(listing.contains("key=\"is\""), "{}", listing);
}

#[test]
fn test_apply_delete_tokens_by_index() {
    let actions = r#"[{"type": "DELETE_TOKENS", "tokens": [2, 3]}]"#;
    let output = qedit(&["is:unresolved hello assigned:me", "apply", actions]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), "is:unresolved assigned:me");
}

#[test]
fn test_apply_rejects_inline_token_from_earlier_query() {
    // both tokens were taken from "a b c"; after the first delete "c" no longer sits at 4..5
    let actions = r#"[
        {"type": "DELETE_TOKEN", "token": {"kind": {"type": "free_text", "quoted": false}, "span": {"start": 0, "end": 1}, "text": "a"}},
        {"type": "DELETE_TOKEN", "token": {"kind": {"type": "free_text", "quoted": false}, "span": {"start": 4, "end": 5}, "text": "c"}}
    ]"#;
    let output = qedit(&["a b c", "apply", actions]);
    assert!(!output.status.success(), "{:?}", output);
    assert!(stdout(&output).is_empty());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("not part of the parsed query"),
        "{:?}",
        output
    );
}

#[test]
fn test_apply_accepts_matching_inline_token() {
    let actions = r#"[
        {"type": "DELETE_TOKEN", "token": {"kind": {"type": "free_text", "quoted": false}, "span": {"start": 4, "end": 5}, "text": "c"}}
    ]"#;
    let output = qedit(&["a b c", "apply", actions]);
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(stdout(&output), "a b ");
}
