use learning_ledger::{Ledger, SharedLedger};
use serde_json::Value;
use webpilot_core_types::{Action, ActionResult};

#[test]
fn keeps_newest_fifty_after_overflow() {
    let mut ledger = Ledger::new();
    for i in 0..101 {
        ledger.record(
            &Action::click(format!("#item-{i}")),
            &ActionResult::ok("clicked"),
        );
    }
    let history = ledger.history();
    assert_eq!(history.len(), 50);
    assert_eq!(history.first().map(|f| f.sequence), Some(52));
    assert_eq!(history.last().map(|f| f.sequence), Some(101));
}

#[test]
fn hundred_entries_do_not_truncate() {
    let mut ledger = Ledger::new();
    for _ in 0..100 {
        ledger.record(&Action::click("#a"), &ActionResult::ok("clicked"));
    }
    assert_eq!(ledger.history().len(), 100);
}

#[test]
fn stats_count_distinct_patterns() {
    let mut ledger = Ledger::new();
    ledger.record(&Action::navigate("https://example.com/"), &ActionResult::ok("ok"));
    ledger.record(&Action::navigate("https://EXAMPLE.com"), &ActionResult::ok("ok"));
    ledger.record(&Action::click("#signup"), &ActionResult::failed("missing"));
    ledger.record(&Action::click("#signup"), &ActionResult::ok("ok"));

    let stats = ledger.stats();
    assert_eq!(stats.total_actions, 4);
    assert_eq!(stats.success_pattern_count, 2);
    assert_eq!(stats.failure_pattern_count, 1);
    assert!((stats.success_rate - 0.75).abs() < f64::EPSILON);
}

#[test]
fn empty_ledger_has_zero_rate() {
    let stats = Ledger::new().stats();
    assert_eq!(stats.total_actions, 0);
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(Ledger::new().success_context("anything"), "[]");
}

#[test]
fn context_is_capped_and_prefers_relevant_targets() {
    let mut ledger = Ledger::new();
    for i in 0..8 {
        ledger.record(&Action::click(format!("#other-{i}")), &ActionResult::ok("ok"));
        ledger.record(&Action::click(format!("#other-{i}")), &ActionResult::ok("ok"));
    }
    ledger.record(&Action::click("button#signup"), &ActionResult::ok("ok"));

    let context: Value =
        serde_json::from_str(&ledger.success_context("Signup for a newsletter")).expect("json");
    let entries = context.as_array().expect("array");
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0]["action"], "click_button#signup");
    assert_eq!(entries[0]["count"], 1);
    assert!(entries[0].get("lastSuccess").is_some());
    assert_eq!(entries[1]["count"], 2);
}

#[test]
fn failure_context_reports_last_failure() {
    let mut ledger = Ledger::new();
    ledger.record(&Action::click("#a"), &ActionResult::failed("first"));
    ledger.record(&Action::click("#a"), &ActionResult::failed("second"));
    let context: Value =
        serde_json::from_str(&ledger.failure_context("whatever")).expect("json");
    assert_eq!(context[0]["count"], 2);
    assert_eq!(context[0]["lastFailure"]["error"], "second");
}

#[test]
fn shared_handle_sees_every_record() {
    let shared = SharedLedger::new(Ledger::new());
    let clone = shared.clone();
    clone.record(&Action::click("#a"), &ActionResult::ok("ok"));
    shared.record(&Action::click("#b"), &ActionResult::failed("x"));
    assert_eq!(shared.stats().total_actions, 2);
    assert_eq!(clone.recent(1)[0].action.target.as_text(), Some("#b"));
}
