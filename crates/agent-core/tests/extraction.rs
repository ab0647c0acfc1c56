use agent_core::{parse_response, AgentError};
use serde_json::json;
use std::collections::BTreeMap;
use webpilot_core_types::{
    Action, ActionType, Decision, FormField, Observation, PageType, Plan, Readiness, RiskLevel,
    Step,
};

fn wrap(json: &str) -> String {
    format!("Here is my analysis of the page.\n```json\n{json}\n```\nLet me know if anything else is needed.")
}

#[test]
fn plan_survives_serialize_and_extract() {
    let mut fields = BTreeMap::new();
    fields.insert("email".to_string(), json!("placeholder@example.com"));
    let mut plan = Plan::new(vec![
        Step::new(ActionType::Navigate, "https://example.com")
            .with_description("Open the site")
            .with_wait_for("page load"),
        Step::new(ActionType::Click, "//button[text()=\"Sign up\"]")
            .with_alternatives(["a.signup", "#register"]),
        Step::new(ActionType::FillForm, "form#signup").with_data(json!(fields)),
    ])
    .with_expected_outcome("Account registered");
    plan.risk_level = "medium".to_string();

    let text = serde_json::to_string_pretty(&plan).expect("serialize");
    let parsed: Plan = parse_response(&wrap(&text)).expect("extract");
    assert_eq!(parsed, plan);
}

#[test]
fn action_survives_serialize_and_extract() {
    let mut fields = BTreeMap::new();
    fields.insert("password".to_string(), json!("SecureP@ss123!"));
    for action in [
        Action::click("button#signup")
            .with_reasoning("The sign-up entry point is visible")
            .with_confidence(0.8)
            .with_expected_outcome("Registration form opens"),
        Action::type_text("input[name=\"email\"]", "a@b.c"),
        Action::fill_form(fields),
        Action::new(ActionType::Other("hover".into()), "#menu"),
    ] {
        let text = serde_json::to_string(&action).expect("serialize");
        let parsed: Action = parse_response(&wrap(&text)).expect("extract");
        assert_eq!(parsed, action);
    }
}

#[test]
fn observation_survives_serialize_and_extract() {
    let observation = Observation {
        page_type: PageType::Registration,
        available_actions: vec![Action::click("#submit").with_confidence(0.6)],
        form_fields: vec![FormField {
            name: "email".into(),
            field_type: "email".into(),
            selector: "input#email".into(),
            required: true,
            current_value: None,
        }],
        readiness: Readiness::Ready,
        captcha_present: true,
        ..Observation::default()
    };

    let text = serde_json::to_string_pretty(&observation).expect("serialize");
    let parsed: Observation = parse_response(&wrap(&text)).expect("extract");
    assert_eq!(parsed, observation);
}

#[test]
fn loose_decision_is_repaired() {
    let raw = r#"Decision:
{
  action: {type: "click", target: "button#signup", confidence: 0.7,},
  riskAssessment: "Low",
  shouldContinue: true,
}"#;
    let decision: Decision = parse_response(raw).expect("repair");
    assert_eq!(decision.action.kind, ActionType::Click);
    assert_eq!(decision.action.target.as_text(), Some("button#signup"));
    assert_eq!(decision.risk_assessment, RiskLevel::Low);
    assert!(decision.should_continue);
}

#[test]
fn object_of_wrong_shape_is_malformed() {
    let err = parse_response::<Decision>(r#"{"shouldContinue": false}"#).expect_err("shape");
    assert!(matches!(err, AgentError::MalformedResponse(_)));
}
