//! Prompt templates for the oracle-backed roles.
//!
//! Each template embeds the relevant state as pretty-printed JSON and ends
//! with the exact response shape the role parses.

use serde::Serialize;
use webpilot_core_types::{Feedback, Observation, PageSnapshot, Plan};

/// Characters of page content included in a prompt.
pub const CONTENT_PREVIEW_CHARS: usize = 2000;

/// Visible elements included in an observation prompt.
pub const VISIBLE_ELEMENT_LIMIT: usize = 10;

const OBSERVATION_SHAPE: &str = r#"{
  "pageType": "login|registration|form|dashboard|error|loading|search|product|checkout|other",
  "availableActions": [
    {"type": "click|type|navigate|wait|scroll", "target": "selector or URL", "description": "effect of the action", "confidence": 0.0-1.0}
  ],
  "formFields": [
    {"name": "field name", "type": "input type", "selector": "CSS selector", "required": true|false, "currentValue": "value if any"}
  ],
  "messages": [
    {"type": "success|error|warning|info", "text": "message text", "selector": "element selector"}
  ],
  "navigationOptions": [
    {"text": "link text", "url": "destination URL", "selector": "link selector"}
  ],
  "pageReadiness": "ready|loading|error|blocked",
  "captchaPresent": true|false,
  "loginRequired": true|false
}"#;

const DECISION_SHAPE: &str = r#"{
  "action": {
    "type": "click|type|navigate|wait|scroll|fill_form|solve_captcha|complete",
    "target": "selector, URL, milliseconds, or an object of form fields",
    "value": "text to type, if any",
    "description": "what the action does",
    "reasoning": "why this action moves toward the objective",
    "confidence": 0.0-1.0,
    "expectedOutcome": "what the page should show afterwards"
  },
  "alternativeActions": [
    {"type": "action type", "target": "target", "description": "description", "confidence": 0.0-1.0}
  ],
  "riskAssessment": "low|medium|high",
  "progressTowardsGoal": 0.0-1.0,
  "shouldContinue": true|false,
  "adaptationNeeded": true|false
}"#;

const ADAPTATION_SHAPE: &str = r#"{
  "newStrategy": "the different approach to take",
  "reasoning": "why the previous approach failed and why this one should work",
  "alternativeObjective": "a reworded objective, only if the original must change",
  "nextAction": {"type": "action type", "target": "target", "description": "description", "confidence": 0.0-1.0},
  "riskLevel": "low|medium|high"
}"#;

const PROGRESS_SHAPE: &str = r#"{
  "progressScore": 0.0-1.0,
  "isCompleted": true|false,
  "stuckIndicator": true|false,
  "nextMilestone": "what has to happen next",
  "estimatedStepsRemaining": 1-10,
  "confidence": 0.0-1.0
}"#;

const PLAN_SHAPE: &str = r#"{
  "steps": [
    {
      "action": "navigate|click|type|wait|scroll|fill_form|solve_captcha",
      "target": "URL, CSS or XPath selector, or text",
      "description": "what this step does",
      "waitFor": "optional: 'page load' or 'element:<selector>'",
      "data": "optional: text to type, or an object of form fields for fill_form",
      "alternatives": ["optional fallback selectors"]
    }
  ],
  "expectedOutcome": "the result of running the whole plan",
  "riskLevel": "low|medium|high"
}"#;

pub fn observation_prompt(snapshot: &PageSnapshot) -> String {
    let elements: Vec<_> = snapshot
        .visible_elements
        .iter()
        .take(VISIBLE_ELEMENT_LIMIT)
        .collect();
    let mut prompt = format!(
        "You are a web automation agent that adapts to what it sees. Describe the current page as a structured observation.\n\n\
         Current URL: {url}\n\
         Page content (first {limit} characters): {content}...\n\
         Visible elements: {elements}\n",
        url = snapshot.url,
        limit = CONTENT_PREVIEW_CHARS,
        content = preview(&snapshot.content),
        elements = compact(&elements),
    );
    if let Some(error) = snapshot.error.as_deref() {
        prompt.push_str(&format!("Recent error: {error}\n"));
    }
    prompt.push_str("\nRespond with a single JSON object:\n");
    prompt.push_str(OBSERVATION_SHAPE);
    prompt
}

pub fn decision_prompt(
    objective: &str,
    state: &Observation,
    recent: &[Feedback],
    success_context: &str,
    failure_context: &str,
) -> String {
    format!(
        "You are a web automation agent that adapts to what it sees. Choose the single best next action for the objective.\n\n\
         OBJECTIVE: {objective}\n\n\
         CURRENT STATE:\n{state}\n\n\
         RECENT ACTIONS:\n{recent}\n\n\
         ACTIONS THAT WORKED BEFORE:\n{success_context}\n\n\
         ACTIONS THAT FAILED BEFORE (avoid them):\n{failure_context}\n\n\
         Respond with a single JSON object:\n{DECISION_SHAPE}\n\n\
         Guidelines:\n\
         1. For sign-up or registration objectives, open the sign-up entry point before filling anything.\n\
         2. Use a third-party sign-in option only when the objective asks for it.\n\
         3. Prefer the action that advances the objective most directly.\n\
         4. When no path is obvious, try a different approach instead of repeating a failed one.\n\
         5. Fill several form fields at once with fill_form when possible.\n\
         6. Use the action type \"complete\" only when the objective has been achieved.",
        state = pretty(state),
        recent = pretty(&recent),
    )
}

pub fn adaptation_prompt(objective: &str, state: &Observation, failures: &[Feedback]) -> String {
    format!(
        "You are a web automation agent whose recent actions keep failing. Propose a different strategy.\n\n\
         OBJECTIVE: {objective}\n\
         CURRENT STATE:\n{state}\n\
         RECENT FAILURES:\n{failures}\n\n\
         The current approach is not working. Suggest a clearly different one.\n\n\
         Respond with a single JSON object:\n{ADAPTATION_SHAPE}",
        state = pretty(state),
        failures = pretty(&failures),
    )
}

pub fn progress_prompt(
    objective: &str,
    initial: &Observation,
    current: &Observation,
    history: &[Feedback],
) -> String {
    format!(
        "Judge how far the objective has progressed from the state changes and the actions taken.\n\n\
         OBJECTIVE: {objective}\n\
         INITIAL STATE:\n{initial}\n\
         CURRENT STATE:\n{current}\n\
         ACTIONS TAKEN:\n{history}\n\n\
         Respond with a single JSON object:\n{PROGRESS_SHAPE}",
        initial = pretty(initial),
        current = pretty(current),
        history = pretty(&history),
    )
}

pub fn plan_prompt(objective: &str) -> String {
    format!(
        "You are a web automation assistant. Turn the command into a step-by-step execution plan for a browser automation tool.\n\n\
         Command: \"{objective}\"\n\n\
         Respond with a single JSON object:\n{PLAN_SHAPE}\n\n\
         Rules:\n\
         1. If the command names a site (for example \"example.com\"), the first step navigates to it over https.\n\
         2. Do not fall back to a search engine unless no site is named.\n\
         3. Split registrations into small steps: navigate, open sign-up, fill the form, submit.\n\
         4. Targets for click, type and fill_form are CSS or XPath selectors, never prose.\n\
         5. Give alternative selectors for critical elements and a waitFor condition where the page changes."
    )
}

pub fn revision_prompt(
    plan: &Plan,
    snapshot: &PageSnapshot,
    cursor: usize,
    error: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are a web automation assistant. A step of the execution plan failed. Revise the plan to fit the page as it is now.\n\n\
         Current plan:\n{plan}\n\n\
         Failed step index: {cursor}\n\
         Current URL: {url}\n\
         Page content (first {limit} characters):\n{content}...\n",
        plan = pretty(plan),
        url = snapshot.url,
        limit = CONTENT_PREVIEW_CHARS,
        content = preview(&snapshot.content),
    );
    if let Some(error) = error {
        prompt.push_str(&format!("\nError: {error}\n"));
    }
    prompt.push_str(&format!(
        "\nRespond with a complete revised plan as a single JSON object:\n{PLAN_SHAPE}\n\n\
         Use selectors that exist on the current page, add alternatives for fragile elements \
         and wait conditions between steps."
    ));
    prompt
}

/// First [`CONTENT_PREVIEW_CHARS`] characters of `content`.
pub fn preview(content: &str) -> &str {
    match content.char_indices().nth(CONTENT_PREVIEW_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

fn compact<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}
