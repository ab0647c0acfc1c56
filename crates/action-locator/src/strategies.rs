//! Candidate derivation strategies

use crate::types::{Candidate, FallbackStrategy};
use std::collections::HashSet;
use tracing::debug;

/// Derive alternative selectors for `target`, most promising first.
///
/// The original target itself is never returned.
pub fn alternative_targets(target: &str) -> Vec<Candidate> {
    let target = target.trim();
    if target.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    if let Some(text) = embedded_text(target) {
        push_text_candidates(&mut candidates, &text, &[0.8, 0.7, 0.5]);
    } else if is_plain_text(target) {
        push_text_candidates(&mut candidates, target, &[0.75, 0.65, 0.45]);
    }

    if !target.starts_with("//") {
        let escaped = escape_css_value(target);
        candidates.push(Candidate::new(
            format!("[aria-label*=\"{escaped}\"]"),
            FallbackStrategy::AriaLabel,
            0.4,
        ));
        candidates.push(Candidate::new(
            format!("[title*=\"{escaped}\"]"),
            FallbackStrategy::Title,
            0.3,
        ));
    }

    candidates.retain(|candidate| candidate.selector != target);
    debug!(target = %target, count = candidates.len(), "derived fallback candidates");
    candidates
}

/// Merge planner-declared alternatives with derived ones.
///
/// Declared selectors come first in their given order, duplicates and the
/// original target are dropped, and at most `limit` candidates are returned.
pub fn fallback_plan(target: &str, declared: &[String], limit: usize) -> Vec<Candidate> {
    let original = target.trim();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(original.to_string());

    let declared = declared
        .iter()
        .map(|selector| selector.trim())
        .filter(|selector| !selector.is_empty())
        .map(|selector| Candidate::new(selector, FallbackStrategy::Declared, 0.9));

    declared
        .chain(alternative_targets(original))
        .filter(|candidate| seen.insert(candidate.selector.clone()))
        .take(limit)
        .collect()
}

fn push_text_candidates(candidates: &mut Vec<Candidate>, text: &str, confidence: &[f64; 3]) {
    if text.contains('"') {
        return;
    }
    let tags = ["button", "a", "*"];
    for (tag, confidence) in tags.iter().zip(confidence.iter()) {
        candidates.push(Candidate::new(
            format!("//{tag}[contains(text(), \"{text}\")]"),
            FallbackStrategy::TextContains,
            *confidence,
        ));
    }
}

/// Text from a `text()="..."` or `text()='...'` predicate.
fn embedded_text(selector: &str) -> Option<String> {
    let start = selector.find("text()")? + "text()".len();
    let rest = selector[start..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &rest[quote.len_utf8()..];
    let end = body.find(quote)?;
    let text = &body[..end];
    (!text.is_empty()).then(|| text.to_string())
}

/// Targets that read like visible text rather than a selector.
fn is_plain_text(target: &str) -> bool {
    const SELECTOR_CHARS: &[char] = &['#', '.', '[', ']', '>', ':', '=', '/', '(', ')', '*', '"', '\''];
    target.chars().any(char::is_alphabetic)
        && target.contains(' ')
        && !target.contains(SELECTOR_CHARS)
}

fn escape_css_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
