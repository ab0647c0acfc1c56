//! Ranked pattern context handed to the decision engine.

use crate::PatternEntry;
use serde::Serialize;
use std::collections::HashMap;
use webpilot_core_types::{Feedback, PatternKey};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Polarity {
    Success,
    Failure,
}

/// One pattern as rendered into the oracle prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub action: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<Feedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<Feedback>,
}

/// Rank patterns by objective relevance, then frequency, then recency, and
/// render the top `limit` as a JSON array.
pub(crate) fn render(
    entries: &HashMap<PatternKey, PatternEntry>,
    objective: &str,
    limit: usize,
    polarity: Polarity,
) -> String {
    let words = objective_words(objective);
    let mut ranked: Vec<(bool, u64, u64, &PatternKey, &Feedback)> = entries
        .iter()
        .filter_map(|(key, entry)| {
            let last = entry.recent.back()?;
            let target = key.target.to_lowercase();
            let relevant = words.iter().any(|word| target.contains(word.as_str()));
            Some((relevant, entry.count, last.sequence, key, last))
        })
        .collect();
    ranked.sort_by(|a, b| (b.0, b.1, b.2).cmp(&(a.0, a.1, a.2)));

    let rendered: Vec<ContextEntry> = ranked
        .into_iter()
        .take(limit)
        .map(|(_, count, _, key, last)| {
            let (last_success, last_failure) = match polarity {
                Polarity::Success => (Some(last.clone()), None),
                Polarity::Failure => (None, Some(last.clone())),
            };
            ContextEntry {
                action: key.to_string(),
                count,
                last_success,
                last_failure,
            }
        })
        .collect();

    serde_json::to_string(&rendered).unwrap_or_else(|_| "[]".to_string())
}

fn objective_words(objective: &str) -> Vec<String> {
    objective
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 4)
        .map(str::to_lowercase)
        .collect()
}
