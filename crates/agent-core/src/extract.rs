//! Recovery of JSON objects from free-form oracle text.
//!
//! Oracles tend to wrap their answer in markdown fences, prepend commentary,
//! or emit JavaScript-flavoured object literals. Extraction first tries a
//! strict parse and then a single bounded repair pass:
//!
//! 1. take the outermost `{ ... }` span,
//! 2. drop trailing commas before `}` or `]`,
//! 3. quote bare object keys.
//!
//! Anything still unparsable is reported as
//! [`AgentError::MalformedResponse`].

use crate::errors::AgentError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse an oracle response into `T`.
pub fn parse_response<T: DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    let value = extract_json(raw)?;
    serde_json::from_value(value).map_err(|err| AgentError::malformed(err.to_string()))
}

/// Recover the JSON object contained in `raw`.
pub fn extract_json(raw: &str) -> Result<Value, AgentError> {
    let cleaned = strip_fences(raw);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Ok(value);
    }

    let candidate = outermost_object(cleaned)
        .ok_or_else(|| AgentError::malformed("no JSON object found"))?;
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        return Ok(value);
    }

    let repaired = quote_bare_keys(&strip_trailing_commas(candidate));
    serde_json::from_str::<Value>(&repaired).map_err(|err| AgentError::malformed(err.to_string()))
}

/// Body of the first fenced code block, if it holds an object.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let fence = "```";
    if let Some(start) = trimmed.find(fence) {
        let after_fence = &trimmed[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        let block = match after_lang.find(fence) {
            Some(end) => &after_lang[..end],
            None => after_lang,
        };
        if block.contains('{') {
            return block.trim();
        }
    }
    trimmed
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Tracks whether a scan position sits inside a JSON string literal.
#[derive(Default)]
struct StringScanner {
    in_string: bool,
    escaped: bool,
}

impl StringScanner {
    /// Feed one character; returns true when it belongs to a string literal
    /// (including the delimiting quotes).
    fn feed(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return true;
        }
        if ch == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut scanner = StringScanner::default();
    for (idx, &ch) in chars.iter().enumerate() {
        if !scanner.feed(ch) && ch == ',' {
            let next = chars[idx + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn quote_bare_keys(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut scanner = StringScanner::default();
    let mut last_significant: Option<char> = None;
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];
        if scanner.feed(ch) {
            out.push(ch);
            last_significant = Some('"');
            idx += 1;
            continue;
        }

        if is_key_start(ch) && matches!(last_significant, Some('{') | Some(',')) {
            let mut end = idx;
            while end < chars.len() && is_key_char(chars[end]) {
                end += 1;
            }
            let word: String = chars[idx..end].iter().collect();
            let followed_by_colon = chars[end..]
                .iter()
                .find(|c| !c.is_whitespace())
                .map_or(false, |c| *c == ':');
            if followed_by_colon {
                out.push('"');
                out.push_str(&word);
                out.push('"');
            } else {
                out.push_str(&word);
            }
            last_significant = word.chars().last();
            idx = end;
            continue;
        }

        if !ch.is_whitespace() {
            last_significant = Some(ch);
        }
        out.push(ch);
        idx += 1;
    }
    out
}

fn is_key_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '-'
}
