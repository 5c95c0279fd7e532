//! Best-effort recovery of structure from free-text LLM replies.
//!
//! The provider is used without any structured-output mode, so rule-sets and
//! scripts are cut out of the reply text:
//!
//! - **Rule-sets**: remove every backtick, then take the largest span from the
//!   first `[` to the last `]` and parse it as a JSON array of [`Rule`]s.
//!   Prose before or after the array is ignored; prose *between* two arrays
//!   makes the span invalid JSON and the parse fails.
//! - **Scripts**: the body of the first fenced code block, or the whole
//!   trimmed reply when there is no fence.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::Rule;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("no bracketed JSON array found in response")]
    NoArray,
    #[error("bracketed span is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("bracketed span is JSON but not an array of rule objects: {0}")]
    NotRules(String),
}

/// A successfully parsed rule-set together with the exact text it came from.
#[derive(Debug, Clone)]
pub struct ParsedRules {
    pub raw: String,
    pub rules: Vec<Rule>,
}

pub fn strip_backticks(text: &str) -> String {
    text.trim().replace('`', "")
}

/// Returns the span from the first `[` to the last `]`, inclusive.
pub fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_rule_array(response: &str) -> Result<ParsedRules, ParseError> {
    let cleaned = strip_backticks(response);
    let raw = bracketed_span(&cleaned).ok_or(ParseError::NoArray)?;

    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    if !value.is_array() {
        return Err(ParseError::NotRules("top-level value is not an array".to_string()));
    }
    let rules: Vec<Rule> =
        serde_json::from_value(value).map_err(|e| ParseError::NotRules(e.to_string()))?;

    Ok(ParsedRules {
        raw: raw.to_string(),
        rules,
    })
}

fn code_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)```").expect("valid fence regex")
    })
}

/// An opening fence whose closing fence never arrived (truncated reply).
fn open_fence() -> &'static Regex {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    OPEN.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n(.*)\z").expect("valid open fence regex")
    })
}

/// Body of the first fenced code block, else the whole trimmed reply.
///
/// A reply cut off inside a block yields everything after its opening fence.
pub fn extract_code_block(response: &str) -> String {
    let body = code_fence()
        .captures(response)
        .or_else(|| open_fence().captures(response))
        .and_then(|caps| caps.get(1));
    match body {
        Some(m) => m.as_str().trim().to_string(),
        None => response.trim().to_string(),
    }
}
