//! Structured-output extraction from free-form model replies.
//!
//! The model is asked to embed a JSON payload in its reply, but free-text
//! output is unreliable about exact formatting. The extractor tries a fixed
//! sequence of recognizers from most to least specific and accepts the first
//! candidate that parses. A reply with no payload at all is an expected
//! outcome on follow-up turns, surfaced as `NoStructuredData`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::trip::UNSPECIFIED;

/// Errors that can occur during slot extraction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The reply carried no parseable structured payload. Benign.
    #[error("no structured data found in response")]
    NoStructuredData,
}

/// Extracted key/value updates for the trip record.
///
/// Wraps the parsed JSON object and applies the sentinel filter: accessors
/// return `None` for absent, empty or `no especificado` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUpdates {
    fields: Map<String, Value>,
}

impl SlotUpdates {
    /// Wraps a parsed JSON value; returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn origin(&self) -> Option<String> {
        self.string_field("origin")
    }

    pub fn destination(&self) -> Option<String> {
        self.string_field("destination")
    }

    pub fn start_date(&self) -> Option<String> {
        self.string_field("start_date")
    }

    pub fn end_date(&self) -> Option<String> {
        self.string_field("end_date")
    }

    pub fn budget(&self) -> Option<String> {
        self.string_field("budget")
    }

    pub fn additional_notes(&self) -> Option<String> {
        self.string_field("additional_notes")
    }

    /// Traveler count, accepting either a JSON number or a numeric string.
    pub fn num_travelers(&self) -> Option<u32> {
        match self.fields.get("num_travelers")? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNSPECIFIED) {
                    None
                } else {
                    trimmed.parse().ok()
                }
            }
            _ => None,
        }
    }

    /// True when no accessor would yield a value.
    pub fn is_empty(&self) -> bool {
        self.origin().is_none()
            && self.destination().is_none()
            && self.start_date().is_none()
            && self.end_date().is_none()
            && self.num_travelers().is_none()
            && self.budget().is_none()
            && self.additional_notes().is_none()
    }

    fn string_field(&self, key: &str) -> Option<String> {
        let value = self.fields.get(key)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if text.is_empty() || text.eq_ignore_ascii_case(UNSPECIFIED) {
            None
        } else {
            Some(text)
        }
    }
}

/// Result of a single recognizer attempt.
enum Candidate {
    Matched(String),
    NoMatch,
}

/// Locates and parses a JSON payload embedded in free text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotExtractor;

impl SlotExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts slot updates from a raw model reply.
    ///
    /// Recognizers are tried in order of specificity: a ```json fenced
    /// block, an unlabeled fenced block, a minimal single-field object, and
    /// finally any balanced-brace region. A candidate that fails to parse
    /// falls through to the next recognizer; only total failure is an error.
    pub fn extract(&self, text: &str) -> Result<SlotUpdates, ExtractionError> {
        let recognizers: [fn(&str) -> Candidate; 4] = [
            recognize_labeled_fence,
            recognize_unlabeled_fence,
            recognize_single_field,
            recognize_brace_region,
        ];

        for recognize in recognizers {
            if let Candidate::Matched(candidate) = recognize(text) {
                let normalized = collapse_whitespace(&candidate);
                if let Ok(value) = serde_json::from_str::<Value>(&normalized) {
                    if let Some(updates) = SlotUpdates::from_value(value) {
                        tracing::debug!(payload = %normalized, "parsed structured payload");
                        return Ok(updates);
                    }
                }
                tracing::debug!(candidate = %candidate, "candidate payload did not parse");
            }
        }

        Err(ExtractionError::NoStructuredData)
    }
}

/// Collapses every whitespace run to a single space.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// ```json ... ``` fenced block containing a brace region.
fn recognize_labeled_fence(text: &str) -> Candidate {
    fenced_brace_region(text, "```json")
}

/// ``` ... ``` fenced block without a language label.
fn recognize_unlabeled_fence(text: &str) -> Candidate {
    fenced_brace_region(text, "```")
}

fn fenced_brace_region(text: &str, fence: &str) -> Candidate {
    let Some(start) = text.find(fence) else {
        return Candidate::NoMatch;
    };
    let body_start = start + fence.len();
    let Some(end) = text[body_start..].find("```") else {
        return Candidate::NoMatch;
    };
    match balanced_brace_region(&text[body_start..body_start + end]) {
        Some(region) => Candidate::Matched(region.to_string()),
        None => Candidate::NoMatch,
    }
}

/// Minimal single-field form: a flat `{ "key": "value" }` with no nesting.
///
/// Unlike the fence recognizers this one scans past earlier brace regions
/// that do not fit the shape, so a malformed block cannot shadow a valid
/// minimal payload later in the reply.
fn recognize_single_field(text: &str) -> Candidate {
    let mut search_from = 0;
    while let Some(relative_open) = text[search_from..].find('{') {
        let open = search_from + relative_open;
        let Some(relative_close) = text[open..].find('}') else {
            break;
        };
        let region = &text[open..open + relative_close + 1];
        if is_single_field_shape(region) {
            return Candidate::Matched(region.to_string());
        }
        search_from = open + 1;
    }
    Candidate::NoMatch
}

/// `{ "key": "value" }` - exactly one string field, both sides quoted.
fn is_single_field_shape(region: &str) -> bool {
    let inner = region[1..region.len() - 1].trim();
    inner.starts_with('"')
        && inner.ends_with('"')
        && inner.matches('"').count() == 4
        && inner.matches(':').count() == 1
        && !inner.contains('{')
}

/// Generic brace-delimited form: the first balanced `{...}` region.
fn recognize_brace_region(text: &str) -> Candidate {
    match balanced_brace_region(text) {
        Some(region) => Candidate::Matched(region.to_string()),
        None => Candidate::NoMatch,
    }
}

/// Finds the first balanced `{...}` region, respecting string literals.
fn balanced_brace_region(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (offset, character) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match character {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
