//! Response processing: raw model text to a validated sample body

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use shared::{SampleType, WorkItem};
use crate::core::prompt::{structure_headings, DifficultySpec};
use crate::error::{ProducerError, ProducerResult};

const THINKING_OPEN: &str = "<thinking>";
const THINKING_CLOSE: &str = "</thinking>";

/// Fields every sample body must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["question", "answer", "reasoning", "case_citation"];

/// Headings of the requested structure that must appear in the answer
const MIN_HEADINGS: usize = 3;

fn step_pattern() -> &'static Regex {
    static STEP: OnceLock<Regex> = OnceLock::new();
    STEP.get_or_init(|| Regex::new(r"Step \d+:").expect("step pattern is valid"))
}

/// Remove every `<thinking>...</thinking>` section
///
/// An unclosed opening tag drops the rest of the text; an orphaned closing
/// tag drops everything before it.
pub fn strip_thinking(text: &str) -> String {
    let mut text = text.to_string();
    loop {
        match (text.find(THINKING_OPEN), text.find(THINKING_CLOSE)) {
            (Some(start), Some(end)) if start < end => {
                text.replace_range(start..end + THINKING_CLOSE.len(), "");
            }
            (Some(start), None) => {
                text.truncate(start);
                return text;
            }
            (_, Some(end)) => {
                text.replace_range(..end + THINKING_CLOSE.len(), "");
            }
            (None, None) => return text,
        }
    }
}

/// Pull the JSON object out of a model response
pub fn extract_json(text: &str) -> String {
    let text = strip_thinking(text);

    let mut candidate = if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        match rest.find("```") {
            Some(end) => rest[..end].to_string(),
            None => rest.to_string(),
        }
    } else if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
        match rest.find("```") {
            Some(end) => rest[..end].to_string(),
            None => rest.to_string(),
        }
    } else {
        text
    };

    let trimmed = candidate.trim();
    if !trimmed.starts_with('{') {
        if let Some(object) = outermost_object(trimmed) {
            candidate = object.to_string();
        }
    }

    candidate.trim().trim_end_matches(',').to_string()
}

/// First balanced `{...}` span, falling back to the last closing brace
///
/// Braces inside JSON strings are not counted.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse and validate a response, then force the classification fields
///
/// # Returns
/// The sample body, or `InvalidSample` describing the first check that failed
pub fn process_response(raw: &str, item: &WorkItem, sample_type: SampleType) -> ProducerResult<Value> {
    let json = extract_json(raw);
    if json.is_empty() {
        return Err(ProducerError::invalid_sample("empty response after JSON extraction"));
    }

    let mut body: Value = serde_json::from_str(&json)
        .map_err(|e| ProducerError::invalid_sample(format!("JSON parsing error: {e}")))?;
    let fields = body
        .as_object_mut()
        .ok_or_else(|| ProducerError::invalid_sample("response is not a JSON object"))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !fields.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ProducerError::invalid_sample(format!("missing required fields: {}", missing.join(", "))));
    }

    let answer = text_field(fields, "answer");
    let reasoning = text_field(fields, "reasoning");
    if answer.trim().is_empty() || reasoning.trim().is_empty() {
        return Err(ProducerError::invalid_sample("answer or reasoning is empty"));
    }

    let min_steps = DifficultySpec::for_level(item.difficulty).min_steps;
    let steps = step_pattern().find_iter(&reasoning).count();
    if steps < min_steps {
        return Err(ProducerError::invalid_sample(format!(
            "insufficient reasoning steps: {steps} found (minimum {min_steps} required)"
        )));
    }

    check_structure(&answer, sample_type)?;

    fields.insert("topic".to_string(), Value::String(item.key()));
    fields.insert("difficulty".to_string(), Value::String(item.difficulty.to_string()));
    fields.insert("sample_type".to_string(), Value::String(sample_type.to_string()));

    debug!("Accepted {} sample for {} ({} reasoning steps)", sample_type, item.key(), steps);
    Ok(body)
}

fn text_field(fields: &serde_json::Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// The answer must contain enough of its sample type's headings
fn check_structure(answer: &str, sample_type: SampleType) -> ProducerResult<()> {
    let upper = answer.to_uppercase();
    let headings = structure_headings(sample_type);
    let (found, missing): (Vec<&str>, Vec<&str>) = headings.into_iter().partition(|heading| upper.contains(*heading));

    if found.len() < MIN_HEADINGS {
        return Err(ProducerError::invalid_sample(format!(
            "answer structure does not match {sample_type}: found {}/{} sections, missing {}",
            found.len(),
            headings.len(),
            missing.join(", ")
        )));
    }
    Ok(())
}
