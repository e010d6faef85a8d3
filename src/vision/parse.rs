//! Parsing of vision model completions into outcomes.
//!
//! The model is asked for a JSON object but may wrap it in a code fence or
//! answer in prose; both are accepted. Parsing never fails: unusable answers
//! degrade to a low-confidence `NEEDS_FIX`.

use serde_json::{Map, Value};

use crate::memory::{Outcome, Status, NO_REASON};

/// Confidence assigned when the model omits one.
const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Characters of a prose answer kept as the reason.
const PLAIN_TEXT_REASON_CHARS: usize = 200;

/// Turn a raw completion into an [`Outcome`].
pub fn parse_classification(completion: &str) -> Outcome {
    match serde_json::from_str::<Value>(extract_json(completion)) {
        Ok(Value::Object(map)) => from_json(&map),
        _ => from_plain_text(completion),
    }
}

/// Locate the JSON payload inside a completion.
fn extract_json(completion: &str) -> &str {
    if let Some(start) = completion.find("```json") {
        let body = &completion[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let Some(start) = completion.find("```") {
        let after_start = &completion[start + 3..];
        // Skip language identifier if present
        let json_start = after_start.find('\n').map(|n| n + 1).unwrap_or(0);
        if let Some(end) = after_start[json_start..].find("```") {
            return after_start[json_start..json_start + end].trim();
        }
    }

    if let (Some(start), Some(end)) = (completion.find('{'), completion.rfind('}')) {
        if end > start {
            return &completion[start..=end];
        }
    }

    completion.trim()
}

fn from_json(map: &Map<String, Value>) -> Outcome {
    let raw_status = map
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("UNKNOWN")
        .to_uppercase();
    let status = match raw_status.as_str() {
        "OK" => Status::Ok,
        "NEEDS_FIX" => Status::NeedsFix,
        other => {
            let lower = other.to_lowercase();
            if lower.contains("ok") && !lower.contains("not") {
                Status::Ok
            } else {
                Status::NeedsFix
            }
        }
    };

    let confidence = map
        .get("confidence")
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .filter(|c: &f64| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    let reason = map
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or(NO_REASON)
        .to_string();

    let damage_types = map
        .get("damage_types")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Outcome::new(status, confidence, reason).with_damage_types(damage_types)
}

fn from_plain_text(text: &str) -> Outcome {
    let lower = text.to_lowercase();

    let (status, confidence) =
        if lower.contains("ok") && !lower.contains("not ok") && !lower.contains("needs fix") {
            (Status::Ok, 0.6)
        } else if lower.contains("needs fix")
            || lower.contains("not ok")
            || lower.contains("damaged")
        {
            (Status::NeedsFix, 0.6)
        } else {
            // Unreadable answers default to the safer status.
            (Status::NeedsFix, 0.3)
        };

    let reason: String = text.chars().take(PLAIN_TEXT_REASON_CHARS).collect();
    Outcome::new(status, confidence, reason)
}
