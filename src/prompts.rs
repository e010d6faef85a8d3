//! Centralized prompt definitions
//!
//! Prompts sent to the vision model and the fixed turns written into the
//! training corpus live here so both sides stay in sync.

use crate::memory::Status;

/// System prompt for box condition classification.
pub const BOX_CONDITION_PROMPT: &str = r#"You are an expert delivery box condition evaluator. Your job is to classify boxes as OK or NEEDS_FIX.

EVALUATION CRITERIA:

OK Conditions:
- Minor scuffs or dirt that don't affect structural integrity
- Light wear on edges
- Small cosmetic marks
- Box is fully intact and functional

NEEDS_FIX Conditions:
- Tears or holes (even small ones)
- Crushed or significantly dented areas
- Water damage or excessive staining
- Missing flaps or components
- Any damage that could compromise contents

IMPORTANT: Return your answer in this EXACT JSON format:
{
    "status": "OK" or "NEEDS_FIX",
    "confidence": 0.0 to 1.0,
    "reason": "Clear explanation of your decision",
    "damage_types": ["list", "of", "damage", "types"]
}"#;

/// Appended to the system prompt while drift is above threshold.
pub const DRIFT_ALERT_ADDENDUM: &str =
    "ALERT: Recent predictions have shown lower confidence. Be extra thorough in your analysis.";

/// System turn of every exported training example.
pub const TRAINING_SYSTEM_PROMPT: &str = "You are an expert at evaluating delivery box conditions.";

/// Build the classification system prompt for the current drift state.
pub fn classification_system_prompt(drift_score: f64, drift_threshold: f64) -> String {
    if drift_score > drift_threshold {
        format!("{}\n\n{}", BOX_CONDITION_PROMPT, DRIFT_ALERT_ADDENDUM)
    } else {
        BOX_CONDITION_PROMPT.to_string()
    }
}

/// Build the classification user prompt around retrieved context.
pub fn classification_user_prompt(context: &str) -> String {
    format!(
        "Analyze this box image and classify its condition.\n\n{}\n\nBased on these previous examples and the current image, provide your classification in the JSON format specified.",
        context
    )
}

/// User turn of an exported training example.
pub fn training_user_prompt(status: Status) -> String {
    format!("Classify this box condition. Previous result: {}", status)
}
