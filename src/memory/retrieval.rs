//! In-context example selection for classification prompts.

use std::cmp::Ordering;

use super::types::{MemoryRecord, MemoryState, NO_REASON};
use super::CONTEXT_WINDOW;

/// Header line of a non-empty context block.
pub const CONTEXT_HEADER: &str = "Previous decisions (most confident first):";

/// Context text used when no examples exist.
pub const NO_CONTEXT: &str = "No previous examples available.";

/// Selects and renders prior outcomes as prompt context.
#[derive(Debug, Clone, Default)]
pub struct ContextRetriever;

impl ContextRetriever {
    /// Create a retriever.
    pub fn new() -> Self {
        Self
    }

    /// Top `n` of the most recent [`CONTEXT_WINDOW`] records of `category`,
    /// ranked by confidence then timestamp, both descending.
    ///
    /// Records with identical confidence and timestamp keep newest-inserted
    /// first. An unknown category yields an empty list.
    pub fn retrieve(&self, state: &MemoryState, category: &str, n: usize) -> Vec<MemoryRecord> {
        let records = state.records(category);
        let start = records.len().saturating_sub(CONTEXT_WINDOW);

        // Newest first, so the stable sort resolves full ties by recency.
        let mut window: Vec<&MemoryRecord> = records[start..].iter().rev().collect();
        window.sort_by(|a, b| rank(b, a));

        window.into_iter().take(n).cloned().collect()
    }

    /// Render examples as a numbered list in ranked order.
    pub fn format_for_prompt(&self, examples: &[MemoryRecord]) -> String {
        if examples.is_empty() {
            return NO_CONTEXT.to_string();
        }

        let mut lines = vec![CONTEXT_HEADER.to_string()];
        for (i, example) in examples.iter().enumerate() {
            lines.push(format!(
                "{}. Result: {} (Confidence: {:.2})",
                i + 1,
                example.status,
                example.confidence
            ));
            let reason = example.reason.trim();
            if !reason.is_empty() && reason != NO_REASON {
                lines.push(format!("   Reason: {}", example.reason));
            }
        }
        lines.join("\n")
    }
}

/// Ascending order on (confidence, timestamp).
fn rank(a: &MemoryRecord, b: &MemoryRecord) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::memory::types::{Outcome, Status};

    fn state_with(confidences: &[f64]) -> MemoryState {
        let mut state = MemoryState::new("box_condition");
        let base = Utc::now();
        let log = state.categories.entry("box_condition".to_string()).or_default();
        for (i, c) in confidences.iter().enumerate() {
            log.push(MemoryRecord::from_outcome(
                "box_condition",
                Outcome::new(Status::Ok, *c, format!("record {}", i)),
                base + Duration::seconds(i as i64),
            ));
        }
        state
    }

    #[test]
    fn test_unknown_category_is_empty() {
        let state = state_with(&[0.9]);
        assert!(ContextRetriever::new()
            .retrieve(&state, "pallet_condition", 5)
            .is_empty());
    }

    #[test]
    fn test_ranked_by_confidence_then_recency() {
        let state = state_with(&[0.7, 0.9, 0.8, 0.9]);
        let examples = ContextRetriever::new().retrieve(&state, "box_condition", 3);

        let reasons: Vec<_> = examples.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons, vec!["record 3", "record 1", "record 2"]);
    }

    #[test]
    fn test_only_recent_window_is_considered() {
        // The oldest record has the highest confidence but falls outside the window.
        let mut confidences = vec![0.99];
        confidences.extend(std::iter::repeat(0.5).take(CONTEXT_WINDOW));
        let state = state_with(&confidences);

        let examples = ContextRetriever::new().retrieve(&state, "box_condition", 5);
        assert_eq!(examples.len(), 5);
        assert!(examples.iter().all(|r| r.confidence == 0.5));
        assert_eq!(examples[0].reason, format!("record {}", CONTEXT_WINDOW));
    }

    #[test]
    fn test_full_ties_prefer_newest_insertion() {
        let mut state = MemoryState::new("box_condition");
        let at = Utc::now();
        let log = state.categories.get_mut("box_condition").unwrap();
        for i in 0..3 {
            log.push(MemoryRecord::from_outcome(
                "box_condition",
                Outcome::new(Status::Ok, 0.9, format!("record {}", i)),
                at,
            ));
        }

        let examples = ContextRetriever::new().retrieve(&state, "box_condition", 3);
        let reasons: Vec<_> = examples.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons, vec!["record 2", "record 1", "record 0"]);
    }

    #[test]
    fn test_format_for_prompt() {
        let retriever = ContextRetriever::new();
        assert_eq!(retriever.format_for_prompt(&[]), NO_CONTEXT);

        let mut state = state_with(&[0.9, 0.456]);
        state.categories.get_mut("box_condition").unwrap()[1].reason = String::new();
        let examples = retriever.retrieve(&state, "box_condition", 5);

        assert_eq!(
            retriever.format_for_prompt(&examples),
            "Previous decisions (most confident first):\n\
             1. Result: OK (Confidence: 0.90)\n   Reason: record 0\n\
             2. Result: OK (Confidence: 0.46)"
        );
    }

    #[test]
    fn test_format_for_prompt_skips_placeholder_reason() {
        let retriever = ContextRetriever::new();
        let mut state = state_with(&[0.8]);
        state.categories.get_mut("box_condition").unwrap()[0].reason = NO_REASON.to_string();
        let examples = retriever.retrieve(&state, "box_condition", 5);

        assert_eq!(
            retriever.format_for_prompt(&examples),
            "Previous decisions (most confident first):\n\
             1. Result: OK (Confidence: 0.80)"
        );
    }
}
