//! Drift detection over the low-confidence rate.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::types::{DriftEvent, ReinforcementData, StatisticsState};
use super::{push_bounded, DRIFT_LOG_CAPACITY, MIN_DRIFT_SAMPLES};

/// Event tag written into every drift log entry.
pub const DRIFT_EVENT: &str = "DRIFT_DETECTED";

/// Recommendation attached to every drift event.
pub const DRIFT_ACTION: &str = "Recommend model retraining or prompt adjustment";

/// Scores drift and logs an event when the threshold is crossed.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    drift_threshold: f64,
}

impl DriftDetector {
    /// Create a detector flagging rates strictly above `drift_threshold`.
    pub fn new(drift_threshold: f64) -> Self {
        Self { drift_threshold }
    }

    /// Recompute the drift score and log an event if it exceeds the threshold.
    ///
    /// Below [`MIN_DRIFT_SAMPLES`] evaluations nothing is scored or logged.
    pub fn evaluate(
        &self,
        stats: &mut StatisticsState,
        data: &mut ReinforcementData,
        now: DateTime<Utc>,
    ) -> Option<DriftEvent> {
        if stats.total_evaluations < MIN_DRIFT_SAMPLES {
            return None;
        }

        let low_confidence_rate =
            stats.low_confidence_cases as f64 / stats.total_evaluations as f64;
        stats.drift_score = low_confidence_rate;

        if low_confidence_rate <= self.drift_threshold {
            return None;
        }

        warn!(
            drift_score = low_confidence_rate,
            drift_threshold = self.drift_threshold,
            total_evaluations = stats.total_evaluations,
            low_confidence_cases = stats.low_confidence_cases,
            "Drift alert: low confidence rate at {:.1}%",
            low_confidence_rate * 100.0
        );

        let event = DriftEvent {
            timestamp: now,
            event: DRIFT_EVENT.to_string(),
            drift_score: low_confidence_rate,
            action: DRIFT_ACTION.to_string(),
        };
        push_bounded(&mut data.model_improvements, event.clone(), DRIFT_LOG_CAPACITY);

        Some(event)
    }
}
