//! Running confidence statistics.
//!
//! Counters are global across categories: every recorded outcome counts
//! toward `total_evaluations` and the drift score regardless of its category.

use super::types::{MemoryState, Patterns, Statistics, StatisticsState};
use super::{push_bounded, CONFIDENCE_HISTORY_CAPACITY, RECENT_TREND_WINDOW};

/// Maintains counters and the bounded confidence history.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    confidence_threshold: f64,
}

impl StatisticsEngine {
    /// Create a statistics engine for the given low-confidence cutoff.
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Account for one evaluation.
    pub fn record(&self, stats: &mut StatisticsState, patterns: &mut Patterns, confidence: f64) {
        stats.total_evaluations += 1;

        push_bounded(
            &mut patterns.confidence_history,
            confidence,
            CONFIDENCE_HISTORY_CAPACITY,
        );

        if confidence < self.confidence_threshold {
            stats.low_confidence_cases += 1;
        }
    }

    /// Derive aggregate metrics. Read-only.
    pub fn snapshot(&self, state: &MemoryState) -> Statistics {
        let stats = &state.statistics;
        let history = &state.patterns.confidence_history;

        let average_confidence = mean(history.iter().copied(), history.len());
        let recent_confidence_trend = if history.len() >= RECENT_TREND_WINDOW {
            let skip = history.len() - RECENT_TREND_WINDOW;
            mean(history.iter().skip(skip).copied(), RECENT_TREND_WINDOW)
        } else {
            average_confidence
        };

        Statistics {
            total_evaluations: stats.total_evaluations,
            low_confidence_cases: stats.low_confidence_cases,
            low_confidence_rate: stats.low_confidence_cases as f64
                / stats.total_evaluations.max(1) as f64,
            drift_score: stats.drift_score,
            average_confidence,
            recent_confidence_trend,
            training_samples_available: state.reinforcement_data.unconsumed_count(),
        }
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}
