//! Adaptive memory and reinforcement-feedback engine.
//!
//! Turns a stream of classification outcomes into retrieval context, running
//! statistics, a bucketed training corpus and drift alerts.
//!
//! # Architecture
//!
//! ```text
//! update(category, outcome)
//!   → validate → stamp → category log
//!   → StatisticsEngine → ReinforcementBucketer → DriftDetector
//!   → StateStore::save
//! ```
//!
//! All mutations go through a single writer inside [`MemoryEngine`]; readers
//! see the last published snapshot.

pub mod drift;
pub mod engine;
pub mod export;
pub mod reinforcement;
pub mod retrieval;
pub mod statistics;
pub mod types;

use std::collections::VecDeque;

pub use drift::{DriftDetector, DRIFT_ACTION, DRIFT_EVENT};
pub use engine::MemoryEngine;
pub use export::{
    AssistantReply, TrainingCorpusExporter, TrainingExample, TrainingMessage, TrainingRole,
};
pub use reinforcement::{BucketTarget, ReinforcementBucketer};
pub use retrieval::{ContextRetriever, CONTEXT_HEADER, NO_CONTEXT};
pub use statistics::StatisticsEngine;
pub use types::{
    DriftEvent, MemoryRecord, MemoryState, Outcome, Patterns, ReinforcementData, ReviewEntry,
    Statistics, StatisticsState, Status, TrustedEntry, NO_REASON,
};

/// Capacity of the high-confidence bucket.
pub const TRUSTED_BUCKET_CAPACITY: usize = 100;
/// Capacity of the low-confidence bucket.
pub const REVIEW_BUCKET_CAPACITY: usize = 50;
/// Capacity of the confidence history window.
pub const CONFIDENCE_HISTORY_CAPACITY: usize = 100;
/// Capacity of the drift-event log.
pub const DRIFT_LOG_CAPACITY: usize = 100;
/// Evaluations required before drift is scored.
pub const MIN_DRIFT_SAMPLES: u64 = 10;
/// Most recent records considered by context retrieval.
pub const CONTEXT_WINDOW: usize = 20;
/// Entries averaged for the recent confidence trend.
pub const RECENT_TREND_WINDOW: usize = 10;
/// Unconsumed training samples required before retraining is recommended.
pub const RETRAINING_MIN_SAMPLES: usize = 50;

/// Append at the tail and drop from the head until `capacity` holds.
pub(crate) fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    queue.push_back(item);
    while queue.len() > capacity {
        queue.pop_front();
    }
}
