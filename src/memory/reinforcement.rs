//! Reinforcement bucketing of recorded outcomes.
//!
//! Outcomes at or above the confidence threshold are trusted and become
//! training candidates; everything below is queued for human review. Both
//! buckets are bounded FIFO queues: insertion at the tail, eviction from the
//! head, no reordering.

use std::collections::HashSet;

use super::types::{MemoryRecord, ReinforcementData, ReviewEntry, TrustedEntry};
use super::{push_bounded, REVIEW_BUCKET_CAPACITY, TRUSTED_BUCKET_CAPACITY};

/// Which bucket an outcome is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketTarget {
    /// High-confidence bucket, eligible for training export.
    Trusted,
    /// Low-confidence bucket, flagged for review.
    Review,
}

impl std::fmt::Display for BucketTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketTarget::Trusted => write!(f, "trusted"),
            BucketTarget::Review => write!(f, "review"),
        }
    }
}

/// Routes records into the trusted or review bucket.
#[derive(Debug, Clone)]
pub struct ReinforcementBucketer {
    confidence_threshold: f64,
}

impl ReinforcementBucketer {
    /// Create a bucketer splitting at `confidence_threshold`.
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
        }
    }

    /// Deterministic threshold split.
    pub fn classify(&self, confidence: f64) -> BucketTarget {
        if confidence >= self.confidence_threshold {
            BucketTarget::Trusted
        } else {
            BucketTarget::Review
        }
    }

    /// Append `record` to its bucket, evicting the oldest entry past capacity.
    pub fn insert(&self, data: &mut ReinforcementData, record: &MemoryRecord) -> BucketTarget {
        let target = self.classify(record.confidence);
        match target {
            BucketTarget::Trusted => push_bounded(
                &mut data.high_confidence_correct,
                TrustedEntry {
                    record: record.clone(),
                    timestamp: record.timestamp,
                    used_for_training: false,
                },
                TRUSTED_BUCKET_CAPACITY,
            ),
            BucketTarget::Review => push_bounded(
                &mut data.low_confidence_cases,
                ReviewEntry {
                    record: record.clone(),
                    timestamp: record.timestamp,
                    needs_review: true,
                },
                REVIEW_BUCKET_CAPACITY,
            ),
        }
        target
    }
}

impl ReinforcementData {
    /// Trusted records not yet used for training, oldest first.
    pub fn unconsumed_training_samples(&self) -> Vec<MemoryRecord> {
        self.high_confidence_correct
            .iter()
            .filter(|entry| !entry.used_for_training)
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Number of trusted entries not yet used for training.
    pub fn unconsumed_count(&self) -> usize {
        self.high_confidence_correct
            .iter()
            .filter(|entry| !entry.used_for_training)
            .count()
    }

    /// Mark the first `n` trusted entries as used for training.
    ///
    /// `n` is clamped to the bucket length. Returns how many entries changed
    /// state, so a repeated call reports zero.
    pub fn mark_consumed(&mut self, n: usize) -> usize {
        let mut flipped = 0;
        for entry in self.high_confidence_correct.iter_mut().take(n) {
            if !entry.used_for_training {
                entry.used_for_training = true;
                flipped += 1;
            }
        }
        flipped
    }

    /// Mark the trusted entries holding any of `ids` as used for training.
    ///
    /// Returns how many entries changed state.
    pub fn mark_consumed_ids(&mut self, ids: &HashSet<&str>) -> usize {
        let mut flipped = 0;
        for entry in self.high_confidence_correct.iter_mut() {
            if !entry.used_for_training && ids.contains(entry.record.id.as_str()) {
                entry.used_for_training = true;
                flipped += 1;
            }
        }
        flipped
    }

    /// Review-bucket entries still awaiting review, oldest first.
    pub fn review_queue(&self) -> Vec<MemoryRecord> {
        self.low_confidence_cases
            .iter()
            .filter(|entry| entry.needs_review)
            .map(|entry| entry.record.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::memory::types::{Outcome, Status};

    fn record(confidence: f64, seq: i64) -> MemoryRecord {
        MemoryRecord::from_outcome(
            "box_condition",
            Outcome::new(Status::Ok, confidence, format!("sample {}", seq)),
            Utc::now() + Duration::milliseconds(seq),
        )
    }

    #[test]
    fn test_classify_threshold_is_inclusive() {
        let bucketer = ReinforcementBucketer::new(0.85);
        assert_eq!(bucketer.classify(0.85), BucketTarget::Trusted);
        assert_eq!(bucketer.classify(0.849), BucketTarget::Review);
        assert_eq!(bucketer.classify(1.0), BucketTarget::Trusted);
        assert_eq!(bucketer.classify(0.0), BucketTarget::Review);
    }

    #[test]
    fn test_insert_sets_entry_flags() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();

        bucketer.insert(&mut data, &record(0.9, 0));
        bucketer.insert(&mut data, &record(0.4, 1));

        let trusted = &data.high_confidence_correct[0];
        assert!(!trusted.used_for_training);
        assert_eq!(trusted.timestamp, trusted.record.timestamp);

        let review = &data.low_confidence_cases[0];
        assert!(review.needs_review);
        assert_eq!(review.timestamp, review.record.timestamp);
    }

    #[test]
    fn test_trusted_bucket_evicts_oldest() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();

        let records: Vec<_> = (0..120).map(|i| record(0.95, i)).collect();
        for r in &records {
            bucketer.insert(&mut data, r);
        }

        assert_eq!(data.high_confidence_correct.len(), TRUSTED_BUCKET_CAPACITY);
        assert_eq!(data.high_confidence_correct[0].record.id, records[20].id);
        assert_eq!(
            data.high_confidence_correct.back().map(|e| &e.record.id),
            Some(&records[119].id)
        );
    }

    #[test]
    fn test_review_bucket_evicts_oldest() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();

        let records: Vec<_> = (0..60).map(|i| record(0.3, i)).collect();
        for r in &records {
            bucketer.insert(&mut data, r);
        }

        assert_eq!(data.low_confidence_cases.len(), REVIEW_BUCKET_CAPACITY);
        assert_eq!(data.low_confidence_cases[0].record.id, records[10].id);
        assert_eq!(data.review_queue().len(), REVIEW_BUCKET_CAPACITY);
    }

    #[test]
    fn test_mark_consumed_is_clamped_and_idempotent() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();
        for i in 0..3 {
            bucketer.insert(&mut data, &record(0.9, i));
        }

        assert_eq!(data.mark_consumed(2), 2);
        assert_eq!(data.unconsumed_count(), 1);
        assert_eq!(data.mark_consumed(2), 0);
        assert_eq!(data.mark_consumed(10), 1);
        assert_eq!(data.unconsumed_count(), 0);
        assert!(data.unconsumed_training_samples().is_empty());
    }

    #[test]
    fn test_mark_consumed_ids_skips_earlier_consumed_prefix() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();
        let records: Vec<_> = (0..5).map(|i| record(0.9, i)).collect();
        for r in &records {
            bucketer.insert(&mut data, r);
        }
        data.mark_consumed(3);

        let ids: HashSet<&str> = records[3..].iter().map(|r| r.id.as_str()).collect();
        assert_eq!(data.mark_consumed_ids(&ids), 2);
        assert_eq!(data.unconsumed_count(), 0);
        assert_eq!(data.mark_consumed_ids(&ids), 0);
    }

    #[test]
    fn test_unconsumed_samples_in_insertion_order() {
        let bucketer = ReinforcementBucketer::new(0.85);
        let mut data = ReinforcementData::default();
        let records: Vec<_> = (0..4).map(|i| record(0.9 + i as f64 * 0.01, i)).collect();
        for r in &records {
            bucketer.insert(&mut data, r);
        }
        data.mark_consumed(1);

        let ids: Vec<_> = data
            .unconsumed_training_samples()
            .into_iter()
            .map(|r| r.id)
            .collect();
        let expected: Vec<_> = records[1..].iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, expected);
    }
}
