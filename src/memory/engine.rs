//! Memory engine orchestrator.
//!
//! [`MemoryEngine`] owns the authoritative [`MemoryState`] behind a single
//! writer lock. Every mutation runs its full pipeline and persists the result
//! before the lock is released, then publishes an immutable snapshot that
//! readers share without blocking the writer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::types::{validate_category, DriftEvent, MemoryRecord, MemoryState, Outcome, Statistics};
use super::{
    ContextRetriever, DriftDetector, ReinforcementBucketer, StatisticsEngine,
    TrainingCorpusExporter, RETRAINING_MIN_SAMPLES,
};
use crate::config::MemoryConfig;
use crate::error::MemoryResult;
use crate::storage::StateStore;

/// Adaptive memory engine shared by classification handlers.
pub struct MemoryEngine {
    config: MemoryConfig,
    store: Arc<dyn StateStore>,
    statistics: StatisticsEngine,
    bucketer: ReinforcementBucketer,
    drift: DriftDetector,
    retriever: ContextRetriever,
    exporter: TrainingCorpusExporter,
    /// Authoritative state; holding this lock is the only way to mutate.
    writer: Mutex<MemoryState>,
    /// Last committed state, swapped whole after each mutation.
    snapshot: RwLock<Arc<MemoryState>>,
}

impl MemoryEngine {
    /// Load persisted state from `store`, or initialize and persist a fresh one.
    pub async fn open(config: MemoryConfig, store: Arc<dyn StateStore>) -> MemoryResult<Self> {
        let state = match store.load().await? {
            Some(state) => {
                info!(
                    location = %store.location(),
                    total_evaluations = state.statistics.total_evaluations,
                    categories = state.categories.len(),
                    "Memory state loaded"
                );
                state
            }
            None => {
                let state = MemoryState::new(&config.default_category);
                store.save(&state).await?;
                info!(location = %store.location(), "Initialized fresh memory state");
                state
            }
        };

        Ok(Self {
            statistics: StatisticsEngine::new(config.confidence_threshold),
            bucketer: ReinforcementBucketer::new(config.confidence_threshold),
            drift: DriftDetector::new(config.drift_threshold),
            retriever: ContextRetriever::new(),
            exporter: TrainingCorpusExporter::new(),
            snapshot: RwLock::new(Arc::new(state.clone())),
            writer: Mutex::new(state),
            store,
            config,
        })
    }

    /// Engine policy.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Confidence at or above which outcomes are trusted.
    pub fn confidence_threshold(&self) -> f64 {
        self.config.confidence_threshold
    }

    /// Whether an outcome at `confidence` should be flagged for human review.
    pub fn needs_review(&self, confidence: f64) -> bool {
        confidence < self.config.confidence_threshold
    }

    /// Last committed state.
    pub async fn snapshot(&self) -> Arc<MemoryState> {
        self.snapshot.read().await.clone()
    }

    /// Ranked in-context examples for the next classification of `category`.
    pub async fn retrieve_context(&self, category: &str, n: usize) -> Vec<MemoryRecord> {
        let state = self.snapshot().await;
        self.retriever.retrieve(&state, category, n)
    }

    /// Render examples as prompt text.
    pub fn format_context_for_prompt(&self, examples: &[MemoryRecord]) -> String {
        self.retriever.format_for_prompt(examples)
    }

    /// Record one classification outcome.
    ///
    /// Runs statistics, bucketing and drift detection, then persists the
    /// whole state. If the save fails the in-memory state keeps the update
    /// and the storage error is returned.
    pub async fn update(&self, category: &str, outcome: Outcome) -> MemoryResult<MemoryRecord> {
        validate_category(category)?;
        outcome.validate()?;

        let mut guard = self.writer.lock().await;
        let state = &mut *guard;

        let log = state.categories.entry(category.to_string()).or_default();
        // Keep timestamps non-decreasing within a category log.
        let now = log
            .last()
            .map_or_else(Utc::now, |last| Utc::now().max(last.timestamp));
        let record = MemoryRecord::from_outcome(category, outcome, now);
        log.push(record.clone());

        self.statistics
            .record(&mut state.statistics, &mut state.patterns, record.confidence);
        let bucket = self
            .bucketer
            .insert(&mut state.reinforcement_data, &record);
        let drift = self
            .drift
            .evaluate(&mut state.statistics, &mut state.reinforcement_data, now);

        debug!(
            record_id = %record.id,
            category = %category,
            status = %record.status,
            confidence = record.confidence,
            bucket = %bucket,
            total_evaluations = state.statistics.total_evaluations,
            drift_flagged = drift.is_some(),
            "Recorded outcome"
        );

        let saved = self.store.save(state).await;
        self.publish(state).await;

        if let Err(e) = saved {
            warn!(error = %e, record_id = %record.id, "Failed to persist memory state");
            return Err(e.into());
        }

        Ok(record)
    }

    /// Derived statistics over the last committed state.
    pub async fn get_statistics(&self) -> Statistics {
        let state = self.snapshot().await;
        self.statistics.snapshot(&state)
    }

    /// True when enough unconsumed samples exist and drift is above threshold.
    pub async fn should_trigger_retraining(&self) -> bool {
        let state = self.snapshot().await;
        state.reinforcement_data.unconsumed_count() >= RETRAINING_MIN_SAMPLES
            && state.statistics.drift_score > self.config.drift_threshold
    }

    /// Trusted records not yet used for training, oldest first.
    pub async fn training_dataset(&self) -> Vec<MemoryRecord> {
        self.snapshot()
            .await
            .reinforcement_data
            .unconsumed_training_samples()
    }

    /// Records waiting in the review bucket, oldest first.
    pub async fn review_queue(&self) -> Vec<MemoryRecord> {
        self.snapshot().await.reinforcement_data.review_queue()
    }

    /// Logged drift events, oldest first.
    pub async fn drift_events(&self) -> Vec<DriftEvent> {
        self.snapshot()
            .await
            .reinforcement_data
            .model_improvements
            .iter()
            .cloned()
            .collect()
    }

    /// Mark the first `n` trusted entries as used for training and persist.
    pub async fn mark_consumed(&self, n: usize) -> MemoryResult<usize> {
        let mut guard = self.writer.lock().await;
        let state = &mut *guard;

        let flipped = state.reinforcement_data.mark_consumed(n);
        let saved = self.store.save(state).await;
        self.publish(state).await;
        saved?;

        info!(requested = n, marked = flipped, "Marked training samples as consumed");
        Ok(flipped)
    }

    /// Write the unconsumed training samples to `path` as JSONL.
    ///
    /// Does not mark anything consumed; call [`mark_consumed`](Self::mark_consumed)
    /// once the corpus has been used.
    pub async fn export_for_finetuning(&self, path: impl AsRef<Path>) -> MemoryResult<PathBuf> {
        let path = path.as_ref();
        let records = self.training_dataset().await;
        let count = self.exporter.export_to_path(&records, path).await?;

        info!(path = %path.display(), examples = count, "Exported training examples");
        Ok(path.to_path_buf())
    }

    /// Export the unconsumed training samples to `path`, then mark exactly
    /// those samples consumed and persist.
    ///
    /// Runs under the writer lock, so samples recorded concurrently are
    /// neither exported nor marked. Returns the number of examples written.
    pub async fn export_and_consume(&self, path: impl AsRef<Path>) -> MemoryResult<usize> {
        let path = path.as_ref();
        let mut guard = self.writer.lock().await;
        let state = &mut *guard;

        let records = state.reinforcement_data.unconsumed_training_samples();
        let count = self.exporter.export_to_path(&records, path).await?;

        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let flipped = state.reinforcement_data.mark_consumed_ids(&ids);
        let saved = self.store.save(state).await;
        self.publish(state).await;
        saved?;

        info!(
            path = %path.display(),
            examples = count,
            marked = flipped,
            "Exported and consumed training examples"
        );
        Ok(count)
    }

    /// Discard the durable state and start over empty.
    pub async fn reset(&self) -> MemoryResult<()> {
        let mut guard = self.writer.lock().await;

        self.store.clear().await?;
        *guard = MemoryState::new(&self.config.default_category);
        let saved = self.store.save(&guard).await;
        self.publish(&guard).await;
        saved?;

        info!(location = %self.store.location(), "Memory state reset");
        Ok(())
    }

    async fn publish(&self, state: &MemoryState) {
        *self.snapshot.write().await = Arc::new(state.clone());
    }
}
