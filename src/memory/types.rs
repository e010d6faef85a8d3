//! Record, bucket and state types for the memory engine.
//!
//! The serialized shape of [`MemoryState`] is the durable document: one key per
//! category holding its ordered record log, plus `statistics`, `patterns` and
//! `reinforcement_data`.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoryError, MemoryResult};

/// Top-level document keys that cannot be used as category names.
pub const RESERVED_KEYS: [&str; 3] = ["statistics", "patterns", "reinforcement_data"];

/// Reason recorded when the model gave none.
pub const NO_REASON: &str = "No reason provided";

// ============================================================================
// Status
// ============================================================================

/// Classification status reported by the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Box is intact.
    Ok,
    /// Box needs repair or replacement.
    NeedsFix,
    /// Classification could not be produced.
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::NeedsFix => write!(f, "NEEDS_FIX"),
            Status::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace([' ', '-'], "_").as_str() {
            "OK" => Ok(Status::Ok),
            "NEEDS_FIX" => Ok(Status::NeedsFix),
            "ERROR" => Ok(Status::Error),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

// ============================================================================
// Outcome (ingestion input)
// ============================================================================

/// A classification outcome as supplied by a caller.
///
/// The engine stamps the timestamp and identifier when the outcome is
/// recorded, so neither is part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub status: Status,
    pub confidence: f64,
    pub reason: String,
    #[serde(default)]
    pub damage_types: Vec<String>,
    #[serde(default)]
    pub feedback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl Outcome {
    /// Create an outcome with no damage types and no identifiers.
    pub fn new(status: Status, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            status,
            confidence,
            reason: reason.into(),
            damage_types: Vec::new(),
            feedback: false,
            driver_id: None,
            image_id: None,
        }
    }

    /// A human correction. Carries full confidence so it lands in the
    /// trusted bucket.
    pub fn human_feedback(status: Status, driver_id: Option<&str>) -> Self {
        let driver = driver_id.unwrap_or("unknown");
        Self {
            status,
            confidence: 1.0,
            reason: format!("Human feedback from driver {}", driver),
            damage_types: Vec::new(),
            feedback: true,
            driver_id: Some(driver.to_string()),
            image_id: None,
        }
    }

    /// Set the damage types.
    pub fn with_damage_types(mut self, damage_types: Vec<String>) -> Self {
        self.damage_types = damage_types;
        self
    }

    /// Set the driver identifier.
    pub fn with_driver(mut self, driver_id: impl Into<String>) -> Self {
        self.driver_id = Some(driver_id.into());
        self
    }

    /// Set the image identifier.
    pub fn with_image(mut self, image_id: impl Into<String>) -> Self {
        self.image_id = Some(image_id.into());
        self
    }

    /// Check the confidence invariant. NaN and values outside `[0, 1]` are
    /// rejected rather than clamped.
    pub fn validate(&self) -> MemoryResult<()> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(MemoryError::invalid(
                "confidence",
                format!("must be within [0.0, 1.0], got {}", self.confidence),
            ));
        }
        Ok(())
    }
}

/// Validate a category name against the document layout.
pub fn validate_category(category: &str) -> MemoryResult<()> {
    if category.trim().is_empty() {
        return Err(MemoryError::invalid("category", "cannot be empty"));
    }
    if RESERVED_KEYS.contains(&category) {
        return Err(MemoryError::invalid(
            "category",
            format!("'{}' is a reserved key", category),
        ));
    }
    Ok(())
}

// ============================================================================
// MemoryRecord
// ============================================================================

/// One recorded classification outcome. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub category: String,
    pub status: Status,
    pub confidence: f64,
    pub reason: String,
    #[serde(default)]
    pub damage_types: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub feedback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

impl MemoryRecord {
    /// Stamp an outcome into a record.
    pub fn from_outcome(category: &str, outcome: Outcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            category: category.to_string(),
            status: outcome.status,
            confidence: outcome.confidence,
            reason: outcome.reason,
            damage_types: outcome.damage_types,
            timestamp,
            feedback: outcome.feedback,
            driver_id: outcome.driver_id,
            image_id: outcome.image_id,
        }
    }
}

// ============================================================================
// Bucket entries
// ============================================================================

/// Entry in the high-confidence (trusted) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedEntry {
    #[serde(rename = "prediction")]
    pub record: MemoryRecord,
    pub timestamp: DateTime<Utc>,
    pub used_for_training: bool,
}

/// Entry in the low-confidence (review) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    #[serde(rename = "prediction")]
    pub record: MemoryRecord,
    pub timestamp: DateTime<Utc>,
    pub needs_review: bool,
}

/// Recorded when the low-confidence rate crosses the drift threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub drift_score: f64,
    pub action: String,
}

// ============================================================================
// Durable state
// ============================================================================

/// Running counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsState {
    pub total_evaluations: u64,
    pub low_confidence_cases: u64,
    pub drift_score: f64,
}

/// Bounded observation windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Patterns {
    pub confidence_history: VecDeque<f64>,
}

/// The two reinforcement buckets and the drift-event log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementData {
    pub high_confidence_correct: VecDeque<TrustedEntry>,
    pub low_confidence_cases: VecDeque<ReviewEntry>,
    pub model_improvements: VecDeque<DriftEvent>,
}

/// The whole engine state, persisted as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    #[serde(flatten)]
    pub categories: BTreeMap<String, Vec<MemoryRecord>>,
    pub statistics: StatisticsState,
    pub patterns: Patterns,
    pub reinforcement_data: ReinforcementData,
}

impl MemoryState {
    /// Fresh state with an empty log for `default_category`.
    pub fn new(default_category: &str) -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(default_category.to_string(), Vec::new());
        Self {
            categories,
            statistics: StatisticsState::default(),
            patterns: Patterns::default(),
            reinforcement_data: ReinforcementData::default(),
        }
    }

    /// Records logged under `category`, oldest first.
    pub fn records(&self, category: &str) -> &[MemoryRecord] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Derived metrics returned by `get_statistics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_evaluations: u64,
    pub low_confidence_cases: u64,
    pub low_confidence_rate: f64,
    pub drift_score: f64,
    pub average_confidence: f64,
    pub recent_confidence_trend: f64,
    pub training_samples_available: usize,
}
