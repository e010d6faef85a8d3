use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use super::{parse_classification, VisionModel};
use crate::error::MemoryResult;
use crate::memory::{MemoryEngine, MemoryRecord, Outcome, Status};
use crate::prompts::{classification_system_prompt, classification_user_prompt};

/// Number of prior outcomes offered to the model as context.
pub const CONTEXT_EXAMPLES: usize = 5;

/// Result of classifying one image.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Parsed (or fallback) outcome.
    pub outcome: Outcome,
    /// Stored record; `None` when the model call failed and nothing was recorded.
    pub record: Option<MemoryRecord>,
    /// Confidence fell below the trust threshold.
    pub needs_review: bool,
}

/// Classifies box images, priming the model with memory context and feeding
/// the result back into the memory engine.
pub struct BoxClassifier {
    engine: Arc<MemoryEngine>,
    model: Arc<dyn VisionModel>,
}

impl BoxClassifier {
    /// Create a classifier over a shared engine and model.
    pub fn new(engine: Arc<MemoryEngine>, model: Arc<dyn VisionModel>) -> Self {
        Self { engine, model }
    }

    /// Classify `image` and record the outcome under the default category.
    pub async fn classify(
        &self,
        image: &[u8],
        driver_id: Option<&str>,
        image_id: Option<&str>,
    ) -> MemoryResult<Classification> {
        let category = self.engine.config().default_category.clone();

        let examples = self
            .engine
            .retrieve_context(&category, CONTEXT_EXAMPLES)
            .await;
        let context = self.engine.format_context_for_prompt(&examples);
        let stats = self.engine.get_statistics().await;

        let system_prompt =
            classification_system_prompt(stats.drift_score, self.engine.config().drift_threshold);
        let user_prompt = classification_user_prompt(&context);

        let completion = match self.model.complete(&system_prompt, &user_prompt, image).await {
            Ok(completion) => completion,
            Err(e) => {
                error!(error = %e, category = %category, "Classification failed");
                return Ok(Classification {
                    outcome: Outcome::new(
                        Status::Error,
                        0.0,
                        format!("Classification failed: {}", e),
                    ),
                    record: None,
                    needs_review: true,
                });
            }
        };

        let mut outcome = parse_classification(&completion);
        if let Some(driver) = driver_id {
            outcome = outcome.with_driver(driver);
        }
        if let Some(image) = image_id {
            outcome = outcome.with_image(image);
        }

        let record = self.engine.update(&category, outcome.clone()).await?;
        let needs_review = self.engine.needs_review(record.confidence);

        info!(
            record_id = %record.id,
            status = %record.status,
            confidence = record.confidence,
            needs_review,
            context_examples = examples.len(),
            "Classified image"
        );

        Ok(Classification {
            outcome,
            record: Some(record),
            needs_review,
        })
    }
}
