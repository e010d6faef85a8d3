//! Vision model collaborator.
//!
//! The memory engine never calls a model itself. This module is the thin
//! caller around it: it retrieves context, prompts an OpenAI-compatible
//! vision endpoint, parses the answer and records it.

mod classifier;
mod client;
mod parse;
mod types;

pub use classifier::{BoxClassifier, Classification, CONTEXT_EXAMPLES};
pub use client::{image_data_url, VisionClient};
pub use parse::parse_classification;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, ContentPart, ImageUrl, MessageContent,
    MessageRole, ResponseMessage, Usage,
};

use async_trait::async_trait;

use crate::error::VisionResult;

/// A model that classifies an image given system and user prompts.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Return the raw completion text for `image`.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        image: &[u8],
    ) -> VisionResult<String>;
}
