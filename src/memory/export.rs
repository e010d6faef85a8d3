//! Training corpus export.
//!
//! Each unconsumed trusted record becomes one line of JSON holding a
//! three-message chat exchange (system, user, assistant), the layout accepted
//! by chat fine-tuning tooling. Exporting never marks records consumed.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{MemoryRecord, Status};
use crate::error::{StorageError, StorageResult};
use crate::prompts::{training_user_prompt, TRAINING_SYSTEM_PROMPT};
use crate::storage::write_atomic;

/// Role of a training message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingRole {
    System,
    User,
    Assistant,
}

/// One role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMessage {
    pub role: TrainingRole,
    pub content: String,
}

/// One line of the exported corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub messages: Vec<TrainingMessage>,
}

/// Structured payload carried as the assistant message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub status: Status,
    pub reason: String,
    pub confidence: f64,
}

impl TrainingExample {
    /// Build the three-turn exchange for one record.
    pub fn from_record(record: &MemoryRecord) -> serde_json::Result<Self> {
        let reply = AssistantReply {
            status: record.status,
            reason: record.reason.clone(),
            confidence: record.confidence,
        };

        Ok(Self {
            messages: vec![
                TrainingMessage {
                    role: TrainingRole::System,
                    content: TRAINING_SYSTEM_PROMPT.to_string(),
                },
                TrainingMessage {
                    role: TrainingRole::User,
                    content: training_user_prompt(record.status),
                },
                TrainingMessage {
                    role: TrainingRole::Assistant,
                    content: serde_json::to_string(&reply)?,
                },
            ],
        })
    }
}

/// Serializes trusted records into line-delimited training examples.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpusExporter;

impl TrainingCorpusExporter {
    /// Create an exporter.
    pub fn new() -> Self {
        Self
    }

    /// Write one example per line to `writer`. Returns the number written.
    pub fn write_to<W: Write>(
        &self,
        records: &[MemoryRecord],
        mut writer: W,
    ) -> std::io::Result<usize> {
        for record in records {
            let example = TrainingExample::from_record(record)?;
            serde_json::to_writer(&mut writer, &example)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    /// Replace the file at `path` with the exported corpus.
    ///
    /// The file is written next to the target and renamed into place, so an
    /// I/O failure leaves any previous export untouched.
    pub async fn export_to_path(
        &self,
        records: &[MemoryRecord],
        path: &Path,
    ) -> StorageResult<usize> {
        let mut buffer = Vec::new();
        let count = self
            .write_to(records, &mut buffer)
            .map_err(|e| StorageError::Serialization {
                message: format!("Failed to encode training corpus: {}", e),
            })?;
        write_atomic(path, &buffer).await?;
        Ok(count)
    }
}
