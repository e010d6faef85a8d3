//! # raag-memory
//!
//! Adaptive memory and reinforcement feedback for a box-condition vision
//! classifier. Every classification outcome is recorded, aggregated into
//! running statistics, sorted into trusted and review buckets, and watched
//! for confidence drift. Past outcomes are retrieved as in-context examples
//! for the next prompt, and trusted ones are exported as a fine-tuning corpus.
//!
//! ## Architecture
//!
//! ```text
//! BoxClassifier → VisionModel (HTTP)
//!       ↓
//! MemoryEngine → Statistics / Buckets / Drift / Retrieval / Export
//!       ↓
//! StateStore (JSON file or SQLite)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use raag_memory::{Config, MemoryEngine, Outcome, Status};
//! use raag_memory::storage::open_store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = open_store(&config.store).await?;
//!     let engine = Arc::new(MemoryEngine::open(config.memory, store).await?);
//!     engine
//!         .update("box_condition", Outcome::new(Status::Ok, 0.92, "Intact"))
//!         .await?;
//!     println!("{:?}", engine.get_statistics().await);
//!     Ok(())
//! }
//! ```

/// Operator command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Memory engine and its components.
pub mod memory;
/// Prompts for classification and training export.
pub mod prompts;
/// Durable state stores.
pub mod storage;
/// Vision model client and classifier.
pub mod vision;

pub use config::Config;
pub use error::{AppError, AppResult, MemoryError, MemoryResult, StorageError, VisionError};
pub use memory::{MemoryEngine, MemoryRecord, Outcome, Statistics, Status};
pub use storage::{JsonFileStore, SqliteStateStore, StateStore};
pub use vision::{BoxClassifier, Classification, VisionClient, VisionModel};
