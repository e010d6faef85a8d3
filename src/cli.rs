//! Operator commands for the memory engine.
//!
//! Every command runs against an opened [`MemoryEngine`] and renders a
//! plain-text report. Failures become a non-zero exit code instead of a
//! panic so the binary can print them uniformly.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;

use crate::config::Config;
use crate::memory::{MemoryEngine, MemoryRecord, Outcome, Status};
use crate::vision::{BoxClassifier, VisionClient};

const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════\n";

/// Memory engine subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MemoryCommands {
    /// Show global statistics
    Stats,

    /// Show the ranked in-context examples for a category
    Context {
        /// Category to retrieve from (defaults to the configured category)
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of examples
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Record a classification outcome
    Record {
        /// Category to record under (defaults to the configured category)
        #[arg(long)]
        category: Option<String>,

        /// Outcome status: OK, NEEDS_FIX or ERROR
        #[arg(long)]
        status: Status,

        /// Confidence in [0, 1]
        #[arg(long)]
        confidence: f64,

        /// Reason given for the decision
        #[arg(long, default_value = "")]
        reason: String,

        /// Damage type (repeatable)
        #[arg(long = "damage")]
        damage_types: Vec<String>,

        /// Driver identifier
        #[arg(long)]
        driver: Option<String>,

        /// Image identifier
        #[arg(long)]
        image: Option<String>,
    },

    /// Record a human correction with full confidence
    Feedback {
        /// Corrected status: OK or NEEDS_FIX
        #[arg(long)]
        label: Status,

        /// Driver identifier
        #[arg(long)]
        driver: Option<String>,

        /// Image identifier
        #[arg(long)]
        image: Option<String>,
    },

    /// Classify an image file with the configured vision model
    Classify {
        /// Path to a JPEG or PNG image
        #[arg(long)]
        file: PathBuf,

        /// Driver identifier
        #[arg(long)]
        driver: Option<String>,

        /// Image identifier
        #[arg(long)]
        image: Option<String>,
    },

    /// Report whether retraining should be triggered
    RetrainCheck,

    /// List trusted samples not yet used for training
    TrainingData,

    /// Export unconsumed training samples as JSONL
    Export {
        /// Destination file
        #[arg(long)]
        output: PathBuf,

        /// Mark the exported samples as consumed afterwards
        #[arg(long)]
        consume: bool,
    },

    /// Mark the oldest trusted samples as used for training
    MarkConsumed {
        /// Number of samples to mark
        #[arg(long)]
        count: usize,
    },

    /// List logged drift events
    DriftEvents,

    /// Discard all memory and start over
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a memory CLI command.
pub async fn execute_command(
    command: MemoryCommands,
    engine: &Arc<MemoryEngine>,
    config: &Config,
) -> CliResult {
    match command {
        MemoryCommands::Stats => execute_stats(engine).await,
        MemoryCommands::Context { category, limit } => {
            let category = category.unwrap_or_else(|| engine.config().default_category.clone());
            execute_context(engine, &category, limit).await
        }
        MemoryCommands::Record {
            category,
            status,
            confidence,
            reason,
            damage_types,
            driver,
            image,
        } => {
            let category = category.unwrap_or_else(|| engine.config().default_category.clone());
            let mut outcome =
                Outcome::new(status, confidence, reason).with_damage_types(damage_types);
            if let Some(driver) = driver {
                outcome = outcome.with_driver(driver);
            }
            if let Some(image) = image {
                outcome = outcome.with_image(image);
            }
            execute_record(engine, &category, outcome).await
        }
        MemoryCommands::Feedback {
            label,
            driver,
            image,
        } => {
            let category = engine.config().default_category.clone();
            let mut outcome = Outcome::human_feedback(label, driver.as_deref());
            if let Some(image) = image {
                outcome = outcome.with_image(image);
            }
            execute_record(engine, &category, outcome).await
        }
        MemoryCommands::Classify {
            file,
            driver,
            image,
        } => execute_classify(engine, config, file, driver, image).await,
        MemoryCommands::RetrainCheck => execute_retrain_check(engine).await,
        MemoryCommands::TrainingData => execute_training_data(engine).await,
        MemoryCommands::Export { output, consume } => {
            execute_export(engine, output, consume).await
        }
        MemoryCommands::MarkConsumed { count } => match engine.mark_consumed(count).await {
            Ok(marked) => CliResult::success(format!(
                "Marked {} training sample(s) as consumed.\n",
                marked
            )),
            Err(e) => CliResult::error(format!("Failed to mark samples: {}\n", e)),
        },
        MemoryCommands::DriftEvents => execute_drift_events(engine).await,
        MemoryCommands::Reset { yes } => execute_reset(engine, yes).await,
    }
}

async fn execute_stats(engine: &MemoryEngine) -> CliResult {
    let stats = engine.get_statistics().await;
    let mut output = String::new();

    output.push_str("\nMemory Statistics\n");
    output.push_str(RULE);
    output.push('\n');
    output.push_str(&format!("Total evaluations:      {}\n", stats.total_evaluations));
    output.push_str(&format!("Low-confidence cases:   {}\n", stats.low_confidence_cases));
    output.push_str(&format!("Low-confidence rate:    {:.3}\n", stats.low_confidence_rate));
    output.push_str(&format!(
        "Drift score:            {:.3} (threshold {:.2})\n",
        stats.drift_score,
        engine.config().drift_threshold
    ));
    output.push_str(&format!("Average confidence:     {:.3}\n", stats.average_confidence));
    output.push_str(&format!("Recent trend:           {:.3}\n", stats.recent_confidence_trend));
    output.push_str(&format!(
        "Training samples ready: {}\n",
        stats.training_samples_available
    ));

    CliResult::success(output)
}

async fn execute_context(engine: &MemoryEngine, category: &str, limit: usize) -> CliResult {
    let examples = engine.retrieve_context(category, limit).await;
    CliResult::success(format!("{}\n", engine.format_context_for_prompt(&examples)))
}

async fn execute_record(engine: &MemoryEngine, category: &str, outcome: Outcome) -> CliResult {
    match engine.update(category, outcome).await {
        Ok(record) => {
            let mut output = format!(
                "Recorded {} {} (confidence {:.2}) under {}\n",
                record.id, record.status, record.confidence, record.category
            );
            if engine.needs_review(record.confidence) {
                output.push_str("Flagged for human review.\n");
            }
            CliResult::success(output)
        }
        Err(e) => CliResult::error(format!("Failed to record outcome: {}\n", e)),
    }
}

async fn execute_classify(
    engine: &Arc<MemoryEngine>,
    config: &Config,
    file: PathBuf,
    driver: Option<String>,
    image_id: Option<String>,
) -> CliResult {
    let client = match VisionClient::new(&config.vision, config.request.clone()) {
        Ok(client) => client,
        Err(e) => return CliResult::error(format!("Vision model unavailable: {}\n", e)),
    };

    let image = match tokio::fs::read(&file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return CliResult::error(format!("Failed to read {}: {}\n", file.display(), e))
        }
    };

    let classifier = BoxClassifier::new(engine.clone(), Arc::new(client));
    match classifier
        .classify(&image, driver.as_deref(), image_id.as_deref())
        .await
    {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) if result.record.is_some() => CliResult::success(format!("{}\n", json)),
            Ok(json) => CliResult::error(format!("{}\n", json)),
            Err(e) => CliResult::error(format!("Failed to render result: {}\n", e)),
        },
        Err(e) => CliResult::error(format!("Failed to record classification: {}\n", e)),
    }
}

async fn execute_retrain_check(engine: &MemoryEngine) -> CliResult {
    let stats = engine.get_statistics().await;
    let verdict = if engine.should_trigger_retraining().await {
        "Retraining recommended"
    } else {
        "Retraining not needed"
    };

    CliResult::success(format!(
        "{} ({} unconsumed sample(s), drift score {:.3})\n",
        verdict, stats.training_samples_available, stats.drift_score
    ))
}

async fn execute_training_data(engine: &MemoryEngine) -> CliResult {
    let samples = engine.training_dataset().await;
    let mut output = String::new();

    output.push_str(&format!("\nUnconsumed Training Samples: {}\n", samples.len()));
    output.push_str(RULE);
    if samples.is_empty() {
        output.push_str("No samples available.\n");
    }
    for record in &samples {
        output.push_str(&format_record(record));
    }

    CliResult::success(output)
}

async fn execute_export(engine: &MemoryEngine, output: PathBuf, consume: bool) -> CliResult {
    if consume {
        return match engine.export_and_consume(&output).await {
            Ok(count) => CliResult::success(format!(
                "Exported {} example(s) to {}\nMarked {} sample(s) as consumed.\n",
                count,
                output.display(),
                count
            )),
            Err(e) => CliResult::error(format!("Export failed: {}\n", e)),
        };
    }

    let count = engine.training_dataset().await.len();
    match engine.export_for_finetuning(&output).await {
        Ok(path) => CliResult::success(format!(
            "Exported {} example(s) to {}\n",
            count,
            path.display()
        )),
        Err(e) => CliResult::error(format!("Export failed: {}\n", e)),
    }
}

async fn execute_drift_events(engine: &MemoryEngine) -> CliResult {
    let events = engine.drift_events().await;
    let mut output = String::new();

    output.push_str(&format!("\nDrift Events: {}\n", events.len()));
    output.push_str(RULE);
    if events.is_empty() {
        output.push_str("No drift detected.\n");
    }
    for event in &events {
        output.push_str(&format!(
            "{} | {} | score {:.3} | {}\n",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event,
            event.drift_score,
            event.action
        ));
    }

    CliResult::success(output)
}

async fn execute_reset(engine: &MemoryEngine, yes: bool) -> CliResult {
    if !yes {
        return CliResult::error("Refusing to reset without --yes\n");
    }

    match engine.reset().await {
        Ok(()) => CliResult::success("Memory reset.\n"),
        Err(e) => CliResult::error(format!("Reset failed: {}\n", e)),
    }
}

fn format_record(record: &MemoryRecord) -> String {
    format!(
        "{} | {} | {:.2} | {}\n",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.status,
        record.confidence,
        record.reason
    )
}
