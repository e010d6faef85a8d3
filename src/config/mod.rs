use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub memory: MemoryConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub vision: VisionConfig,
    pub request: RequestConfig,
}

/// Memory engine policy, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    /// Outcomes at or above this confidence are trusted for training.
    pub confidence_threshold: f64,
    /// Low-confidence rate above which drift is flagged.
    pub drift_threshold: f64,
    /// Category seeded into a fresh state and used by the classifier.
    pub default_category: String,
}

/// Durable store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Sqlite,
}

/// Durable store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Vision model API configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let memory = MemoryConfig {
            confidence_threshold: parse_threshold("MEMORY_CONFIDENCE_THRESHOLD", 0.85)?,
            drift_threshold: parse_threshold("MEMORY_DRIFT_THRESHOLD", 0.30)?,
            default_category: env::var("MEMORY_DEFAULT_CATEGORY")
                .unwrap_or_else(|_| "box_condition".to_string()),
        };

        let backend = match env::var("MEMORY_STORE_BACKEND")
            .unwrap_or_else(|_| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => StoreBackend::Json,
            "sqlite" => StoreBackend::Sqlite,
            other => {
                return Err(AppError::Config {
                    message: format!("MEMORY_STORE_BACKEND must be json or sqlite, got {}", other),
                })
            }
        };

        let default_path = match backend {
            StoreBackend::Json => "./data/memory.json",
            StoreBackend::Sqlite => "./data/memory.db",
        };

        let store = StoreConfig {
            backend,
            path: PathBuf::from(
                env::var("MEMORY_STORE_PATH").unwrap_or_else(|_| default_path.to_string()),
            ),
            max_connections: env::var("MEMORY_STORE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let vision = VisionConfig {
            api_key: env::var("VISION_API_KEY").ok().filter(|k| !k.is_empty()),
            base_url: env::var("VISION_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: env::var("VISION_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500),
            temperature: env::var("VISION_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        Ok(Config {
            memory,
            store,
            logging,
            vision,
            request,
        })
    }
}

/// Read a `[0.0, 1.0]` threshold, falling back to `default` when unset.
fn parse_threshold(key: &str, default: f64) -> Result<f64, AppError> {
    let value = match env::var(key) {
        Ok(raw) => raw.trim().parse::<f64>().map_err(|e| AppError::Config {
            message: format!("{} is not a number: {}", key, e),
        })?,
        Err(_) => default,
    };

    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::Config {
            message: format!("{} must be within [0.0, 1.0], got {}", key, value),
        });
    }

    Ok(value)
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            drift_threshold: 0.30,
            default_category: "box_condition".to_string(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}
