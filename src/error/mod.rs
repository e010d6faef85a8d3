use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),
}

/// Durable state store errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The durable blob exists but does not match the expected schema.
    #[error("Corrupt memory state at {location}: {message}")]
    CorruptState { location: String, message: String },

    /// Reading or writing the durable blob failed.
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Memory engine errors
#[derive(Debug, Error)]
pub enum MemoryError {
    /// An outcome failed validation at ingestion; nothing was mutated.
    #[error("Invalid record: {field} - {reason}")]
    InvalidRecord { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl MemoryError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        MemoryError::InvalidRecord {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Vision model API errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Vision model unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Vision client is not configured: {message}")]
    NotConfigured { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for memory engine operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Result type alias for vision model operations
pub type VisionResult<T> = Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "threshold out of range".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: threshold out of range");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::CorruptState {
            location: "memory.json".to_string(),
            message: "expected value at line 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Corrupt memory state at memory.json: expected value at line 1"
        );

        let err = StorageError::io(
            "/tmp/memory.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O failure on /tmp/memory.json: denied");

        let err = StorageError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_memory_error_display() {
        let err = MemoryError::invalid("confidence", "must be within [0.0, 1.0], got 1.2");
        assert_eq!(
            err.to_string(),
            "Invalid record: confidence - must be within [0.0, 1.0], got 1.2"
        );
    }

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Unavailable {
            message: "server down".to_string(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "Vision model unavailable: server down (retries: 3)"
        );

        let err = VisionError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 401 - unauthorized");

        let err = VisionError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");
    }

    #[test]
    fn test_storage_error_conversion_to_memory_error() {
        let storage_err = StorageError::Serialization {
            message: "bad float".to_string(),
        };
        let memory_err: MemoryError = storage_err.into();
        assert!(matches!(memory_err, MemoryError::Storage(_)));
    }

    #[test]
    fn test_memory_error_conversion_to_app_error() {
        let memory_err = MemoryError::invalid("category", "cannot be empty");
        let app_err: AppError = memory_err.into();
        assert!(matches!(app_err, AppError::Memory(_)));
        assert!(app_err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_vision_error_conversion_to_app_error() {
        let vision_err = VisionError::Timeout { timeout_ms: 1000 };
        let app_err: AppError = vision_err.into();
        assert!(matches!(app_err, AppError::Vision(_)));
    }
}
