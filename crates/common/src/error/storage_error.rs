//! 存储相关错误类型
//!
//! 定义所有与持久化后端相关的错误

use thiserror::Error;

/// 存储相关错误
#[derive(Error, Debug)]
pub enum StorageError {
    /// The on-disk state cannot be trusted. Fatal at startup.
    #[error("Corruption detected in {location}: {reason}")]
    Corruption { location: String, reason: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage backend error: {backend}: {message}")]
    Backend { backend: String, message: String },
}

impl StorageError {
    pub fn corruption(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corruption {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corruption { .. })
    }
}
