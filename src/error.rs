use std::path::PathBuf;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// 批处理错误 (全部致命, 不做部分结果)
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid {encoding} text", path.display())]
    Encoding { path: PathBuf, encoding: &'static str },

    /// row 为数据行序号 (从 1 开始, 不含表头)
    #[error("row {row} (line {line}): {message}")]
    Coercion { row: u64, line: u64, message: String },

    /// position 为查询结果中的序号 (从 1 开始)
    #[error("search hit {position}: {message}")]
    BadDocument { position: usize, message: String },

    #[error("elasticsearch request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("elasticsearch returned {status}: {body}")]
    Store { status: u16, body: String },

    #[error("bulk write rejected {failed} of {total} documents: {reason}")]
    BulkRejected {
        failed: usize,
        total: usize,
        reason: String,
    },

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::InvalidConfig(e.to_string())
    }
}
