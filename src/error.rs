use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("partial fan-out: {failed} membership update(s) failed")]
    PartialFanout { failed: usize },
}

impl AppError {
    /// Returns whether this error is retryable (e.g., a transient backend outage)
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}
