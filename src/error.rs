use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkchatError>;

/// Crate-wide error type. Every failure surfaces to the caller with a
/// message; nothing is retried below this level.
#[derive(Error, Debug)]
pub enum WorkchatError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("task {task_id} did not reach a terminal state within {timeout_ms}ms")]
    PollTimeout { task_id: String, timeout_ms: u64 },

    #[error("polling for task {task_id} was cancelled")]
    PollCancelled { task_id: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Failed to create Redis pool: {0}")]
    PoolCreation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Chat not found: {id}")]
    ChatNotFound { id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
