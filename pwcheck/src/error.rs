use std::time::Duration;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Breach(#[from] pwcheck_breach::Error),

    #[error(transparent)]
    Store(#[from] pwcheck_store::StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("breach check did not finish within {0:?}")]
    BreachTimeout(Duration),

    #[error("password storage is not configured")]
    StorageDisabled,

    #[error("maximum number of invalid menu selections ({0}) exceeded")]
    PromptRetriesExceeded(u32),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
