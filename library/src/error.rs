use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Compilation error: {0}")]
    Compilation(String),
    #[error("Evaluation error: {0}")]
    Evaluation(String),
    #[error("Cycle error: {0}")]
    Cycle(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl GraphError {
    pub fn validation(message: impl Into<String>) -> Self {
        GraphError::Validation(message.into())
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        GraphError::Compilation(message.into())
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        GraphError::Evaluation(message.into())
    }

    pub fn cycle(message: impl Into<String>) -> Self {
        GraphError::Cycle(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        GraphError::Storage(message.into())
    }
}
