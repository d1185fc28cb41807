use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),
    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Operation timed out after {0}s")]
    Timeout(u64),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrganizerError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        OrganizerError::InvalidInput(message.into())
    }
}

pub type Result<T, E = OrganizerError> = std::result::Result<T, E>;
