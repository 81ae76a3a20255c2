use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found or deleted: {0}")]
    FileNotFound(i64),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown task: {0}")]
    UnknownTask(i64),

    #[error("Already imported as file {0}")]
    DuplicateFile(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, IntakeError>;
