use thiserror::Error;

use crate::btree::BPlusTreeError;
use crate::config::ConfigError;

/// Result type for shell commands
pub type ShellResult<T> = Result<T, ShellError>;

/// Errors a shell command can report; none of them ends the session
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Cannot read/write file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("B+ tree error: {0}")]
    BPlusTreeError(#[from] BPlusTreeError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
}
