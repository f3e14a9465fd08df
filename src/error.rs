use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExplorerError {
    #[error("invalid dataset source: {0}")]
    InvalidSource(String),

    #[error("danger percentile must be between 50 and 99, got {0}")]
    InvalidPercentile(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("download failed: {0}")]
    Http(String),

    #[error("server returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("unable to fetch {dataset} data and no cache exists: {cause}")]
    #[diagnostic(help("check your network connection, then refresh again"))]
    DataUnavailable { dataset: String, cause: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
