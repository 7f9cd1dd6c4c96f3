use thiserror::Error;

#[derive(Error, Debug)]
pub enum SangkatError {
    #[error("Index error: {0}")]
    IndexError(#[from] crate::index::IndexError),
    #[error("Alias error: {0}")]
    AliasError(#[from] crate::alias::AliasError),
    #[error("Data processing error: {0}")]
    DataProcessing(#[from] sangkat_data_processing::DataError),
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::prelude::PolarsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SangkatError>;
