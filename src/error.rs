use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatementAnalysisError {
    #[error("Invalid segmentation bounds: {0}")]
    InvalidSegmentation(String),

    #[error("Invalid label catalog for {item}: {details}")]
    InvalidLabelCatalog { item: String, details: String },

    #[error("Invalid score policy '{version}': {details}")]
    InvalidScorePolicy { version: String, details: String },

    #[error("Override targets unknown line item: {0}")]
    UnknownOverrideTarget(String),

    #[error("Invalid period '{0}', expected 'DD/MM/YYYY to DD/MM/YYYY'")]
    InvalidPeriod(String),

    #[error("Pattern compilation error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StatementAnalysisError>;
