use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShortageError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Malformed configuration in {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    #[error("Raw input directory not found: {}", .0.display())]
    InputDirNotFound(PathBuf),

    #[error("No CSV files found in {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("Missing required columns in {file}: {columns:?}")]
    MissingColumns { file: String, columns: Vec<String> },

    #[error("Cannot convert value '{value}' in column '{column}' of {file} to boolean")]
    InvalidBoolean {
        file: String,
        column: String,
        value: String,
    },

    #[error("Quality check failed: record set is empty")]
    EmptyRecordSet,

    #[error("Schema validation failed with {} violation(s): {}", .0.len(), .0.join("; "))]
    SchemaViolations(Vec<String>),

    #[error("Non-compliant currency detected during quality checks (expected {0})")]
    CurrencyNonCompliant(String),

    #[error("Invalid date values found in column '{0}'")]
    InvalidDateColumn(&'static str),

    #[error("Future-dated values found in column '{0}'")]
    FutureDatedColumn(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShortageError>;
