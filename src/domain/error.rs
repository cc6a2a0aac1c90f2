use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppError {
    /// Upload could not be read as a delimited table.
    Format(String),
    /// No column satisfied the identifier or analyte rules.
    Detection {
        message: String,
        available_columns: Vec<String>,
    },
    /// An analyte cell is not a number after qualifier stripping.
    Conversion {
        column: String,
        row: usize,
        value: String,
    },
    Unexpected(String),
    Config(String),
    LLMError(String),
    ConversionService(String),
    ValidationError(String),
    IoError(String),
}

impl AppError {
    /// Short machine-readable tag used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Format(_) => "format_error",
            AppError::Detection { .. } => "detection_error",
            AppError::Conversion { .. } => "conversion_error",
            AppError::Unexpected(_) => "unexpected_error",
            AppError::Config(_) => "config_error",
            AppError::LLMError(_) => "llm_error",
            AppError::ConversionService(_) => "conversion_service_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::IoError(_) => "io_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Format(msg) => write!(f, "CSV parsing error: {}", msg),
            AppError::Detection {
                message,
                available_columns,
            } => write!(
                f,
                "Column detection failed: {}. Available columns: {:?}",
                message, available_columns
            ),
            AppError::Conversion { column, row, value } => write!(
                f,
                "Could not convert value {:?} in column '{}' (row {}) to a number",
                value, column, row
            ),
            AppError::Unexpected(msg) => write!(f, "Processing error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::ConversionService(msg) => write!(f, "Document conversion failed: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Format(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
