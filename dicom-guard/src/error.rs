//! Error types for the dicom-guard library.
//!
//! Data-quality noise in the inputs (unparseable values, malformed standard
//! terms, empty groups) is recovered locally and never surfaces here. Errors
//! are reserved for caller contract violations such as missing columns or an
//! inconsistent configuration.

use thiserror::Error;

/// The main error type for dicom-guard operations.
#[derive(Error, Debug)]
pub enum DicomGuardError {
    /// The evaluator configuration breaks a contract, e.g. no IOD grouping column.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An input table lacks a column the run needs.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table that was inspected
        table: String,
        /// Name of the missing column
        column: String,
    },

    /// A column could not be read as the expected Arrow type.
    #[error("Column type {found} cannot be read as {expected}")]
    TypeMismatch { expected: String, found: String },

    /// A table source could not be resolved or registered.
    #[error("{source_type} source failed: {message}")]
    DataSource {
        /// Kind of source, e.g. "CSV" or "memory"
        source_type: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Query engine failure: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    #[error("Arrow failure: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A config document or report could not be (de)serialized.
    #[error("Could not serialize or parse: {0}")]
    Serialization(String),

    /// Anything else, usually with context attached by [`ErrorContext`].
    #[error("{0}")]
    Internal(String),
}

/// A type alias for `Result<T, DicomGuardError>`.
pub type Result<T> = std::result::Result<T, DicomGuardError>;

impl DicomGuardError {
    /// Shorthand for [`DicomGuardError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for [`DicomGuardError::ColumnNotFound`].
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// A source failure without an underlying cause.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// A source failure wrapping its cause.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }
}

impl From<serde_json::Error> for DicomGuardError {
    fn from(json_err: serde_json::Error) -> Self {
        Self::Serialization(json_err.to_string())
    }
}

/// Prefixes errors with a description of what was being attempted.
///
/// Configuration errors keep their kind; everything else becomes
/// [`DicomGuardError::Internal`].
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;

    /// Like [`ErrorContext::context`], building the message only on error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<DicomGuardError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            DicomGuardError::Internal(inner) => DicomGuardError::Internal(format!("{}: {inner}", f())),
            DicomGuardError::Configuration(inner) => {
                DicomGuardError::Configuration(format!("{}: {inner}", f()))
            }
            other => DicomGuardError::Internal(format!("{}: {other}", f())),
        })
    }
}
