//! Prelude for commonly used types and traits in dicom-guard.

pub use crate::analyzers::ConformanceEngine;
pub use crate::config::{ColumnMapping, EvaluatorConfig};
pub use crate::error::{DicomGuardError, ErrorContext, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::report::{ConformanceReport, RunMetadata};
pub use crate::sources::{CsvSource, MemorySource, TableSource};
pub use crate::types::{
    GroupKey, MetadataRecord, Metric, MetricStatistic, StandardCatalog, StandardEntry,
    TagRateResult,
};
