//! Conformance analyzers for DICOM metadata.
//!
//! The pipeline runs per group of files:
//!
//! - **Empty values** (`empty_value`): decides whether a raw value counts as present
//! - **Value scoring** (`literal`, `scoring`): reads list-encoded values and scores
//!   them against legal terms with partial credit
//! - **Legal terms** (`valid_terms`): enumerated values and defined terms of a catalog entry
//! - **Rates** (`rates`): tag existence, value existence, standardization and diversity
//! - **Grouping** (`grouped`): partitions the population by the grouping columns
//! - **Statistics** (`statistics`): mean, spread and range of each rate across groups
//!
//! [`ConformanceEngine`] wires these together for a full run.
//!
//! ## Example Usage
//!
//! ```rust
//! use dicom_guard::analyzers::ConformanceEngine;
//! use dicom_guard::config::EvaluatorConfig;
//! use dicom_guard::types::{MetadataRecord, StandardCatalog, StandardEntry};
//!
//! let catalog = StandardCatalog::new(vec![StandardEntry::new("CT", "(0008,0060)", "Modality", "CS")]);
//! let records = vec![
//!     MetadataRecord::new(["CT", "S1"], "f1", "(0008,0060)").with_value("CT").with_vr("CS"),
//!     MetadataRecord::new(["CT", "S2"], "f2", "(0008,0061)").with_value("CT").with_vr("CS"),
//! ];
//!
//! let engine = ConformanceEngine::new(EvaluatorConfig::default()).unwrap();
//! let report = engine.analyze_rates_with_stats(&catalog, &records);
//! assert_eq!(report.rates.len(), 2);
//! ```

pub mod empty_value;
pub mod engine;
pub mod grouped;
pub mod literal;
pub mod rates;
pub mod scoring;
pub mod statistics;
pub mod valid_terms;

pub use empty_value::{classify_value, is_empty_value, EmptyReason};
pub use engine::{ConformanceEngine, ProgressCallback};
pub use grouped::{GroupIterator, GroupedMetadata};
pub use rates::{RateAnalyzer, RateOptions};
pub use scoring::{parse_value_list, score_value, StandardizationScore};
pub use statistics::{DescriptiveStats, StatisticsAggregator};
pub use valid_terms::{extract_valid_values, StandardTerms};
