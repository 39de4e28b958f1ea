//! # dicom-guard - DICOM metadata conformance rates
//!
//! dicom-guard measures how closely a population of DICOM files follows the
//! attribute standard. Given a catalog of the attributes each information
//! object definition (IOD) expects, and the attributes actually found in each
//! file, it computes per group of files:
//!
//! - **Tag existence rate**: the share of files carrying the attribute
//! - **Value existence rate**: the share of those files with a non-empty value
//! - **Value standardization rate**: how well coded-string values match the
//!   standard's enumerated values and defined terms, with partial credit for
//!   multi-valued attributes
//! - **Value diversity**: the number of distinct raw values
//!
//! and then summarizes every rate across groups (mean, sample standard
//! deviation, coefficient of variation, min, max, range).
//!
//! Input tables are read through DataFusion, so they can come from CSV files,
//! in-memory Arrow batches, or anything else a `SessionContext` can register.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dicom_guard::prelude::*;
//! use dicom_guard::formatters::HumanFormatter;
//! use datafusion::prelude::SessionContext;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let ctx = SessionContext::new();
//! CsvSource::new("standard.csv").register(&ctx, "standard").await?;
//! CsvSource::from_glob("exports/*.csv")?.register(&ctx, "metadata").await?;
//!
//! let config = EvaluatorConfig::default().with_group_columns(["IOD", "Manufacturer"]);
//! let report = ConformanceEngine::new(config)?.run(&ctx).await?;
//!
//! println!("{}", HumanFormatter::new().format(&report)?);
//!
//! // Both result tables are queryable with SQL afterwards.
//! dicom_guard::output::register_report(&ctx, &report)?;
//! ctx.sql("SELECT * FROM conformance_statistics WHERE \"Mean\" < 0.5")
//!     .await?
//!     .show()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`analyzers`**: empty-value detection, value scoring, per-group rates,
//!   grouping, cross-group statistics and the [`ConformanceEngine`](analyzers::ConformanceEngine)
//! - **`sources`**: table registration and typed row loading
//! - **`output`**: Arrow record batches of the result tables
//! - **`formatters`**: JSON, console and Markdown renderings
//! - **`config`**, **`error`**, **`logging`**: ambient plumbing

pub mod analyzers;
pub mod config;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod output;
pub mod prelude;
pub mod report;
pub mod sources;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
