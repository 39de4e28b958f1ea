//! Orchestration of a full conformance run.

use datafusion::prelude::SessionContext;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

use super::grouped::{GroupIterator, GroupedMetadata};
use super::rates::{RateAnalyzer, RateOptions};
use super::statistics::StatisticsAggregator;
use crate::config::EvaluatorConfig;
use crate::error::{DicomGuardError, Result};
use crate::logging::{truncate_field, LogConfig};
use crate::report::{ConformanceReport, RunMetadata};
use crate::sources::loader::{load_catalog, load_metadata};
use crate::sources::vr_merge::merge_value_representation;
use crate::types::{MetadataRecord, StandardCatalog, TagRateResult};
use crate::{log_data_op, log_group, perf_debug};

/// Type alias for progress callback function.
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Runs rate computation and aggregation for one configuration.
///
/// Both operating modes go through the same engine; the
/// `value_standardization` flag of [`EvaluatorConfig`] selects between them.
///
/// # Example
///
/// ```rust,no_run
/// use dicom_guard::analyzers::ConformanceEngine;
/// use dicom_guard::config::EvaluatorConfig;
/// use dicom_guard::sources::{CsvSource, TableSource};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> dicom_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// CsvSource::new("standard.csv").register(&ctx, "standard").await?;
/// CsvSource::new("metadata.csv").register(&ctx, "metadata").await?;
///
/// let engine = ConformanceEngine::new(EvaluatorConfig::default())?
///     .on_progress(|progress| println!("{:.0}%", progress * 100.0));
/// let report = engine.run(&ctx).await?;
/// println!("{} rate rows", report.rates.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConformanceEngine {
    config: EvaluatorConfig,
    log_config: LogConfig,
    on_progress: Option<ProgressCallback>,
    iod_index: usize,
}

impl fmt::Debug for ConformanceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConformanceEngine")
            .field("config", &self.config)
            .field("log_config", &self.log_config)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl ConformanceEngine {
    /// Creates an engine, rejecting invalid configurations.
    pub fn new(config: EvaluatorConfig) -> Result<Self> {
        config.validate()?;
        let iod_index = config.iod_group_index().ok_or_else(|| {
            DicomGuardError::configuration("grouping columns must include the IOD column")
        })?;
        Ok(Self {
            config,
            log_config: LogConfig::default(),
            on_progress: None,
            iod_index,
        })
    }

    /// Sets the logging configuration.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Sets a progress callback, called after each group with a fraction in `[0, 1]`.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    fn rate_options(&self) -> RateOptions {
        RateOptions {
            value_standardization: self.config.value_standardization,
            coded_string_vr: self.config.coded_string_vr.clone(),
        }
    }

    /// Computes per-group rates over records already in memory.
    ///
    /// Records must carry their VR when standardization is scored; see
    /// [`merge_value_representation`] for filling it from the catalog.
    #[instrument(skip_all, fields(
        catalog_entries = catalog.len(),
        records = records.len(),
        value_standardization = self.config.value_standardization
    ))]
    pub fn analyze_rates(
        &self,
        catalog: &StandardCatalog,
        records: &[MetadataRecord],
    ) -> (Vec<TagRateResult>, GroupedMetadata) {
        let analyzer = RateAnalyzer::new(catalog, self.rate_options());
        let iterator = GroupIterator::new(self.config.group_columns.clone(), self.iod_index);

        let (rates, grouping) = iterator.evaluate(&analyzer, records, |done, total| {
            log_group!(self.log_config, done, total, "group evaluated");
            if let Some(callback) = &self.on_progress {
                callback(done as f64 / total as f64);
            }
        });

        if grouping.total_groups == 0 {
            if let Some(callback) = &self.on_progress {
                callback(1.0);
            }
        }
        if grouping.skipped_records > 0 {
            tracing::warn!(
                skipped = grouping.skipped_records,
                "records without a grouping value were left out"
            );
        }
        (rates, grouping)
    }

    /// Computes per-group rates and their cross-group statistics.
    pub fn analyze_rates_with_stats(
        &self,
        catalog: &StandardCatalog,
        records: &[MetadataRecord],
    ) -> ConformanceReport {
        let mut metadata = RunMetadata {
            value_standardization: self.config.value_standardization,
            catalog_entries: catalog.len(),
            metadata_records: records.len(),
            ..Default::default()
        };
        metadata.record_start();

        let (rates, grouping) = self.analyze_rates(catalog, records);
        metadata.apply_grouping(&grouping);
        let statistics =
            StatisticsAggregator::for_mode(self.config.value_standardization).aggregate(&rates);

        metadata.record_end();
        ConformanceReport {
            rates,
            statistics,
            metadata,
        }
    }

    /// Loads both tables from the context and runs a full evaluation.
    ///
    /// When the metadata table has no VR column, VRs are filled in from the
    /// catalog before scoring.
    #[instrument(skip(self, ctx), fields(
        catalog_table = %self.config.catalog_table,
        metadata_table = %self.config.metadata_table
    ))]
    pub async fn run(&self, ctx: &SessionContext) -> Result<ConformanceReport> {
        let started = chrono::Utc::now();

        let catalog = load_catalog(ctx, &self.config).await?;
        let loaded = load_metadata(ctx, &self.config).await?;
        log_data_op!(
            self.log_config,
            catalog_entries = catalog.len(),
            metadata_records = loaded.records.len(),
            has_vr = loaded.has_vr,
            group_columns = %truncate_field(
                &self.config.group_columns.join(", "),
                self.log_config.max_field_length
            ),
            "tables loaded"
        );

        let mut records = loaded.records;
        let vr_merged = if loaded.has_vr {
            0
        } else {
            let merged = merge_value_representation(&mut records, &catalog);
            perf_debug!(self.log_config, merged, "value representations filled from catalog");
            merged
        };

        let mut report = self.analyze_rates_with_stats(&catalog, &records);
        report.metadata.start_time = Some(started);
        report.metadata.vr_merged = vr_merged;

        if self.log_config.log_summary {
            let seconds = report
                .metadata
                .duration()
                .map(|d| d.num_milliseconds() as f64 / 1000.0)
                .unwrap_or_default();
            info!(
                groups = report.metadata.total_groups,
                evaluated = report.metadata.evaluated_groups,
                rate_rows = report.rates.len(),
                statistics = report.statistics.len(),
                "Conformance run completed in {seconds:.2}s"
            );
        }
        Ok(report)
    }
}
