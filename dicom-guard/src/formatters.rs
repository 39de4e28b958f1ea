//! Text renderings of a conformance report.
//!
//! Reports can be rendered as JSON for other tools, as plain text for a
//! console, or as Markdown tables for documentation.
//!
//! # Examples
//!
//! ```rust
//! use dicom_guard::formatters::{HumanFormatter, ReportFormatter};
//! use dicom_guard::report::ConformanceReport;
//!
//! let report = ConformanceReport::default();
//! let text = HumanFormatter::new().format(&report).unwrap();
//! assert!(text.contains("Conformance Report"));
//! ```

use serde::Serialize;
use std::fmt::Write;

use crate::error::{DicomGuardError, Result};
use crate::report::{ConformanceReport, RunMetadata};
use crate::types::{MetricStatistic, TagRateResult};

/// Configuration options for formatting reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the run summary
    pub include_summary: bool,
    /// Include the cross-group statistics table
    pub include_statistics: bool,
    /// Include per-group rate rows
    pub include_rates: bool,
    /// Maximum number of rows per table (`None` for all)
    pub max_rows: Option<usize>,
    /// Whether to use ANSI colors (human formatter)
    pub use_colors: bool,
    /// Whether to include run timestamps
    pub include_timestamps: bool,
    /// Decimal places for rates and statistics
    pub precision: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_statistics: true,
            include_rates: false,
            max_rows: None,
            use_colors: true,
            include_timestamps: true,
            precision: 3,
        }
    }
}

impl FormatterConfig {
    /// Summary only.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_statistics: false,
            include_rates: false,
            max_rows: Some(0),
            use_colors: false,
            include_timestamps: false,
            precision: 3,
        }
    }

    /// Everything, including every per-group row.
    pub fn detailed() -> Self {
        Self {
            include_rates: true,
            ..Self::default()
        }
    }

    /// Uncolored and bounded, for CI logs.
    pub fn ci() -> Self {
        Self {
            max_rows: Some(50),
            use_colors: false,
            ..Self::default()
        }
    }

    pub fn with_statistics(mut self, include: bool) -> Self {
        self.include_statistics = include;
        self
    }

    pub fn with_rates(mut self, include: bool) -> Self {
        self.include_rates = include;
        self
    }

    pub fn with_max_rows(mut self, max: usize) -> Self {
        self.max_rows = Some(max);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    fn limit<'a, T>(&self, rows: &'a [T]) -> &'a [T] {
        match self.max_rows {
            Some(max) => &rows[..max.min(rows.len())],
            None => rows,
        }
    }
}

/// Renders a [`ConformanceReport`] as text.
pub trait ReportFormatter {
    /// Formats a report with the formatter's own configuration.
    fn format(&self, report: &ConformanceReport) -> Result<String>;

    /// Formats a report with the given configuration.
    fn format_with_config(
        &self,
        report: &ConformanceReport,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

/// JSON output for programmatic consumption.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a RunMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    statistics: Option<&'a [MetricStatistic]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rates: Option<&'a [TagRateResult]>,
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ConformanceReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ConformanceReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let view = JsonReport {
            metadata: config.include_summary.then_some(&report.metadata),
            statistics: config
                .include_statistics
                .then(|| config.limit(&report.statistics)),
            rates: config.include_rates.then(|| config.limit(&report.rates)),
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&view)
        } else {
            serde_json::to_string(&view)
        };
        json.map_err(|e| DicomGuardError::Serialization(format!("Failed to serialize report: {e}")))
    }
}

/// Plain-text output for consoles and logs.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn render(report: &ConformanceReport, config: &FormatterConfig, out: &mut String) -> std::fmt::Result {
        let title = "DICOM Conformance Report";
        if config.use_colors {
            writeln!(out, "\x1b[1m{title}\x1b[0m")?;
        } else {
            writeln!(out, "{title}")?;
        }

        if config.include_summary {
            let meta = &report.metadata;
            writeln!(out)?;
            writeln!(out, "Summary:")?;
            writeln!(out, "   Grouping: {}", meta.group_columns.join(", "))?;
            writeln!(
                out,
                "   Value standardization: {}",
                if meta.value_standardization { "scored" } else { "off" }
            )?;
            writeln!(out, "   Catalog entries: {}", meta.catalog_entries)?;
            writeln!(out, "   Metadata records: {}", meta.metadata_records)?;
            writeln!(
                out,
                "   Groups: {} ({} evaluated)",
                meta.total_groups, meta.evaluated_groups
            )?;
            if meta.skipped_records > 0 {
                writeln!(out, "   Skipped records: {}", meta.skipped_records)?;
            }
            if meta.vr_merged > 0 {
                writeln!(out, "   VR filled from catalog: {}", meta.vr_merged)?;
            }
            if config.include_timestamps {
                if let Some(start) = meta.start_time {
                    writeln!(out, "   Started: {start}")?;
                }
                if let Some(duration) = meta.duration() {
                    writeln!(out, "   Duration: {}ms", duration.num_milliseconds())?;
                }
            }
        }

        let p = config.precision;
        if config.include_statistics && !report.statistics.is_empty() {
            writeln!(out)?;
            writeln!(out, "Statistics across groups:")?;
            for stat in config.limit(&report.statistics) {
                writeln!(
                    out,
                    "   {} {} ({}) {}: mean={} std={} cv%={} min={} max={} n={}",
                    stat.iod,
                    stat.tag,
                    stat.attribute_name,
                    stat.metric,
                    number(stat.mean, p),
                    number(stat.sample_std, p),
                    number(stat.coefficient_of_variation_percent, p),
                    number(stat.min, p),
                    number(stat.max, p),
                    stat.group_count
                )?;
            }
            write_remaining(out, report.statistics.len(), config.limit(&report.statistics).len())?;
        }

        if config.include_rates && !report.rates.is_empty() {
            writeln!(out)?;
            writeln!(out, "Rates per group:")?;
            for row in config.limit(&report.rates) {
                write!(
                    out,
                    "   {} {}: tag={} value={}",
                    row.group,
                    row.tag,
                    number(Some(row.tag_existence_rate), p),
                    number(Some(row.value_existence_rate), p)
                )?;
                if report.metadata.value_standardization {
                    write!(
                        out,
                        " standardized={} diversity={}",
                        number(row.value_standardization_rate, p),
                        row.value_diversity.unwrap_or_default()
                    )?;
                }
                writeln!(out, " files={}", row.total_files)?;
            }
            write_remaining(out, report.rates.len(), config.limit(&report.rates).len())?;
        }

        writeln!(out)
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ConformanceReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ConformanceReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        Self::render(report, config, &mut output).map_err(render_error)?;
        Ok(output)
    }
}

/// Markdown tables for documentation.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            heading_level: 2,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level for the output.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn render(&self, report: &ConformanceReport, config: &FormatterConfig, out: &mut String) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);
        let sub = "#".repeat((self.heading_level + 1).min(6) as usize);
        let p = config.precision;

        writeln!(out, "{h} DICOM Conformance Report")?;

        if config.include_summary {
            let meta = &report.metadata;
            writeln!(out)?;
            writeln!(out, "| Item | Value |")?;
            writeln!(out, "|------|-------|")?;
            writeln!(out, "| Grouping | {} |", meta.group_columns.join(", "))?;
            writeln!(out, "| Value standardization | {} |", meta.value_standardization)?;
            writeln!(out, "| Groups | {} |", meta.total_groups)?;
            writeln!(out, "| Evaluated groups | {} |", meta.evaluated_groups)?;
            writeln!(out, "| Skipped records | {} |", meta.skipped_records)?;
            if config.include_timestamps {
                if let Some(start) = meta.start_time {
                    writeln!(out, "| Started | {start} |")?;
                }
            }
        }

        if config.include_statistics && !report.statistics.is_empty() {
            writeln!(out)?;
            writeln!(out, "{sub} Statistics")?;
            writeln!(out)?;
            writeln!(out, "| IOD | Tag | Attribute Name | Metric | Mean | Std | CV(%) | Min | Max | Range | n_groups |")?;
            writeln!(out, "|-----|-----|----------------|--------|------|-----|-------|-----|-----|-------|----------|")?;
            for stat in config.limit(&report.statistics) {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                    escape(&stat.iod),
                    escape(&stat.tag),
                    escape(&stat.attribute_name),
                    stat.metric,
                    number(stat.mean, p),
                    number(stat.sample_std, p),
                    number(stat.coefficient_of_variation_percent, p),
                    number(stat.min, p),
                    number(stat.max, p),
                    number(stat.range, p),
                    stat.group_count
                )?;
            }
        }

        if config.include_rates && !report.rates.is_empty() {
            writeln!(out)?;
            writeln!(out, "{sub} Rates")?;
            writeln!(out)?;
            writeln!(out, "| Group | Tag | Attribute Name | Tag Existence | Value Existence | Standardization |")?;
            writeln!(out, "|-------|-----|----------------|---------------|-----------------|-----------------|")?;
            for row in config.limit(&report.rates) {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} | {} |",
                    escape(&row.group.to_string()),
                    escape(&row.tag),
                    escape(&row.attribute_name),
                    number(Some(row.tag_existence_rate), p),
                    number(Some(row.value_existence_rate), p),
                    number(row.value_standardization_rate, p)
                )?;
            }
        }

        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &ConformanceReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ConformanceReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let mut output = String::new();
        self.render(report, config, &mut output).map_err(render_error)?;
        Ok(output)
    }
}

/// Undefined values render as `-`.
fn number(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:.precision$}"),
        _ => "-".to_string(),
    }
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn write_remaining(out: &mut String, total: usize, shown: usize) -> std::fmt::Result {
    if total > shown {
        writeln!(out, "   ... and {} more rows", total - shown)?;
    }
    Ok(())
}

fn render_error(e: std::fmt::Error) -> DicomGuardError {
    DicomGuardError::Internal(format!("Failed to render report: {e}"))
}
