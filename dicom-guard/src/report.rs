//! The result of one conformance run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analyzers::grouped::GroupedMetadata;
use crate::types::{GroupKey, Metric, MetricStatistic, TagRateResult};

/// Metadata about a conformance run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Timestamp when the run started.
    pub start_time: Option<DateTime<Utc>>,

    /// Timestamp when the run completed.
    pub end_time: Option<DateTime<Utc>>,

    /// Whether value standardization was scored.
    pub value_standardization: bool,

    /// Grouping columns, in order.
    pub group_columns: Vec<String>,

    pub total_groups: usize,
    pub evaluated_groups: usize,

    /// Records with a missing grouping value.
    pub skipped_records: usize,

    pub catalog_entries: usize,
    pub metadata_records: usize,

    /// Records whose VR was filled in from the catalog.
    pub vr_merged: usize,
}

impl RunMetadata {
    /// Records the start time of the run.
    pub fn record_start(&mut self) {
        self.start_time = Some(Utc::now());
    }

    /// Records the end time of the run.
    pub fn record_end(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Returns the duration of the run if both timestamps are recorded.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Copies the partitioning counters of a grouped evaluation.
    pub fn apply_grouping(&mut self, grouping: &GroupedMetadata) {
        self.group_columns = grouping.group_columns.clone();
        self.total_groups = grouping.total_groups;
        self.evaluated_groups = grouping.evaluated_groups;
        self.skipped_records = grouping.skipped_records;
    }
}

/// Per-group rate rows, their cross-group statistics, and run metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub rates: Vec<TagRateResult>,
    pub statistics: Vec<MetricStatistic>,
    pub metadata: RunMetadata,
}

impl ConformanceReport {
    /// Rate rows of one group.
    pub fn rates_for_group<'a>(&'a self, group: &'a GroupKey) -> impl Iterator<Item = &'a TagRateResult> + 'a {
        self.rates.iter().filter(move |row| &row.group == group)
    }

    /// Rate rows of one `(iod, tag)` pair across every group.
    pub fn rates_for_tag<'a>(&'a self, iod: &'a str, tag: &'a str) -> impl Iterator<Item = &'a TagRateResult> + 'a {
        self.rates
            .iter()
            .filter(move |row| row.iod == iod && row.tag == tag)
    }

    /// The statistic of one metric for one `(iod, tag)` pair.
    pub fn statistic(&self, iod: &str, tag: &str, metric: Metric) -> Option<&MetricStatistic> {
        self.statistics
            .iter()
            .find(|s| s.iod == iod && s.tag == tag && s.metric == metric)
    }

    /// Number of distinct groups with at least one rate row.
    pub fn group_count(&self) -> usize {
        let mut groups: Vec<&GroupKey> = self.rates.iter().map(|row| &row.group).collect();
        groups.sort();
        groups.dedup();
        groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
