//! Cross-group descriptive statistics of per-group rates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::types::{Metric, MetricStatistic, TagRateResult};

/// Descriptive statistics of one metric over the groups that define it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of values summarized.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1 denominator).
    pub sample_std: Option<f64>,
    /// `sample_std / mean * 100`, undefined when the mean is zero.
    pub coefficient_of_variation_percent: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
}

impl DescriptiveStats {
    /// Summarizes the given values; NaN values are ignored.
    pub fn from_values(values: &[f64]) -> Self {
        let values: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let count = values.len();
        if count == 0 {
            return Self::default();
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let sample_std = (count > 1).then(|| {
            let squared_deviations: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (squared_deviations / (count - 1) as f64).sqrt()
        });
        let coefficient_of_variation_percent = match sample_std {
            Some(std) if mean != 0.0 => Some(std / mean * 100.0),
            _ => None,
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            count,
            mean: Some(mean),
            sample_std,
            coefficient_of_variation_percent,
            min: Some(min),
            max: Some(max),
            range: Some(max - min),
        }
    }
}

/// Re-groups per-group rate rows by `(iod, tag)` and summarizes each metric.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    metrics: Vec<Metric>,
}

impl StatisticsAggregator {
    /// Creates an aggregator for the given metrics.
    pub fn new(metrics: impl Into<Vec<Metric>>) -> Self {
        Self {
            metrics: metrics.into(),
        }
    }

    /// Creates an aggregator for every metric of an operating mode.
    pub fn for_mode(value_standardization: bool) -> Self {
        Self::new(Metric::for_mode(value_standardization))
    }

    /// Metrics this aggregator summarizes.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Produces one statistic per `(iod, tag, metric)`, ordered by IOD then tag.
    ///
    /// Undefined values are left out of the summary, but `group_count` is the
    /// number of groups with a row for the attribute.
    #[instrument(skip_all, fields(rows = rates.len(), metrics = self.metrics.len()))]
    pub fn aggregate(&self, rates: &[TagRateResult]) -> Vec<MetricStatistic> {
        let mut by_attribute: BTreeMap<(&str, &str), Vec<&TagRateResult>> = BTreeMap::new();
        for row in rates {
            by_attribute
                .entry((row.iod.as_str(), row.tag.as_str()))
                .or_default()
                .push(row);
        }
        debug!(attributes = by_attribute.len(), "aggregating rates");

        let mut statistics = Vec::with_capacity(by_attribute.len() * self.metrics.len());
        for ((iod, tag), rows) in &by_attribute {
            let attribute_name = rows
                .first()
                .map(|row| row.attribute_name.clone())
                .unwrap_or_default();

            for &metric in &self.metrics {
                let values: Vec<f64> = rows.iter().filter_map(|row| row.metric(metric)).collect();
                let stats = DescriptiveStats::from_values(&values);
                statistics.push(MetricStatistic {
                    iod: iod.to_string(),
                    tag: tag.to_string(),
                    attribute_name: attribute_name.clone(),
                    metric,
                    mean: stats.mean,
                    sample_std: stats.sample_std,
                    coefficient_of_variation_percent: stats.coefficient_of_variation_percent,
                    min: stats.min,
                    max: stats.max,
                    range: stats.range,
                    group_count: rows.len(),
                });
            }
        }
        statistics
    }
}
