//! Arrow renderings of the rate and statistics tables.
//!
//! Column names follow the tables exported by earlier evaluator versions so
//! downstream notebooks and plotting code keep working. Undefined values are
//! nulls.

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::report::ConformanceReport;
use crate::types::{MetricStatistic, TagRateResult};

/// Default table name for the per-group rate table.
pub const RATES_TABLE: &str = "conformance_rates";

/// Default table name for the aggregated statistics table.
pub const STATISTICS_TABLE: &str = "conformance_statistics";

/// Builds the per-group rate table.
///
/// Grouping columns come first, in the given order. The VR-aware columns
/// `files_with_cs_vr`, `value_standardization_rate` and `value_diversity`
/// are present only when `value_standardization` is set.
pub fn rates_to_record_batch(
    rates: &[TagRateResult],
    group_columns: &[String],
    value_standardization: bool,
) -> Result<RecordBatch> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for column in group_columns {
        fields.push(Field::new(column, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(
            rates
                .iter()
                .map(|row| row.group.get(column))
                .collect::<Vec<Option<&str>>>(),
        )));
    }

    let mut text = |name: &str, values: Vec<&str>| {
        fields.push(Field::new(name, DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from(values)));
    };
    text("Tag", rates.iter().map(|r| r.tag.as_str()).collect());
    text(
        "Attribute Name",
        rates.iter().map(|r| r.attribute_name.as_str()).collect(),
    );

    let counts: [(&str, fn(&TagRateResult) -> usize); 3] = [
        ("total_files", |r| r.total_files),
        ("files_with_tag", |r| r.files_with_tag),
        ("files_with_value", |r| r.files_with_value),
    ];
    for (name, get) in counts {
        fields.push(Field::new(name, DataType::UInt64, false));
        columns.push(Arc::new(UInt64Array::from_iter_values(
            rates.iter().map(|r| get(r) as u64),
        )));
    }

    if value_standardization {
        fields.push(Field::new("files_with_cs_vr", DataType::UInt64, true));
        columns.push(Arc::new(UInt64Array::from(
            rates
                .iter()
                .map(|r| r.files_with_cs_vr.map(|n| n as u64))
                .collect::<Vec<_>>(),
        )));
    }

    fields.push(Field::new("tag_existence_rate", DataType::Float64, false));
    columns.push(Arc::new(Float64Array::from_iter_values(
        rates.iter().map(|r| r.tag_existence_rate),
    )));
    fields.push(Field::new("value_existence_rate", DataType::Float64, false));
    columns.push(Arc::new(Float64Array::from_iter_values(
        rates.iter().map(|r| r.value_existence_rate),
    )));

    if value_standardization {
        fields.push(Field::new("value_standardization_rate", DataType::Float64, true));
        columns.push(Arc::new(float_column(
            rates.iter().map(|r| r.value_standardization_rate),
        )));
        fields.push(Field::new("value_diversity", DataType::UInt64, true));
        columns.push(Arc::new(UInt64Array::from(
            rates
                .iter()
                .map(|r| r.value_diversity.map(|n| n as u64))
                .collect::<Vec<_>>(),
        )));
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Builds the aggregated statistics table, one row per `(IOD, Tag, Metric)`.
pub fn statistics_to_record_batch(statistics: &[MetricStatistic]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("IOD", DataType::Utf8, false),
        Field::new("Tag", DataType::Utf8, false),
        Field::new("Attribute Name", DataType::Utf8, false),
        Field::new("Metric", DataType::Utf8, false),
        Field::new("Mean", DataType::Float64, true),
        Field::new("Std", DataType::Float64, true),
        Field::new("CV(%)", DataType::Float64, true),
        Field::new("Min", DataType::Float64, true),
        Field::new("Max", DataType::Float64, true),
        Field::new("Range", DataType::Float64, true),
        Field::new("n_groups", DataType::UInt64, false),
    ]));

    let text = |get: fn(&MetricStatistic) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(statistics.iter().map(get).collect::<Vec<_>>()))
    };
    let float = |get: fn(&MetricStatistic) -> Option<f64>| -> ArrayRef {
        Arc::new(float_column(statistics.iter().map(get)))
    };

    let columns = vec![
        text(|s| s.iod.as_str()),
        text(|s| s.tag.as_str()),
        text(|s| s.attribute_name.as_str()),
        text(|s| s.metric.as_str()),
        float(|s| s.mean),
        float(|s| s.sample_std),
        float(|s| s.coefficient_of_variation_percent),
        float(|s| s.min),
        float(|s| s.max),
        float(|s| s.range),
        Arc::new(UInt64Array::from_iter_values(
            statistics.iter().map(|s| s.group_count as u64),
        )) as ArrayRef,
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Registers both tables of a report under [`RATES_TABLE`] and
/// [`STATISTICS_TABLE`], replacing earlier registrations.
pub fn register_report(ctx: &SessionContext, report: &ConformanceReport) -> Result<()> {
    register_report_as(ctx, report, RATES_TABLE, STATISTICS_TABLE)
}

/// Registers both tables of a report under the given names.
#[instrument(skip(ctx, report), fields(rates = report.rates.len(), statistics = report.statistics.len()))]
pub fn register_report_as(
    ctx: &SessionContext,
    report: &ConformanceReport,
    rates_table: &str,
    statistics_table: &str,
) -> Result<()> {
    let rates = rates_to_record_batch(
        &report.rates,
        &report.metadata.group_columns,
        report.metadata.value_standardization,
    )?;
    let statistics = statistics_to_record_batch(&report.statistics)?;

    for (name, batch) in [(rates_table, rates), (statistics_table, statistics)] {
        ctx.deregister_table(name)?;
        ctx.register_batch(name, batch)?;
    }
    debug!("report tables registered");
    Ok(())
}

fn float_column(values: impl Iterator<Item = Option<f64>>) -> Float64Array {
    values.map(|v| v.filter(|x| !x.is_nan())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RunMetadata;
    use crate::types::{GroupKey, Metric};
    use arrow::array::Array;

    fn rate(study: &str, standardization: Option<f64>) -> TagRateResult {
        TagRateResult {
            group: GroupKey::new(vec![
                ("IOD".to_string(), "CT".to_string()),
                ("study_global".to_string(), study.to_string()),
            ]),
            iod: "CT".to_string(),
            tag: "T1".to_string(),
            attribute_name: "Modality".to_string(),
            total_files: 4,
            files_with_tag: 2,
            files_with_value: 2,
            files_with_cs_vr: Some(2),
            tag_existence_rate: 0.5,
            value_existence_rate: 1.0,
            value_standardization_rate: standardization,
            value_diversity: Some(1),
        }
    }

    fn group_columns() -> Vec<String> {
        vec!["IOD".to_string(), "study_global".to_string()]
    }

    #[test]
    fn test_rates_batch_with_standardization() {
        let rates = vec![rate("S1", Some(0.5)), rate("S2", None)];
        let batch = rates_to_record_batch(&rates, &group_columns(), true).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 12);
        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "IOD");
        assert_eq!(schema.field(2).name(), "Tag");

        let idx = schema.index_of("value_standardization_rate").unwrap();
        let column = batch.column(idx);
        assert_eq!(column.null_count(), 1);
        assert!(column.is_null(1));
    }

    #[test]
    fn test_rates_batch_without_standardization() {
        let mut row = rate("S1", None);
        row.files_with_cs_vr = None;
        row.value_diversity = None;
        let batch = rates_to_record_batch(&[row], &group_columns(), false).unwrap();

        assert_eq!(batch.num_columns(), 9);
        assert!(batch.schema().index_of("value_diversity").is_err());
        assert!(batch.schema().index_of("files_with_cs_vr").is_err());
    }

    #[test]
    fn test_statistics_batch_nulls() {
        let stat = MetricStatistic {
            iod: "CT".to_string(),
            tag: "T1".to_string(),
            attribute_name: "Modality".to_string(),
            metric: Metric::ValueStandardizationRate,
            mean: Some(0.0),
            sample_std: Some(0.0),
            coefficient_of_variation_percent: None,
            min: Some(0.0),
            max: Some(0.0),
            range: Some(0.0),
            group_count: 3,
        };
        let batch = statistics_to_record_batch(&[stat]).unwrap();

        let cv = batch.column(batch.schema().index_of("CV(%)").unwrap());
        assert!(cv.is_null(0));
        let metric = batch
            .column(3)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(metric.value(0), "value_standardization_rate");
    }

    #[tokio::test]
    async fn test_register_report_replaces_tables() {
        let report = ConformanceReport {
            rates: vec![rate("S1", Some(1.0))],
            statistics: Vec::new(),
            metadata: RunMetadata {
                value_standardization: true,
                group_columns: group_columns(),
                ..Default::default()
            },
        };

        let ctx = SessionContext::new();
        register_report(&ctx, &report).unwrap();
        register_report(&ctx, &report).unwrap();

        let rows = ctx.table(RATES_TABLE).await.unwrap().count().await.unwrap();
        assert_eq!(rows, 1);
        let stats = ctx.table(STATISTICS_TABLE).await.unwrap().count().await.unwrap();
        assert_eq!(stats, 0);
    }
}
