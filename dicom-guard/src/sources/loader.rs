//! Reads typed catalog entries and metadata records out of a session context.
//!
//! Every used column is cast to text before reading, so tables whose columns
//! were inferred as numbers (file identifiers, numeric values) load the same
//! way as all-text tables.

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::prelude::{DataFrame, SessionContext};
use tracing::{debug, instrument, warn};

use crate::analyzers::valid_terms::StandardTerms;
use crate::config::EvaluatorConfig;
use crate::error::{DicomGuardError, Result};
use crate::types::{MetadataRecord, StandardCatalog, StandardEntry};

/// Metadata records together with what the table provided.
#[derive(Debug, Clone)]
pub struct LoadedMetadata {
    /// Records in table order.
    pub records: Vec<MetadataRecord>,
    /// Whether the table carried a VR column.
    pub has_vr: bool,
}

/// Loads the standard catalog table named in the configuration.
///
/// Rows without a tag or an IOD cannot be matched and are skipped.
#[instrument(skip_all, fields(table = %config.catalog_table))]
pub async fn load_catalog(ctx: &SessionContext, config: &EvaluatorConfig) -> Result<StandardCatalog> {
    let table = config.catalog_table.as_str();
    let columns = &config.columns;
    let df = ctx.table(table).await?;
    for column in [&columns.tag, &columns.iod, &columns.attribute_name] {
        require_column(&df, table, column)?;
    }
    let has_vr = has_column(&df, &columns.vr);
    let has_terms = has_column(&df, &columns.standard_terms);

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for batch in df.collect().await? {
        let tags = text_column(&batch, table, &columns.tag)?;
        let iods = text_column(&batch, table, &columns.iod)?;
        let names = text_column(&batch, table, &columns.attribute_name)?;
        let vrs = optional_text_column(&batch, table, &columns.vr, has_vr)?;
        let terms = optional_text_column(&batch, table, &columns.standard_terms, has_terms)?;

        for row in 0..batch.num_rows() {
            let (Some(tag), Some(iod)) = (cell(&tags, row), cell(&iods, row)) else {
                skipped += 1;
                continue;
            };
            entries.push(StandardEntry {
                iod,
                tag,
                attribute_name: cell(&names, row).unwrap_or_default(),
                value_representation: vrs.as_ref().and_then(|a| cell(a, row)),
                standard_terms: terms
                    .as_ref()
                    .and_then(|a| cell(a, row))
                    .map(StandardTerms::Encoded),
            });
        }
    }

    if skipped > 0 {
        warn!(skipped, "catalog rows without tag or IOD were skipped");
    }
    debug!(entries = entries.len(), "catalog loaded");
    Ok(StandardCatalog::new(entries))
}

/// Loads the metadata table named in the configuration.
#[instrument(skip_all, fields(table = %config.metadata_table))]
pub async fn load_metadata(ctx: &SessionContext, config: &EvaluatorConfig) -> Result<LoadedMetadata> {
    let table = config.metadata_table.as_str();
    let columns = &config.columns;
    let df = ctx.table(table).await?;
    for column in config
        .group_columns
        .iter()
        .chain([&columns.file_id, &columns.tag, &columns.value])
    {
        require_column(&df, table, column)?;
    }
    let has_vr = has_column(&df, &columns.vr);

    let mut records = Vec::new();
    for batch in df.collect().await? {
        let groups = config
            .group_columns
            .iter()
            .map(|column| text_column(&batch, table, column))
            .collect::<Result<Vec<_>>>()?;
        let files = text_column(&batch, table, &columns.file_id)?;
        let tags = text_column(&batch, table, &columns.tag)?;
        let values = text_column(&batch, table, &columns.value)?;
        let vrs = optional_text_column(&batch, table, &columns.vr, has_vr)?;

        for row in 0..batch.num_rows() {
            records.push(MetadataRecord {
                group_values: groups.iter().map(|array| cell(array, row)).collect(),
                file_id: cell(&files, row),
                // A missing tag matches no catalog entry but still names a file.
                tag: cell(&tags, row).unwrap_or_default(),
                value: cell(&values, row),
                value_representation: vrs.as_ref().and_then(|a| cell(a, row)),
            });
        }
    }

    debug!(records = records.len(), has_vr, "metadata loaded");
    Ok(LoadedMetadata { records, has_vr })
}

fn has_column(df: &DataFrame, column: &str) -> bool {
    df.schema().field_with_unqualified_name(column).is_ok()
}

fn require_column(df: &DataFrame, table: &str, column: &str) -> Result<()> {
    if has_column(df, column) {
        Ok(())
    } else {
        Err(DicomGuardError::column_not_found(table, column))
    }
}

fn text_column(batch: &RecordBatch, table: &str, column: &str) -> Result<StringArray> {
    let idx = batch
        .schema()
        .index_of(column)
        .map_err(|_| DicomGuardError::column_not_found(table, column))?;
    let array: ArrayRef = cast(batch.column(idx), &DataType::Utf8)?;
    array
        .as_any()
        .downcast_ref::<StringArray>()
        .cloned()
        .ok_or_else(|| DicomGuardError::TypeMismatch {
            expected: "Utf8".to_string(),
            found: array.data_type().to_string(),
        })
}

fn optional_text_column(
    batch: &RecordBatch,
    table: &str,
    column: &str,
    present: bool,
) -> Result<Option<StringArray>> {
    present
        .then(|| text_column(batch, table, column))
        .transpose()
}

fn cell(array: &StringArray, row: usize) -> Option<String> {
    (!array.is_null(row)).then(|| array.value(row).to_string())
}
