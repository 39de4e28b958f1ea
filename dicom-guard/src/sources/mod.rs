//! Input table sources and typed row loading.
//!
//! The standard catalog and the metadata population are plain tables. A
//! [`TableSource`] registers one of them in a DataFusion [`SessionContext`];
//! the [`loader`] then reads typed rows back out of the context.

use async_trait::async_trait;
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::file_format::csv::CsvFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{DicomGuardError, Result};

pub mod loader;
pub mod vr_merge;

/// A table that can be registered with a DataFusion context.
///
/// # Examples
///
/// ```rust,no_run
/// use dicom_guard::sources::{CsvSource, TableSource};
/// use datafusion::prelude::SessionContext;
///
/// # async fn example() -> dicom_guard::error::Result<()> {
/// let ctx = SessionContext::new();
/// CsvSource::new("standard.csv").register(&ctx, "standard").await?;
/// CsvSource::from_glob("exports/site_*.csv")?.register(&ctx, "metadata").await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TableSource: Debug + Send + Sync {
    /// Registers this source under `table_name`.
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Options for reading CSV files.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the files have a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Read every column as text instead of the inferred type
    pub text_columns: bool,
    /// Schema to use (if None, will be inferred)
    pub schema: Option<SchemaRef>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            text_columns: true,
            schema: None,
        }
    }
}

/// One or more CSV files read as a single table.
#[derive(Debug, Clone)]
pub struct CsvSource {
    paths: Vec<String>,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a source from a single file path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            paths: vec![path.into()],
            options: CsvOptions::default(),
        }
    }

    /// Creates a source from several files sharing one header layout.
    pub fn from_paths(paths: Vec<String>) -> Result<Self> {
        if paths.is_empty() {
            return Err(DicomGuardError::configuration(
                "At least one path must be provided",
            ));
        }
        Ok(Self {
            paths,
            options: CsvOptions::default(),
        })
    }

    /// Creates a source from every file matching a glob pattern.
    pub fn from_glob(pattern: impl Into<String>) -> Result<Self> {
        let paths = expand_globs(&[pattern.into()])?;
        Self::from_paths(paths)
    }

    /// Sets custom options.
    pub fn with_options(mut self, options: CsvOptions) -> Self {
        self.options = options;
        self
    }

    /// Paths read by this source.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    fn extension(&self) -> String {
        std::path::Path::new(&self.paths[0])
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_else(|| ".csv".to_string())
    }
}

#[async_trait]
impl TableSource for CsvSource {
    #[instrument(skip(self, ctx), fields(
        table.name = %table_name,
        source.type = "csv",
        source.files = self.paths.len()
    ))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        info!(source.paths = ?self.paths, "Registering CSV table");

        let format = CsvFormat::default()
            .with_has_header(self.options.has_header)
            .with_delimiter(self.options.delimiter)
            .with_quote(self.options.quote);
        let listing_options =
            ListingOptions::new(Arc::new(format)).with_file_extension(self.extension());

        let urls = self
            .paths
            .iter()
            .map(ListingTableUrl::parse)
            .collect::<datafusion::error::Result<Vec<_>>>()?;

        let schema = match &self.options.schema {
            Some(schema) => schema.clone(),
            None => {
                let inferred = listing_options.infer_schema(&ctx.state(), &urls[0]).await?;
                if self.options.text_columns {
                    text_schema(&inferred)
                } else {
                    inferred
                }
            }
        };

        let config = ListingTableConfig::new_with_multi_paths(urls)
            .with_listing_options(listing_options)
            .with_schema(schema);
        let table = ListingTable::try_new(config)?;
        ctx.register_table(table_name, Arc::new(table))?;

        debug!("CSV table registered");
        Ok(())
    }

    fn description(&self) -> String {
        if self.paths.len() == 1 {
            format!("CSV file: {}", self.paths[0])
        } else {
            format!("CSV files: {} files", self.paths.len())
        }
    }
}

/// Record batches already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl MemorySource {
    /// Creates a source from batches sharing one schema.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Creates a source from a single batch.
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }
}

#[async_trait]
impl TableSource for MemorySource {
    #[instrument(skip(self, ctx), fields(table.name = %table_name, source.type = "memory"))]
    async fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        let table = MemTable::try_new(self.schema.clone(), vec![self.batches.clone()])?;
        ctx.register_table(table_name, Arc::new(table))?;
        debug!(batches = self.batches.len(), "memory table registered");
        Ok(())
    }

    fn description(&self) -> String {
        let rows: usize = self.batches.iter().map(RecordBatch::num_rows).sum();
        format!("In-memory table: {rows} rows")
    }
}

/// Same field names as `schema`, every field nullable text.
fn text_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| Field::new(field.name(), DataType::Utf8, true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Expands glob patterns into file paths.
pub(crate) fn expand_globs(patterns: &[String]) -> Result<Vec<String>> {
    use glob::glob;

    let mut paths = Vec::new();
    for pattern in patterns {
        let matches = glob(pattern).map_err(|e| {
            DicomGuardError::configuration(format!("Invalid glob pattern '{pattern}': {e}"))
        })?;

        for entry in matches {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                unreadable_path(&path, e)
            })?;
            if path.is_file() {
                if let Some(path_str) = path.to_str() {
                    paths.push(path_str.to_string());
                }
            }
        }
    }

    if paths.is_empty() {
        return Err(DicomGuardError::data_source(
            "file",
            "No files found matching glob patterns",
        ));
    }

    paths.sort();
    Ok(paths)
}

/// A path that could not be read, keeping the failure as the cause.
fn unreadable_path<E>(path: &std::path::Path, cause: E) -> DicomGuardError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = format!("Cannot read {}", path.display());
    DicomGuardError::data_source_with_source("file", message, Box::new(cause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::StringArray;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_text_schema() {
        let schema = Schema::new(vec![
            Field::new("Tag", DataType::Utf8, false),
            Field::new("Value", DataType::Int64, true),
        ]);
        let text = text_schema(&schema);
        assert!(text.fields().iter().all(|f| f.data_type() == &DataType::Utf8));
        assert!(text.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn test_expand_globs() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "b.csv", "a\n1\n");
        write_file(&dir, "a.csv", "a\n1\n");
        write_file(&dir, "notes.txt", "x");

        let pattern = format!("{}/*.csv", dir.path().display());
        let paths = expand_globs(&[pattern]).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("a.csv"));

        let missing = format!("{}/*.parquet", dir.path().display());
        assert!(expand_globs(&[missing]).is_err());
    }

    #[test]
    fn test_unreadable_path_keeps_cause() {
        use std::error::Error;

        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = unreadable_path(std::path::Path::new("/exports/site_a"), cause);

        assert_eq!(err.to_string(), "file source failed: Cannot read /exports/site_a");
        let source = err.source().expect("cause kept");
        assert_eq!(source.to_string(), "denied");
    }

    #[test]
    fn test_from_paths_requires_one_path() {
        assert!(CsvSource::from_paths(vec![]).is_err());
        assert_eq!(CsvSource::new("x.csv").description(), "CSV file: x.csv");
    }

    #[tokio::test]
    async fn test_csv_numeric_looking_values_load_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "metadata.csv", "Tag,Value\nT1,1\nT1,2\n");

        let ctx = SessionContext::new();
        CsvSource::new(path).register(&ctx, "metadata").await.unwrap();

        let batches = ctx.table("metadata").await.unwrap().collect().await.unwrap();
        let values = batches[0]
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("text column");
        assert_eq!(values.value(0), "1");
    }

    #[tokio::test]
    async fn test_memory_source() {
        let schema = Arc::new(Schema::new(vec![Field::new("Tag", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec!["T1", "T2"]))],
        )
        .unwrap();

        let source = MemorySource::from_batch(batch);
        assert_eq!(source.description(), "In-memory table: 2 rows");

        let ctx = SessionContext::new();
        source.register(&ctx, "standard").await.unwrap();
        let count = ctx.table("standard").await.unwrap().count().await.unwrap();
        assert_eq!(count, 2);
    }
}
