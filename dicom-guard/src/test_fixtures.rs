//! Small catalog and metadata tables for conformance tests.
//!
//! The population has one IOD `X` and two studies:
//!
//! - `(X, S1)`: files `f1`..`f4`; `T1` on `f1`..`f3` with values `A`, `B`, `C`,
//!   `T2` on `f4` with value `A`
//! - `(X, S2)`: files `f5`, `f6`; `T1` absent, `T2` on `f5` as `['A', 'C']` and on
//!   `f6` as the empty-list marker
//!
//! Both catalog tags are coded strings with legal terms `A` and `B`.

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

use crate::error::Result;

/// Catalog table name used by the fixtures.
pub const CATALOG_TABLE: &str = "standard";

/// Metadata table name used by the fixtures.
pub const METADATA_TABLE: &str = "metadata";

const TERMS: &str = "{'Enumerated Values': ['A'], 'Defined Terms': ['B']}";

/// Builds an all-text batch from named columns.
pub fn text_batch(columns: &[(&str, Vec<Option<&str>>)]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// The two-entry standard catalog.
pub fn scenario_catalog_batch() -> Result<RecordBatch> {
    text_batch(&[
        ("Tag", vec![Some("T1"), Some("T2")]),
        ("IOD", vec![Some("X"), Some("X")]),
        ("Attribute Name", vec![Some("Modality"), Some("Body Part")]),
        ("VR", vec![Some("CS"), Some("CS")]),
        ("Standard Terms", vec![Some(TERMS), Some(TERMS)]),
    ])
}

/// The six-file metadata population, with or without a VR column.
pub fn scenario_metadata_batch(with_vr: bool) -> Result<RecordBatch> {
    let rows: [(&str, &str, &str, &str); 6] = [
        ("S1", "f1", "T1", "A"),
        ("S1", "f2", "T1", "B"),
        ("S1", "f3", "T1", "C"),
        ("S1", "f4", "T2", "A"),
        ("S2", "f5", "T2", "['A', 'C']"),
        ("S2", "f6", "T2", "[]"),
    ];
    let column = |pick: fn(&(&'static str, &'static str, &'static str, &'static str)) -> &'static str| {
        rows.iter().map(|row| Some(pick(row))).collect::<Vec<_>>()
    };

    let mut columns = vec![
        ("IOD", vec![Some("X"); rows.len()]),
        ("study_global", column(|r| r.0)),
        ("file_global", column(|r| r.1)),
        ("Tag", column(|r| r.2)),
        ("Value", column(|r| r.3)),
    ];
    if with_vr {
        columns.push(("VR", vec![Some("CS"); rows.len()]));
    }
    text_batch(&columns)
}

/// A context with the scenario catalog and metadata registered.
pub fn create_scenario_context(with_vr: bool) -> Result<SessionContext> {
    let ctx = SessionContext::new();
    ctx.register_batch(CATALOG_TABLE, scenario_catalog_batch()?)?;
    ctx.register_batch(METADATA_TABLE, scenario_metadata_batch(with_vr)?)?;
    Ok(ctx)
}
