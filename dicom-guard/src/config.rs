//! Configuration for conformance evaluation runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{DicomGuardError, Result};

/// Column names of the standard catalog and the metadata population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Attribute identifier, present in both tables.
    pub tag: String,
    /// Information-object type, present in both tables.
    pub iod: String,
    /// Attribute display name in the catalog.
    pub attribute_name: String,
    /// Value representation code; optional in the metadata table.
    pub vr: String,
    /// Term lists in the catalog.
    pub standard_terms: String,
    /// Raw value text in the metadata table.
    pub value: String,
    /// Per-file identifier in the metadata table.
    pub file_id: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            tag: "Tag".to_string(),
            iod: "IOD".to_string(),
            attribute_name: "Attribute Name".to_string(),
            vr: "VR".to_string(),
            standard_terms: "Standard Terms".to_string(),
            value: "Value".to_string(),
            file_id: "file_global".to_string(),
        }
    }
}

/// Configuration for a [`ConformanceEngine`](crate::analyzers::ConformanceEngine).
///
/// # Examples
///
/// ```rust
/// use dicom_guard::config::EvaluatorConfig;
///
/// let config = EvaluatorConfig::default()
///     .with_group_columns(["IOD", "Manufacturer"])
///     .with_value_standardization(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Metadata columns defining one analysis group, in order.
    pub group_columns: Vec<String>,

    /// Column names of both input tables.
    pub columns: ColumnMapping,

    /// Whether to score values against the standard's legal terms.
    pub value_standardization: bool,

    /// VR code whose values are scored against legal terms.
    pub coded_string_vr: String,

    /// Name of the catalog table in the session context.
    pub catalog_table: String,

    /// Name of the metadata table in the session context.
    pub metadata_table: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            group_columns: vec!["IOD".to_string(), "study_global".to_string()],
            columns: ColumnMapping::default(),
            value_standardization: true,
            coded_string_vr: "CS".to_string(),
            catalog_table: "standard".to_string(),
            metadata_table: "metadata".to_string(),
        }
    }
}

impl EvaluatorConfig {
    /// Loads a configuration from JSON; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the grouping columns.
    pub fn with_group_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the column mapping.
    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the per-file identifier column.
    pub fn with_file_id_column(mut self, column: impl Into<String>) -> Self {
        self.columns.file_id = column.into();
        self
    }

    /// Enables or disables value standardization scoring.
    pub fn with_value_standardization(mut self, enabled: bool) -> Self {
        self.value_standardization = enabled;
        self
    }

    /// Sets the coded-string VR code.
    pub fn with_coded_string_vr(mut self, vr: impl Into<String>) -> Self {
        self.coded_string_vr = vr.into();
        self
    }

    /// Sets the table names used when reading from a session context.
    pub fn with_tables(mut self, catalog: impl Into<String>, metadata: impl Into<String>) -> Self {
        self.catalog_table = catalog.into();
        self.metadata_table = metadata.into();
        self
    }

    /// Position of the IOD column among the grouping columns.
    pub fn iod_group_index(&self) -> Option<usize> {
        self.group_columns
            .iter()
            .position(|column| *column == self.columns.iod)
    }

    /// Checks the configuration for contract violations.
    pub fn validate(&self) -> Result<()> {
        if self.group_columns.is_empty() {
            return Err(DicomGuardError::configuration(
                "at least one grouping column is required",
            ));
        }
        if self.iod_group_index().is_none() {
            return Err(DicomGuardError::configuration(format!(
                "grouping columns {:?} must include the IOD column '{}'",
                self.group_columns, self.columns.iod
            )));
        }
        let mut seen = HashSet::new();
        for column in &self.group_columns {
            if !seen.insert(column.as_str()) {
                return Err(DicomGuardError::configuration(format!(
                    "grouping column '{column}' is listed more than once"
                )));
            }
        }
        for (role, column) in [("file id", &self.columns.file_id), ("tag", &self.columns.tag)] {
            if seen.contains(column.as_str()) {
                return Err(DicomGuardError::configuration(format!(
                    "{role} column '{column}' cannot also be a grouping column"
                )));
            }
        }
        if self.coded_string_vr.trim().is_empty() {
            return Err(DicomGuardError::configuration(
                "coded-string VR code must not be blank",
            ));
        }
        Ok(())
    }
}
