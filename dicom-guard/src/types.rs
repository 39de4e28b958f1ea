//! Data model shared by the loaders, the rate engine and the aggregator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::analyzers::valid_terms::StandardTerms;

/// One expected attribute for one information-object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardEntry {
    /// Information-object definition the attribute belongs to.
    pub iod: String,
    /// Attribute identifier, unique within an IOD.
    pub tag: String,
    /// Display name of the attribute.
    pub attribute_name: String,
    /// Value representation code, e.g. `CS`.
    pub value_representation: Option<String>,
    /// Enumerated values and defined terms, if the standard lists any.
    pub standard_terms: Option<StandardTerms>,
}

impl StandardEntry {
    /// Creates an entry without standard terms.
    pub fn new(
        iod: impl Into<String>,
        tag: impl Into<String>,
        attribute_name: impl Into<String>,
        value_representation: impl Into<String>,
    ) -> Self {
        Self {
            iod: iod.into(),
            tag: tag.into(),
            attribute_name: attribute_name.into(),
            value_representation: Some(value_representation.into()),
            standard_terms: None,
        }
    }

    /// Attaches standard terms to the entry.
    pub fn with_terms(mut self, terms: StandardTerms) -> Self {
        self.standard_terms = Some(terms);
        self
    }
}

/// The standard catalog with an index from IOD to its entries.
///
/// Entries keep catalog order; the index stores positions into that order.
#[derive(Debug, Clone, Default)]
pub struct StandardCatalog {
    entries: Vec<StandardEntry>,
    by_iod: HashMap<String, Vec<usize>>,
}

impl StandardCatalog {
    /// Builds a catalog from entries in catalog order.
    pub fn new(entries: Vec<StandardEntry>) -> Self {
        let mut by_iod: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_iod.entry(entry.iod.clone()).or_default().push(idx);
        }
        Self { entries, by_iod }
    }

    /// Returns every entry in catalog order.
    pub fn entries(&self) -> &[StandardEntry] {
        &self.entries
    }

    /// Returns the entries expected for the given IOD.
    pub fn entries_for_iod<'a>(&'a self, iod: &str) -> impl Iterator<Item = &'a StandardEntry> + 'a {
        self.by_iod
            .get(iod)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&idx| &self.entries[idx])
    }

    /// Number of entries in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<StandardEntry>> for StandardCatalog {
    fn from(entries: Vec<StandardEntry>) -> Self {
        Self::new(entries)
    }
}

/// One attribute occurrence on one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Values of the configured grouping columns, in configuration order.
    pub group_values: Vec<Option<String>>,
    /// Identifier of the file the record was read from.
    pub file_id: Option<String>,
    /// Attribute identifier.
    pub tag: String,
    /// Raw value text, possibly a list literal.
    pub value: Option<String>,
    /// Value representation, supplied or merged from the catalog.
    pub value_representation: Option<String>,
}

impl MetadataRecord {
    /// Creates a record with a present value and no VR.
    pub fn new<I, S>(group_values: I, file_id: impl Into<String>, tag: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_values: group_values.into_iter().map(|v| Some(v.into())).collect(),
            file_id: Some(file_id.into()),
            tag: tag.into(),
            value: None,
            value_representation: None,
        }
    }

    /// Sets the raw value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the value representation.
    pub fn with_vr(mut self, vr: impl Into<String>) -> Self {
        self.value_representation = Some(vr.into());
        self
    }
}

/// Ordered grouping column/value pairs identifying one analysis unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(Vec<(String, String)>);

impl GroupKey {
    /// Builds a key from column/value pairs in grouping order.
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// Looks up the value of a grouping column.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column/value pairs in grouping order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// Grouping values in grouping order.
    pub fn values(&self) -> Vec<&str> {
        self.0.iter().map(|(_, v)| v.as_str()).collect()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "({})", parts.join(", "))
    }
}

/// Per-group, per-tag conformance rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRateResult {
    pub group: GroupKey,
    pub iod: String,
    pub tag: String,
    pub attribute_name: String,
    pub total_files: usize,
    pub files_with_tag: usize,
    pub files_with_value: usize,
    /// Present only when value standardization scoring is enabled.
    pub files_with_cs_vr: Option<usize>,
    pub tag_existence_rate: f64,
    pub value_existence_rate: f64,
    /// `None` when undefined for this group, or when scoring is disabled.
    pub value_standardization_rate: Option<f64>,
    /// Present only when value standardization scoring is enabled.
    pub value_diversity: Option<usize>,
}

impl TagRateResult {
    /// Returns the value of a metric for this row, `None` when undefined.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::TagExistenceRate => Some(self.tag_existence_rate),
            Metric::ValueExistenceRate => Some(self.value_existence_rate),
            Metric::ValueStandardizationRate => self.value_standardization_rate,
            Metric::ValueDiversity => self.value_diversity.map(|d| d as f64),
        }
        .filter(|v| !v.is_nan())
    }
}

/// Metrics that can be summarized across groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TagExistenceRate,
    ValueExistenceRate,
    ValueStandardizationRate,
    ValueDiversity,
}

static ALL_METRICS: [Metric; 4] = [
    Metric::TagExistenceRate,
    Metric::ValueExistenceRate,
    Metric::ValueStandardizationRate,
    Metric::ValueDiversity,
];

impl Metric {
    /// Metrics produced by the given operating mode.
    pub fn for_mode(value_standardization: bool) -> &'static [Metric] {
        if value_standardization {
            &ALL_METRICS
        } else {
            &ALL_METRICS[..2]
        }
    }

    /// Column name of the metric in the rate table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::TagExistenceRate => "tag_existence_rate",
            Metric::ValueExistenceRate => "value_existence_rate",
            Metric::ValueStandardizationRate => "value_standardization_rate",
            Metric::ValueDiversity => "value_diversity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-group descriptive statistics for one `(iod, tag, metric)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistic {
    pub iod: String,
    pub tag: String,
    pub attribute_name: String,
    pub metric: Metric,
    pub mean: Option<f64>,
    pub sample_std: Option<f64>,
    pub coefficient_of_variation_percent: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub range: Option<f64>,
    pub group_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_index_keeps_order_per_iod() {
        let catalog = StandardCatalog::new(vec![
            StandardEntry::new("CT", "T1", "Modality", "CS"),
            StandardEntry::new("MR", "T1", "Modality", "CS"),
            StandardEntry::new("CT", "T2", "Body Part", "CS"),
        ]);

        let ct: Vec<&str> = catalog.entries_for_iod("CT").map(|e| e.tag.as_str()).collect();
        assert_eq!(ct, vec!["T1", "T2"]);
        assert_eq!(catalog.entries_for_iod("US").count(), 0);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_group_key_lookup_and_display() {
        let key = GroupKey::new(vec![
            ("IOD".to_string(), "CT".to_string()),
            ("study_global".to_string(), "S1".to_string()),
        ]);
        assert_eq!(key.get("IOD"), Some("CT"));
        assert_eq!(key.get("Manufacturer"), None);
        assert_eq!(key.values(), vec!["CT", "S1"]);
        assert_eq!(key.to_string(), "(IOD=CT, study_global=S1)");
    }

    #[test]
    fn test_metrics_per_mode() {
        assert_eq!(Metric::for_mode(true).len(), 4);
        assert_eq!(
            Metric::for_mode(false),
            &[Metric::TagExistenceRate, Metric::ValueExistenceRate]
        );
        assert_eq!(
            serde_json::to_string(&Metric::ValueDiversity).unwrap(),
            "\"value_diversity\""
        );
    }
}
