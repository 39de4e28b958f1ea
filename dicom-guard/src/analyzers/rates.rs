//! Per-group tag existence, value existence and value standardization rates.

use std::collections::{HashMap, HashSet};
use tracing::{instrument, trace};

use super::empty_value::is_empty_value;
use super::scoring::score_records;
use super::valid_terms::extract_valid_values;
use crate::types::{GroupKey, MetadataRecord, StandardCatalog, StandardEntry, TagRateResult};

/// Options shared by every group evaluated by a [`RateAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateOptions {
    /// Whether to compute the VR-aware metrics.
    pub value_standardization: bool,
    /// VR code whose values are scored against legal terms.
    pub coded_string_vr: String,
}

impl Default for RateOptions {
    fn default() -> Self {
        Self {
            value_standardization: true,
            coded_string_vr: "CS".to_string(),
        }
    }
}

/// Computes conformance rates for the records of one group.
///
/// # Example
///
/// ```rust
/// use dicom_guard::analyzers::rates::{RateAnalyzer, RateOptions};
/// use dicom_guard::types::{GroupKey, MetadataRecord, StandardCatalog, StandardEntry};
///
/// let catalog = StandardCatalog::new(vec![StandardEntry::new("CT", "T1", "Modality", "CS")]);
/// let analyzer = RateAnalyzer::new(&catalog, RateOptions::default());
///
/// let records = vec![MetadataRecord::new(["CT"], "f1", "T1").with_value("CT").with_vr("CS")];
/// let refs: Vec<&MetadataRecord> = records.iter().collect();
/// let key = GroupKey::new(vec![("IOD".into(), "CT".into())]);
///
/// let rows = analyzer.analyze_group(&key, "CT", &refs);
/// assert_eq!(rows[0].tag_existence_rate, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct RateAnalyzer<'a> {
    catalog: &'a StandardCatalog,
    options: RateOptions,
}

impl<'a> RateAnalyzer<'a> {
    /// Creates an analyzer over the given catalog.
    pub fn new(catalog: &'a StandardCatalog, options: RateOptions) -> Self {
        Self { catalog, options }
    }

    /// Returns the analyzer options.
    pub fn options(&self) -> &RateOptions {
        &self.options
    }

    /// Evaluates every catalog entry of `iod` against one group's records.
    ///
    /// Returns no rows when the group contains no files.
    #[instrument(skip(self, group, records), fields(group = %group, records = records.len()))]
    pub fn analyze_group(
        &self,
        group: &GroupKey,
        iod: &str,
        records: &[&MetadataRecord],
    ) -> Vec<TagRateResult> {
        let total_files = distinct_files(records.iter().copied());
        if total_files == 0 {
            trace!("group has no files");
            return Vec::new();
        }

        let mut by_tag: HashMap<&str, Vec<&MetadataRecord>> = HashMap::new();
        for &record in records {
            by_tag.entry(record.tag.as_str()).or_default().push(record);
        }

        self.catalog
            .entries_for_iod(iod)
            .map(|entry| {
                let tagged = by_tag.get(entry.tag.as_str()).map_or(&[][..], Vec::as_slice);
                self.analyze_tag(group, iod, entry, total_files, tagged)
            })
            .collect()
    }

    fn analyze_tag(
        &self,
        group: &GroupKey,
        iod: &str,
        entry: &StandardEntry,
        total_files: usize,
        tagged: &[&MetadataRecord],
    ) -> TagRateResult {
        let files_with_tag = distinct_files(tagged.iter().copied());
        let with_value: Vec<&MetadataRecord> = tagged
            .iter()
            .copied()
            .filter(|record| !is_empty_value(record.value.as_deref()))
            .collect();
        let files_with_value = distinct_files(with_value.iter().copied());

        let value_existence_rate = if files_with_tag > 0 {
            files_with_value as f64 / files_with_tag as f64
        } else {
            0.0
        };

        let (files_with_cs_vr, value_standardization_rate, value_diversity) =
            if self.options.value_standardization {
                let (cs_files, rate) = self.standardization(entry, &with_value, files_with_value);
                let diversity = with_value
                    .iter()
                    .filter_map(|record| record.value.as_deref())
                    .collect::<HashSet<_>>()
                    .len();
                (Some(cs_files), rate, Some(diversity))
            } else {
                (None, None, None)
            };

        TagRateResult {
            group: group.clone(),
            iod: iod.to_string(),
            tag: entry.tag.clone(),
            attribute_name: entry.attribute_name.clone(),
            total_files,
            files_with_tag,
            files_with_value,
            files_with_cs_vr,
            tag_existence_rate: files_with_tag as f64 / total_files as f64,
            value_existence_rate,
            value_standardization_rate,
            value_diversity,
        }
    }

    /// Returns the coded-string file count and the standardization rate.
    ///
    /// The rate is only defined when some file carries a value and at least
    /// one of those values has the coded-string VR.
    fn standardization(
        &self,
        entry: &StandardEntry,
        with_value: &[&MetadataRecord],
        files_with_value: usize,
    ) -> (usize, Option<f64>) {
        if files_with_value == 0 {
            return (0, None);
        }
        let coded_string_vr = self.options.coded_string_vr.as_str();
        let cs_files = distinct_files(
            with_value
                .iter()
                .copied()
                .filter(|record| record.value_representation.as_deref() == Some(coded_string_vr)),
        );
        if cs_files == 0 {
            return (0, None);
        }

        let valid_values = extract_valid_values(entry.standard_terms.as_ref());
        let score_sum = score_records(with_value.iter().copied(), &valid_values);
        (cs_files, Some(score_sum / files_with_value as f64))
    }
}

/// Counts distinct file identifiers; records without one are not counted.
pub fn distinct_files<'r, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'r MetadataRecord>,
{
    records
        .into_iter()
        .filter_map(|record| record.file_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}
