//! Partitioning of the metadata population into analysis groups.
//!
//! Records are grouped by the distinct combinations of the configured
//! grouping columns. Groups are visited in key order, so output row order is
//! stable across runs even though callers must not rely on it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::rates::RateAnalyzer;
use crate::types::{GroupKey, MetadataRecord, TagRateResult};

/// Records partitioned by group key.
pub type GroupedRecords<'r> = BTreeMap<GroupKey, Vec<&'r MetadataRecord>>;

/// Counters describing one partitioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedMetadata {
    /// Grouping columns used.
    pub group_columns: Vec<String>,

    /// Number of distinct groups found.
    pub total_groups: usize,

    /// Number of groups that produced rate rows.
    pub evaluated_groups: usize,

    /// Records left out because a grouping value was missing.
    pub skipped_records: usize,
}

/// Partitions records by grouping columns and runs a [`RateAnalyzer`] per group.
#[derive(Debug, Clone)]
pub struct GroupIterator {
    columns: Vec<String>,
    iod_index: usize,
}

impl GroupIterator {
    /// Creates an iterator over the given grouping columns.
    ///
    /// `iod_index` is the position of the IOD column within `columns`.
    pub fn new(columns: Vec<String>, iod_index: usize) -> Self {
        debug_assert!(iod_index < columns.len());
        Self { columns, iod_index }
    }

    /// Grouping columns in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Partitions records into groups.
    ///
    /// Records missing any grouping value belong to no group; their count is
    /// returned alongside the partition.
    pub fn partition<'r, I>(&self, records: I) -> (GroupedRecords<'r>, usize)
    where
        I: IntoIterator<Item = &'r MetadataRecord>,
    {
        let mut groups: GroupedRecords<'r> = BTreeMap::new();
        let mut skipped = 0;

        for record in records {
            let pairs: Option<Vec<(String, String)>> = self
                .columns
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    record
                        .group_values
                        .get(idx)
                        .and_then(Option::as_ref)
                        .map(|value| (column.clone(), value.clone()))
                })
                .collect();

            match pairs {
                Some(pairs) => groups.entry(GroupKey::new(pairs)).or_default().push(record),
                None => skipped += 1,
            }
        }

        (groups, skipped)
    }

    /// Evaluates every group and concatenates the rows.
    ///
    /// `on_group` is called after each group with the number of groups done
    /// and the total.
    #[instrument(skip_all, fields(group_columns = ?self.columns))]
    pub fn evaluate<'r, I, F>(
        &self,
        analyzer: &RateAnalyzer<'_>,
        records: I,
        mut on_group: F,
    ) -> (Vec<TagRateResult>, GroupedMetadata)
    where
        I: IntoIterator<Item = &'r MetadataRecord>,
        F: FnMut(usize, usize),
    {
        let (groups, skipped_records) = self.partition(records);
        let total_groups = groups.len();
        let mut rows = Vec::new();
        let mut evaluated_groups = 0;

        for (done, (key, members)) in groups.iter().enumerate() {
            let iod = &key.pairs()[self.iod_index].1;
            let group_rows = analyzer.analyze_group(key, iod, members);
            if group_rows.is_empty() {
                debug!(group = %key, "group produced no rows");
            } else {
                evaluated_groups += 1;
                rows.extend(group_rows);
            }
            on_group(done + 1, total_groups);
        }

        let metadata = GroupedMetadata {
            group_columns: self.columns.clone(),
            total_groups,
            evaluated_groups,
            skipped_records,
        };
        (rows, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::rates::RateOptions;
    use crate::types::{StandardCatalog, StandardEntry};

    fn iterator() -> GroupIterator {
        GroupIterator::new(vec!["IOD".to_string(), "study_global".to_string()], 0)
    }

    #[test]
    fn test_partition_by_key() {
        let mut orphan = MetadataRecord::new(["X", "S1"], "f9", "T1");
        orphan.group_values[1] = None;
        let records = vec![
            MetadataRecord::new(["X", "S2"], "f3", "T1"),
            MetadataRecord::new(["X", "S1"], "f1", "T1"),
            MetadataRecord::new(["X", "S1"], "f2", "T1"),
            orphan,
        ];

        let (groups, skipped) = iterator().partition(&records);
        assert_eq!(skipped, 1);
        let keys: Vec<Vec<&str>> = groups.keys().map(GroupKey::values).collect();
        assert_eq!(keys, vec![vec!["X", "S1"], vec!["X", "S2"]]);
        assert_eq!(groups.values().map(Vec::len).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn test_evaluate_concatenates_groups() {
        let catalog = StandardCatalog::new(vec![
            StandardEntry::new("X", "T1", "One", "CS"),
            StandardEntry::new("X", "T2", "Two", "CS"),
        ]);
        let analyzer = RateAnalyzer::new(&catalog, RateOptions::default());
        let records = vec![
            MetadataRecord::new(["X", "S1"], "f1", "T1").with_value("A"),
            MetadataRecord::new(["X", "S2"], "f2", "T2").with_value("B"),
            MetadataRecord::new(["Z", "S3"], "f3", "T1").with_value("C"),
        ];

        let mut progress = Vec::new();
        let (rows, metadata) =
            iterator().evaluate(&analyzer, &records, |done, total| progress.push((done, total)));

        // IOD "Z" has no catalog entries, so its group yields nothing.
        assert_eq!(rows.len(), 4);
        assert_eq!(metadata.total_groups, 3);
        assert_eq!(metadata.evaluated_groups, 2);
        assert_eq!(progress.last(), Some(&(3, 3)));
    }
}
