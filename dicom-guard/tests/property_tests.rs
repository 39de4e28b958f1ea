//! Property-based tests for the rate engine and the aggregator.
//!
//! Populations are generated as `(study, file, tag, value)` rows over a small
//! alphabet so that groups share files, tags repeat within a file, and empty
//! values of every kind show up regularly.

use dicom_guard::analyzers::statistics::DescriptiveStats;
use dicom_guard::analyzers::{score_value, ConformanceEngine, StandardTerms};
use dicom_guard::config::EvaluatorConfig;
use dicom_guard::types::{MetadataRecord, Metric, StandardCatalog, StandardEntry};
use proptest::prelude::*;
use std::collections::HashSet;

fn catalog() -> StandardCatalog {
    let terms = StandardTerms::lists(["A", "B"], ["C"]);
    StandardCatalog::new(vec![
        StandardEntry::new("X", "T1", "One", "CS").with_terms(terms.clone()),
        StandardEntry::new("X", "T2", "Two", "CS").with_terms(terms),
        StandardEntry::new("X", "T3", "Three", "LO"),
    ])
}

fn value_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("  ".to_string())),
        Just(Some("[]".to_string())),
        Just(Some("['A', 'Z']".to_string())),
        Just(Some("['A', 'B']".to_string())),
        "[A-D]".prop_map(Some),
    ]
}

fn record_strategy() -> impl Strategy<Value = MetadataRecord> {
    (
        prop::sample::select(vec!["S1", "S2", "S3"]),
        0u8..6,
        prop::sample::select(vec!["T1", "T2", "T3", "T9"]),
        value_strategy(),
        prop::sample::select(vec!["CS", "LO"]),
    )
        .prop_map(|(study, file, tag, value, vr)| {
            let mut record =
                MetadataRecord::new(["X", study], format!("{study}-f{file}"), tag).with_vr(vr);
            record.value = value;
            record
        })
}

fn in_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_rates_stay_in_unit_interval(records in prop::collection::vec(record_strategy(), 0..40)) {
        let engine = ConformanceEngine::new(EvaluatorConfig::default()).unwrap();
        let (rates, _) = engine.analyze_rates(&catalog(), &records);

        for row in &rates {
            prop_assert!(in_unit_interval(row.tag_existence_rate));
            prop_assert!(in_unit_interval(row.value_existence_rate));
            prop_assert!(row.files_with_value <= row.files_with_tag);
            prop_assert!(row.files_with_tag <= row.total_files);
            if let Some(rate) = row.value_standardization_rate {
                prop_assert!(in_unit_interval(rate), "standardization rate {} out of range", rate);
                prop_assert!(row.files_with_value > 0);
            }
        }
    }

    #[test]
    fn test_one_row_per_catalog_entry_per_group(records in prop::collection::vec(record_strategy(), 1..40)) {
        let engine = ConformanceEngine::new(EvaluatorConfig::default()).unwrap();
        let (rates, grouping) = engine.analyze_rates(&catalog(), &records);

        let studies: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.group_values[1].as_deref())
            .collect();
        prop_assert_eq!(grouping.total_groups, studies.len());
        prop_assert_eq!(rates.len(), studies.len() * 3);
    }

    #[test]
    fn test_analysis_is_idempotent(records in prop::collection::vec(record_strategy(), 0..30)) {
        let engine = ConformanceEngine::new(EvaluatorConfig::default()).unwrap();
        let first = engine.analyze_rates_with_stats(&catalog(), &records);
        let second = engine.analyze_rates_with_stats(&catalog(), &records);

        prop_assert_eq!(first.rates, second.rates);
        prop_assert_eq!(first.statistics, second.statistics);
    }

    #[test]
    fn test_statistics_are_consistent(records in prop::collection::vec(record_strategy(), 0..40)) {
        let engine = ConformanceEngine::new(EvaluatorConfig::default()).unwrap();
        let report = engine.analyze_rates_with_stats(&catalog(), &records);

        for stat in &report.statistics {
            match (stat.mean, stat.min, stat.max) {
                (Some(mean), Some(min), Some(max)) => {
                    prop_assert!(min <= mean + 1e-12 && mean <= max + 1e-12);
                    prop_assert_eq!(stat.range, Some(max - min));
                    prop_assert!(stat.group_count > 0);
                }
                _ => prop_assert!(stat.min.is_none() && stat.max.is_none()),
            }
            // Every evaluated group has a row for every catalog entry.
            prop_assert_eq!(stat.group_count, report.metadata.evaluated_groups);
            if stat.group_count < 2 {
                prop_assert!(stat.sample_std.is_none());
            }
            if stat.mean == Some(0.0) {
                prop_assert!(stat.coefficient_of_variation_percent.is_none());
            }
            if stat.metric != Metric::ValueDiversity {
                prop_assert!(stat.max.map_or(true, in_unit_interval));
            }
        }
    }

    #[test]
    fn test_cv_undefined_when_mean_is_zero(len in 0usize..20) {
        let stats = DescriptiveStats::from_values(&vec![0.0; len]);
        prop_assert!(stats.coefficient_of_variation_percent.is_none());
    }

    #[test]
    fn test_score_is_one_of_three_levels(raw in ".{0,24}") {
        let valid: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        let score = score_value(Some(raw.as_str()), &valid).as_f64();
        prop_assert!(score == 0.0 || score == 0.5 || score == 1.0);
    }
}
