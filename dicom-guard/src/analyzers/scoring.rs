//! Parsing of raw values into atomic values and scoring against valid terms.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::literal::{parse_literal, Literal};
use crate::types::MetadataRecord;

/// Standardization score of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardizationScore {
    /// No element matches a legal term, or there are no elements.
    NonConforming,
    /// Some but not all elements of a multi-valued attribute match.
    Partial,
    /// Every element matches a legal term.
    Conforming,
}

impl StandardizationScore {
    /// Numeric credit: 0, 0.5 or 1.
    pub fn as_f64(self) -> f64 {
        match self {
            StandardizationScore::NonConforming => 0.0,
            StandardizationScore::Partial => 0.5,
            StandardizationScore::Conforming => 1.0,
        }
    }
}

/// Splits a raw value into its atomic values.
///
/// A value that reads as a list literal yields its elements; any other
/// literal is wrapped as a single element. Unreadable text is kept whole as
/// one element unless it is blank.
pub fn parse_value_list(raw: Option<&str>) -> Vec<Literal> {
    let trimmed = raw.unwrap_or_default().trim();
    match parse_literal(trimmed) {
        Ok(Literal::List(items)) => items,
        Ok(other) => vec![other],
        Err(_) if trimmed.is_empty() => Vec::new(),
        Err(_) => vec![Literal::Str(trimmed.to_string())],
    }
}

/// Scores a raw value against the set of legal terms.
pub fn score_value(raw: Option<&str>, valid_values: &HashSet<String>) -> StandardizationScore {
    let elements = parse_value_list(raw);
    let is_valid = |element: &Literal| {
        element
            .as_term()
            .is_some_and(|term| valid_values.contains(term))
    };

    match elements.as_slice() {
        [] => StandardizationScore::NonConforming,
        [single] if is_valid(single) => StandardizationScore::Conforming,
        [_] => StandardizationScore::NonConforming,
        many => {
            let matched = many.iter().filter(|&e| is_valid(e)).count();
            if matched == many.len() {
                StandardizationScore::Conforming
            } else if matched > 0 {
                StandardizationScore::Partial
            } else {
                StandardizationScore::NonConforming
            }
        }
    }
}

/// Sums the scores of the first record per file.
///
/// Records without a file identifier are not scored.
pub fn score_records<'a, I>(records: I, valid_values: &HashSet<String>) -> f64
where
    I: IntoIterator<Item = &'a MetadataRecord>,
{
    let mut seen_files: HashSet<&str> = HashSet::new();
    records
        .into_iter()
        .filter(|&record| {
            record
                .file_id
                .as_deref()
                .is_some_and(|file| seen_files.insert(file))
        })
        .map(|record| score_value(record.value.as_deref(), valid_values).as_f64())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_value_list() {
        assert!(parse_value_list(None).is_empty());
        assert!(parse_value_list(Some("   ")).is_empty());
        assert!(parse_value_list(Some("[]")).is_empty());
        assert_eq!(
            parse_value_list(Some(" ORIGINAL ")),
            vec![Literal::Str("ORIGINAL".into())]
        );
        assert_eq!(
            parse_value_list(Some("'AXIAL'")),
            vec![Literal::Str("AXIAL".into())]
        );
        assert_eq!(parse_value_list(Some("['A', 'B']")).len(), 2);
    }

    #[test]
    fn test_single_value_scores() {
        let terms = valid(&["A", "B"]);
        assert_eq!(score_value(Some("A"), &terms), StandardizationScore::Conforming);
        assert_eq!(score_value(Some("['B']"), &terms), StandardizationScore::Conforming);
        assert_eq!(score_value(Some("C"), &terms), StandardizationScore::NonConforming);
        assert_eq!(score_value(Some(""), &terms), StandardizationScore::NonConforming);
        assert_eq!(score_value(Some("[[]]"), &terms), StandardizationScore::NonConforming);
    }

    #[test]
    fn test_multi_value_partial_credit() {
        let terms = valid(&["A", "B"]);
        assert_eq!(score_value(Some("['A','C']"), &terms).as_f64(), 0.5);
        assert_eq!(score_value(Some("['A','B']"), &terms).as_f64(), 1.0);
        assert_eq!(score_value(Some("['C','D']"), &terms).as_f64(), 0.0);
        assert_eq!(score_value(Some("['A', ['B']]"), &terms).as_f64(), 0.5);
    }

    #[test]
    fn test_numeric_elements_never_match_terms() {
        let terms = valid(&["1", "2"]);
        assert_eq!(score_value(Some("[1, 2]"), &terms), StandardizationScore::NonConforming);
        assert_eq!(score_value(Some("1"), &terms), StandardizationScore::NonConforming);
        assert_eq!(score_value(Some("['1', 2]"), &terms), StandardizationScore::Partial);
        assert_eq!(score_value(Some("['1', '2']"), &terms), StandardizationScore::Conforming);
    }

    #[test]
    fn test_zero_padded_codes() {
        // Lossy Image Compression style enumerated values.
        let terms = valid(&["00", "01"]);
        assert_eq!(score_value(Some("00"), &terms), StandardizationScore::NonConforming);
        // Not a valid literal, so kept whole as a string.
        assert_eq!(parse_value_list(Some("01")), vec![Literal::Str("01".into())]);
        assert_eq!(score_value(Some("01"), &terms), StandardizationScore::Conforming);
        assert_eq!(score_value(Some("['00', '01']"), &terms), StandardizationScore::Conforming);
    }

    #[test]
    fn test_empty_valid_set_never_conforms() {
        let none = HashSet::new();
        assert_eq!(score_value(Some("A"), &none), StandardizationScore::NonConforming);
    }

    #[test]
    fn test_score_records_first_per_file() {
        let terms = valid(&["A"]);
        let records = vec![
            MetadataRecord::new(["CT"], "f1", "T1").with_value("A"),
            MetadataRecord::new(["CT"], "f1", "T1").with_value("Z"),
            MetadataRecord::new(["CT"], "f2", "T1").with_value("['A', 'Z']"),
        ];
        assert_eq!(score_records(&records, &terms), 1.5);

        let mut orphan = MetadataRecord::new(["CT"], "f3", "T1").with_value("A");
        orphan.file_id = None;
        assert_eq!(score_records([&orphan], &terms), 0.0);
    }
}
