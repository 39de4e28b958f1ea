//! Extraction of the legal textual values listed by the standard for an attribute.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

use super::literal::{parse_literal, Literal};

/// Key of the enumerated values list in a standard terms mapping.
pub const ENUMERATED_VALUES: &str = "Enumerated Values";
/// Key of the defined terms list in a standard terms mapping.
pub const DEFINED_TERMS: &str = "Defined Terms";

/// Term lists of a coded-string attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermLists {
    #[serde(rename = "Enumerated Values", default)]
    pub enumerated_values: Vec<String>,
    #[serde(rename = "Defined Terms", default)]
    pub defined_terms: Vec<String>,
}

/// Standard terms as they appear in a catalog row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StandardTerms {
    /// Already structured term lists.
    Structured(TermLists),
    /// Text encoding a mapping, e.g. `{'Defined Terms': ['A', 'B']}`.
    Encoded(String),
}

impl StandardTerms {
    /// Structured terms from enumerated values and defined terms.
    pub fn lists<E, D>(enumerated_values: E, defined_terms: D) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self::Structured(TermLists {
            enumerated_values: enumerated_values.into_iter().map(Into::into).collect(),
            defined_terms: defined_terms.into_iter().map(Into::into).collect(),
        })
    }

    /// Terms encoded as text.
    pub fn encoded(text: impl Into<String>) -> Self {
        Self::Encoded(text.into())
    }
}

/// Returns the union of enumerated values and defined terms.
///
/// Absent, unparseable or unexpectedly shaped definitions yield an empty set.
pub fn extract_valid_values(terms: Option<&StandardTerms>) -> HashSet<String> {
    match terms {
        None => HashSet::new(),
        Some(StandardTerms::Structured(lists)) => lists
            .enumerated_values
            .iter()
            .chain(&lists.defined_terms)
            .cloned()
            .collect(),
        Some(StandardTerms::Encoded(text)) => from_encoded(text),
    }
}

fn from_encoded(text: &str) -> HashSet<String> {
    let mut valid = HashSet::new();
    match parse_literal(text) {
        Ok(Literal::Dict(map)) => {
            for key in [ENUMERATED_VALUES, DEFINED_TERMS] {
                if let Some(Literal::List(items)) = map.get(key) {
                    valid.extend(items.iter().filter_map(Literal::as_term).map(str::to_string));
                }
            }
        }
        Ok(_) => trace!("standard terms are not a mapping"),
        Err(literal_err) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Object(map)) => {
                for key in [ENUMERATED_VALUES, DEFINED_TERMS] {
                    if let Some(serde_json::Value::Array(items)) = map.get(key) {
                        valid.extend(items.iter().filter_map(json_term));
                    }
                }
            }
            _ => trace!(error = %literal_err, "unreadable standard terms"),
        },
    }
    valid
}

fn json_term(value: &serde_json::Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_structured_union() {
        let terms = StandardTerms::lists(["YES", "NO"], ["MAYBE", "YES"]);
        assert_eq!(
            extract_valid_values(Some(&terms)),
            set(&["YES", "NO", "MAYBE"])
        );
    }

    #[test]
    fn test_quoted_dict_encoding() {
        let terms = StandardTerms::encoded(
            "{'Enumerated Values': ['ORIGINAL', 'DERIVED'], 'Defined Terms': ['AXIAL']}",
        );
        assert_eq!(
            extract_valid_values(Some(&terms)),
            set(&["ORIGINAL", "DERIVED", "AXIAL"])
        );
    }

    #[test]
    fn test_json_encoding_with_null_member() {
        let terms = StandardTerms::encoded(
            r#"{"Defined Terms": ["HEAD", "CHEST"], "Notes": null}"#,
        );
        assert_eq!(extract_valid_values(Some(&terms)), set(&["HEAD", "CHEST"]));
    }

    #[test]
    fn test_numeric_terms_are_not_legal_values() {
        let quoted = StandardTerms::encoded("{'Enumerated Values': ['00', 1, 2.5]}");
        assert_eq!(extract_valid_values(Some(&quoted)), set(&["00"]));

        let json = StandardTerms::encoded(r#"{"Defined Terms": ["A", 3]}"#);
        assert_eq!(extract_valid_values(Some(&json)), set(&["A"]));
    }

    #[test]
    fn test_malformed_or_absent_terms_are_empty() {
        assert!(extract_valid_values(None).is_empty());
        for text in [
            "",
            "nan",
            "{'Defined Terms': ",
            "['A', 'B']",
            "{'Other': ['A']}",
            "{'Defined Terms': 'A'}",
        ] {
            let terms = StandardTerms::encoded(text);
            assert!(
                extract_valid_values(Some(&terms)).is_empty(),
                "{text:?} should yield no terms"
            );
        }
    }

    #[test]
    fn test_deserializes_both_shapes() {
        let structured: StandardTerms =
            serde_json::from_str(r#"{"Enumerated Values": ["A"]}"#).unwrap();
        assert_eq!(structured, StandardTerms::lists(["A"], Vec::<String>::new()));

        let encoded: StandardTerms = serde_json::from_str(r#""{'Defined Terms': ['B']}""#).unwrap();
        assert_eq!(extract_valid_values(Some(&encoded)), set(&["B"]));
    }
}
