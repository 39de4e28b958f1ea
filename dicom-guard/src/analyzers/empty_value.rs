//! Classification of raw metadata values as present or empty.

use serde::{Deserialize, Serialize};

/// The literal written by exporters for an attribute with zero values.
pub const EMPTY_LIST_MARKER: &str = "[]";

/// Why a raw value counts as empty.
///
/// A value whose trimmed text is empty is either [`EmptyReason::ZeroLength`]
/// or [`EmptyReason::WhitespaceOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptyReason {
    /// No value was recorded at all.
    Missing,
    /// The value has zero length.
    ZeroLength,
    /// The value consists only of whitespace.
    WhitespaceOnly,
    /// The trimmed value is the empty-list marker `[]`.
    EmptyListMarker,
}

/// Classifies a raw value, returning the emptiness condition it meets.
pub fn classify_value(raw: Option<&str>) -> Option<EmptyReason> {
    let Some(raw) = raw else {
        return Some(EmptyReason::Missing);
    };
    let trimmed = raw.trim();
    if raw.is_empty() {
        Some(EmptyReason::ZeroLength)
    } else if trimmed.is_empty() {
        Some(EmptyReason::WhitespaceOnly)
    } else if trimmed == EMPTY_LIST_MARKER {
        Some(EmptyReason::EmptyListMarker)
    } else {
        None
    }
}

/// Returns true when the raw value counts as empty.
pub fn is_empty_value(raw: Option<&str>) -> bool {
    classify_value(raw).is_some()
}
