//! Fills in missing value representations from the standard catalog.
//!
//! Metadata exports do not always carry a VR column. The VR of an attribute
//! is fixed by its tag, so the catalog can supply it. When the catalog lists
//! different VRs for the same tag under different IODs, the first one in
//! catalog order wins.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::types::{MetadataRecord, StandardCatalog};

/// Maps each tag to the first non-null VR the catalog gives it.
pub fn first_vr_by_tag(catalog: &StandardCatalog) -> HashMap<&str, &str> {
    let mut by_tag: HashMap<&str, &str> = HashMap::new();
    for entry in catalog.entries() {
        let Some(vr) = entry.value_representation.as_deref() else {
            continue;
        };
        match by_tag.get(entry.tag.as_str()) {
            None => {
                by_tag.insert(entry.tag.as_str(), vr);
            }
            Some(&kept) if kept != vr => {
                warn!(tag = %entry.tag, kept, ignored = vr, iod = %entry.iod, "conflicting VR in catalog");
            }
            Some(_) => {}
        }
    }
    by_tag
}

/// Sets the VR of every record that lacks one, returning how many were set.
///
/// Records whose tag the catalog does not know keep a missing VR.
pub fn merge_value_representation(records: &mut [MetadataRecord], catalog: &StandardCatalog) -> usize {
    let by_tag = first_vr_by_tag(catalog);
    let mut merged = 0;
    for record in records
        .iter_mut()
        .filter(|record| record.value_representation.is_none())
    {
        if let Some(vr) = by_tag.get(record.tag.as_str()) {
            record.value_representation = Some((*vr).to_string());
            merged += 1;
        }
    }
    debug!(merged, tags = by_tag.len(), "value representations merged");
    merged
}
