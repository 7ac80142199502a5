//! Field-by-field merging of attribute maps and entity collections.
//!
//! Merging is shallow: an attribute set by a higher layer replaces the lower
//! value entirely, lists and nested maps included.

use super::section::{DEFAULT_ID, Section};
use crate::types::AttrMap;
use indexmap::IndexMap;

/// Overwrite `base` with every key of `overlay`. Keys only in `base` are kept.
pub fn update_attributes(base: &mut AttrMap, overlay: &AttrMap) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Add the keys of `extra` that `base` does not set. Existing keys keep
/// their current value.
pub fn widen_attributes(base: &mut AttrMap, extra: &AttrMap) {
    for (key, value) in extra {
        if !base.contains_key(key) {
            base.insert(key.clone(), value.clone());
        }
    }
}

/// Fold one layer's entities of a collection kind into the running result.
///
/// The incoming default entity is merged first. Every other entity is then
/// updated (or created) and inherits the attributes it still leaves unset
/// from the result's current default.
pub fn merge_collection(
    result: &mut IndexMap<String, Section>,
    incoming: &IndexMap<String, Section>,
) {
    if let Some(incoming_default) = incoming.get(DEFAULT_ID) {
        match result.get_mut(DEFAULT_ID) {
            Some(current) => current.update(incoming_default, None),
            None => {
                result.insert(DEFAULT_ID.to_string(), incoming_default.clone());
            }
        }
    }

    let default = result.get(DEFAULT_ID).cloned();
    for (id, section) in incoming {
        if id == DEFAULT_ID {
            continue;
        }
        match result.get_mut(id) {
            Some(current) => current.update(section, default.as_ref()),
            None => {
                let mut created = section.clone();
                if let Some(default) = &default {
                    created.widen(default);
                }
                result.insert(id.clone(), created);
            }
        }
    }
}
