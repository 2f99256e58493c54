//! Turn command-line flag overrides into the topmost settings layer.
//!
//! Commands push `(setting, Value)` pairs for the flags the user actually
//! passed; flags left unset never become entries, so they cannot mask lower
//! layers.

use std::collections::HashSet;

use confique::meta::{FieldKind, Meta};
use toml::{Table, Value};

use crate::error::FuncError;

/// Collect flag overrides into a flat `toml::Table`.
///
/// Every key must name a leaf in `meta`. If multiple entries target the same
/// key, the last one wins.
pub fn overrides_to_table(entries: &[(String, Value)], meta: &Meta) -> Result<Table, FuncError> {
    let valid = valid_keys(meta);
    let mut table = Table::new();
    for (key, value) in entries {
        if !valid.contains(key.as_str()) {
            let mut known: Vec<&str> = valid.iter().copied().collect();
            known.sort_unstable();
            return Err(FuncError::UnknownSetting {
                name: key.clone(),
                known: known.join(", "),
            });
        }
        table.insert(key.clone(), value.clone());
    }
    Ok(table)
}

/// Names of all leaf settings in a confique `Meta`.
pub fn valid_keys(meta: &Meta) -> HashSet<&'static str> {
    meta.fields
        .iter()
        .filter(|field| matches!(field.kind, FieldKind::Leaf { .. }))
        .map(|field| field.name)
        .collect()
}
