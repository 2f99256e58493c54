//! `config` operations on the global settings file, and the result type
//! callers use to display them.

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::error::FuncError;
use crate::output::{self, OutputFormat};
use crate::settings::{self, SettingValue, SettingsListing};
use crate::store;
use crate::types::ConfigAction;

/// Result of a config operation. Returned to the caller for display.
#[derive(Debug)]
pub enum ConfigResult {
    /// Every setting with its stored value.
    Listing(SettingsListing),
    /// One setting's stored value and its documentation.
    Value { value: SettingValue, doc: Option<String> },
    /// Confirmation that a value was persisted.
    ValueSet { name: String, value: String },
    /// Confirmation that a setting was reset to its default.
    ValueUnset { name: String, default: String },
}

impl fmt::Display for ConfigResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResult::Listing(listing) => {
                for (name, value) in &listing.0 {
                    writeln!(f, "{name}={value}")?;
                }
                Ok(())
            }
            ConfigResult::Value { value, doc } => {
                if let Some(doc) = doc {
                    for line in doc.lines() {
                        writeln!(f, "# {line}")?;
                    }
                }
                writeln!(f, "{}", value.value)
            }
            ConfigResult::ValueSet { name, value } => writeln!(f, "Set {name} = {value}"),
            ConfigResult::ValueUnset { name, default } => {
                writeln!(f, "Unset {name} (now {default:?})")
            }
        }
    }
}

impl ConfigResult {
    /// Write the result in `format`. Confirmations are always plain text.
    pub fn render(&self, format: OutputFormat, w: &mut dyn Write) -> Result<(), FuncError> {
        match (self, format) {
            (ConfigResult::Listing(listing), _) => output::write(listing, format, w),
            (ConfigResult::Value { .. }, OutputFormat::Human) => {
                write!(w, "{self}").map_err(output::io_error)
            }
            (ConfigResult::Value { value, .. }, _) => output::write(value, format, w),
            _ => write!(w, "{self}").map_err(output::io_error),
        }
    }
}

/// Run `action` against the settings file at `path`.
pub fn handle(action: &ConfigAction, path: &Path) -> Result<ConfigResult, FuncError> {
    match action {
        ConfigAction::List => {
            let current = store::load(path)?;
            Ok(ConfigResult::Listing(SettingsListing::of(&current)?))
        }
        ConfigAction::Get { name } => {
            let current = store::load(path)?;
            let value = settings::get(&current, name)?;
            Ok(ConfigResult::Value {
                value: SettingValue {
                    name: name.clone(),
                    value,
                },
                doc: settings::doc(name),
            })
        }
        ConfigAction::Set { name, value } => {
            let current = store::load(path)?;
            let updated = settings::set(&current, name, value)?;
            store::write(&updated, path)?;
            tracing::info!(event = "core.config.set_completed", setting = %name);
            Ok(ConfigResult::ValueSet {
                name: name.clone(),
                value: settings::get(&updated, name)?,
            })
        }
        ConfigAction::Unset { name } => {
            let current = store::load(path)?;
            let updated = settings::unset(&current, name)?;
            store::write(&updated, path)?;
            tracing::info!(event = "core.config.unset_completed", setting = %name);
            Ok(ConfigResult::ValueUnset {
                name: name.clone(),
                default: settings::get(&updated, name)?,
            })
        }
    }
}
