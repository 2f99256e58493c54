//! The global settings schema and the typed get/set/unset operations on it.
//!
//! [`GlobalSettings`] is the single source of truth for which settings exist,
//! what they default to and what they mean: the `///` docs end up in the
//! generated settings file, and `#[config(default)]` is the static defaults
//! layer of the cascade.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use clap::ValueEnum;
use confique::Config;
use serde::{Deserialize, Serialize};
use toml::{Table, Value};

use crate::error::FuncError;
use crate::names::Field;
use crate::output::{Formatted, OutputFormat};

/// Strategy used to turn function source into a container image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuilderKind {
    #[default]
    Pack,
    S2i,
}

impl BuilderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BuilderKind::Pack => "pack",
            BuilderKind::S2i => "s2i",
        }
    }
}

impl fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    /// Builder used to create function images (pack or s2i).
    #[config(default = "pack")]
    pub builder: BuilderKind,

    /// Prompt to confirm every promptable value before acting.
    #[config(default = false)]
    pub confirm: bool,

    /// Default language runtime for new functions.
    #[config(default = "")]
    pub language: String,

    /// Namespace functions are deployed to.
    #[config(default = "default")]
    pub namespace: String,

    /// Output format for list and describe commands.
    #[config(default = "human")]
    pub output: OutputFormat,

    /// Registry used to derive image names, e.g. quay.io/alice.
    #[config(default = "")]
    pub registry: String,

    /// Allow pushing to a registry without TLS verification.
    #[config(default = false)]
    pub registry_insecure: bool,

    /// Print verbose logs.
    #[config(default = false)]
    pub verbose: bool,
}

/// Settings a project file can carry for itself and that therefore take part
/// in the project layer of the cascade.
pub const PROJECT_SCOPED: [&str; 4] = ["builder", "language", "namespace", "registry"];

/// The static defaults layer.
pub fn defaults() -> Result<GlobalSettings, FuncError> {
    Ok(GlobalSettings::builder().load()?)
}

/// All setting names, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = GlobalSettings::META.fields.iter().map(|f| f.name).collect();
    names.sort_unstable();
    names
}

pub fn is_known(name: &str) -> bool {
    GlobalSettings::META.fields.iter().any(|f| f.name == name)
}

/// The `///` doc for a setting, if any.
pub fn doc(name: &str) -> Option<String> {
    GlobalSettings::META
        .fields
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.doc.iter().map(|line| line.trim()).collect::<Vec<_>>().join(" "))
        .filter(|doc| !doc.is_empty())
}

/// Valid values for enumerated settings, `None` for free-form ones.
pub fn allowed_values(name: &str) -> Option<Vec<&'static str>> {
    match name {
        "builder" => Some(BuilderKind::value_variants().iter().map(|b| b.as_str()).collect()),
        "output" => Some(OutputFormat::ALL.iter().map(|f| f.as_str()).collect()),
        _ => None,
    }
}

pub fn get(settings: &GlobalSettings, name: &str) -> Result<String, FuncError> {
    let table = to_table(settings)?;
    table
        .get(name)
        .map(value_to_string)
        .ok_or_else(|| unknown_setting(name))
}

/// Return a copy of `settings` with `name` set to `raw`, coerced to the
/// setting's type. `settings` itself is left untouched on any failure.
pub fn set(settings: &GlobalSettings, name: &str, raw: &str) -> Result<GlobalSettings, FuncError> {
    let mut table = to_table(settings)?;
    let current = table.get(name).ok_or_else(|| unknown_setting(name))?;
    let value = coerce(name, current, raw)?;
    table.insert(name.to_string(), value);

    Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| invalid(name, raw, e.to_string()))
}

/// Reset `name` to its static default.
pub fn unset(settings: &GlobalSettings, name: &str) -> Result<GlobalSettings, FuncError> {
    let default = get(&defaults()?, name)?;
    set(settings, name, &default)
}

/// Typed TOML value for `raw`, using the type of the setting's current value.
pub(crate) fn coerce(name: &str, current: &Value, raw: &str) -> Result<Value, FuncError> {
    match current {
        Value::Boolean(_) => parse_bool(raw)
            .map(Value::Boolean)
            .ok_or_else(|| invalid(name, raw, "expected a boolean (true, false, t, f, 1, 0)")),
        Value::String(_) => {
            if let Some(valid) = allowed_values(name)
                && !valid.contains(&raw)
            {
                return Err(invalid(
                    name,
                    raw,
                    format!("must be one of: {}", valid.join(", ")),
                ));
            }
            check_setting_syntax(name, raw)?;
            Ok(Value::String(raw.to_string()))
        }
        other => Err(invalid(
            name,
            raw,
            format!("unsupported setting type {}", other.type_str()),
        )),
    }
}

fn check_setting_syntax(name: &str, raw: &str) -> Result<(), FuncError> {
    let field = match name {
        "namespace" => Field::Namespace,
        "registry" if !raw.is_empty() => Field::Registry,
        _ => return Ok(()),
    };
    field
        .validate(raw)
        .map_err(|e| invalid(name, raw, validation_reason(e)))
}

fn validation_reason(e: FuncError) -> String {
    match e {
        FuncError::Validation { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Accepts the same spellings as the usual boolean parsers: 1, t, true and
/// 0, f, false in any case.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn to_table(settings: &GlobalSettings) -> Result<Table, FuncError> {
    match Value::try_from(settings) {
        Ok(Value::Table(table)) => Ok(table),
        Ok(other) => Err(FuncError::Render {
            what: "settings",
            reason: format!("expected a table, got {}", other.type_str()),
        }),
        Err(e) => Err(FuncError::Render {
            what: "settings",
            reason: e.to_string(),
        }),
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unknown_setting(name: &str) -> FuncError {
    FuncError::UnknownSetting {
        name: name.to_string(),
        known: names().join(", "),
    }
}

fn invalid(name: &str, raw: &str, reason: impl Into<String>) -> FuncError {
    FuncError::InvalidValue {
        name: name.to_string(),
        value: raw.to_string(),
        reason: reason.into(),
    }
}

/// Every setting with its current value, in name order.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct SettingsListing(pub BTreeMap<String, String>);

impl SettingsListing {
    pub fn of(settings: &GlobalSettings) -> Result<Self, FuncError> {
        let table = to_table(settings)?;
        Ok(SettingsListing(
            table
                .iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect(),
        ))
    }
}

impl Formatted for SettingsListing {
    const XML_ROOT: &'static str = "config";

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for (name, value) in &self.0 {
            writeln!(w, "{name}={value}")?;
        }
        Ok(())
    }
}

/// One setting's value, as printed by `config get`.
#[derive(Debug, Serialize)]
pub struct SettingValue {
    pub name: String,
    pub value: String,
}

impl Formatted for SettingValue {
    const XML_ROOT: &'static str = "setting";

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{}", self.value)
    }
}
