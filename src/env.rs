use toml::Table;

use crate::error::FuncError;
use crate::settings;

/// Prefix shared by every environment variable the tool reads.
pub const PREFIX: &str = "FUNC";

/// Build the environment layer from variables matching `{PREFIX}_*`.
///
/// The remainder of the variable name is lowercased and matched against the
/// known settings (`FUNC_REGISTRY_INSECURE` → `registry_insecure`). Variables
/// that don't name a setting are ignored; several of them (`FUNC_PATH`,
/// `FUNC_IMAGE`, `FUNC_CONFIG_FILE`) are read elsewhere.
///
/// Values are typed after the setting they target, so `FUNC_CONFIRM=1` is a
/// boolean and `FUNC_NAMESPACE=1` stays a string.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_table(
    prefix: &str,
    vars: impl IntoIterator<Item = (String, String)>,
    defaults: &Table,
) -> Result<Table, FuncError> {
    let needle = format!("{prefix}_");
    let mut table = Table::new();

    for (key, raw) in vars {
        let Some(rest) = key.strip_prefix(&needle) else {
            continue;
        };
        let name = rest.to_lowercase();
        let Some(current) = defaults.get(&name) else {
            continue;
        };
        let value = settings::coerce(&name, current, &raw).map_err(|e| rename_source(e, &key))?;
        tracing::debug!(event = "core.env.setting_read", variable = %key, setting = %name);
        table.insert(name, value);
    }

    Ok(table)
}

/// Value of `{prefix}_{suffix}` in `vars`, last occurrence wins.
pub fn lookup(prefix: &str, vars: &[(String, String)], suffix: &str) -> Option<String> {
    let wanted = format!("{prefix}_{suffix}");
    vars.iter()
        .rev()
        .find(|(k, _)| *k == wanted)
        .map(|(_, v)| v.clone())
}

fn rename_source(e: FuncError, variable: &str) -> FuncError {
    match e {
        FuncError::InvalidValue { value, reason, .. } => FuncError::InvalidValue {
            name: variable.to_string(),
            value,
            reason,
        },
        other => other,
    }
}
