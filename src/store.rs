//! The global settings store: where the file lives, how it is read, and how
//! it is written back.
//!
//! The file is `<config dir>/func/config.toml`. The config dir is
//! `$XDG_CONFIG_HOME` when set, otherwise the platform config dir from
//! `directories`. `FUNC_CONFIG_FILE` overrides the whole path.

use std::path::{Path, PathBuf};

use crate::error::FuncError;
use crate::persist;
use crate::resolve::{self, ResolveInput};
use crate::settings::{self, GlobalSettings};

pub const APP_NAME: &str = "func";
pub const FILE_NAME: &str = "config.toml";
pub const CONFIG_FILE_ENV: &str = "FUNC_CONFIG_FILE";

/// Path of the global settings file, looking variables up through `lookup`.
///
/// Returns `None` only when neither an override nor any config directory can
/// be determined (no home directory).
pub fn config_file_with(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(explicit) = lookup(CONFIG_FILE_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    if let Some(xdg) = lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(xdg).join(APP_NAME).join(FILE_NAME));
    }
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Some(dirs.config_dir().join(FILE_NAME))
}

/// [`config_file_with`] over the process environment.
pub fn config_file() -> Option<PathBuf> {
    config_file_with(|name| std::env::var(name).ok())
}

/// Static defaults overlaid with the file at `path`. A missing file yields
/// the defaults; unknown keys are rejected.
pub fn load(path: &Path) -> Result<GlobalSettings, FuncError> {
    let content = persist::read_optional(path)?;
    tracing::debug!(
        event = "core.settings.load_started",
        path = %path.display(),
        exists = content.is_some(),
    );
    resolve::resolve(ResolveInput {
        global_file: content.map(|c| (path.to_path_buf(), c)),
        strict: true,
        ..ResolveInput::default()
    })
}

/// Persist `settings` to `path` atomically.
///
/// Only values that differ from the static defaults are written, so unsetting
/// a setting removes its key. Comments in an existing file are kept.
pub fn write(settings: &GlobalSettings, path: &Path) -> Result<(), FuncError> {
    let existing = persist::read_optional(path)?;
    let values = settings::to_table(settings)?;
    let defaults = settings::to_table(&settings::defaults()?)?;
    let document =
        persist::sync_document::<GlobalSettings>(existing.as_deref(), &values, &defaults, path)?;
    persist::write_atomic(path, &document)?;
    tracing::info!(event = "core.settings.write_completed", path = %path.display());
    Ok(())
}
