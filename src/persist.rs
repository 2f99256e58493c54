//! Persistence: comment-preserving settings documents and atomic file writes.
//!
//! The settings file is edited with `toml_edit` so user comments survive a
//! `config set`. A file that doesn't exist yet is seeded from the generated
//! template, so it starts out documented. Every write, settings or project,
//! lands through a temp file in the target directory followed by a rename.

use std::io::Write;
use std::path::Path;

use confique::Config;
use tempfile::NamedTempFile;
use toml::{Table, Value};

use crate::error::FuncError;

/// Generate a commented TOML template from the config struct's doc comments.
pub fn generate_template<C: Config>() -> String {
    confique::toml::template::<C>(confique::toml::FormatOptions::default())
}

/// Pure function: bring a settings document in line with `values`.
///
/// Keys whose value equals the static default are removed from the document,
/// everything else is written. Keys that already hold the wanted value are
/// left untouched so their formatting is kept.
///
/// If `content` is `None` (file doesn't exist yet), starts from the template
/// of `C`.
pub fn sync_document<C: Config>(
    content: Option<&str>,
    values: &Table,
    defaults: &Table,
    path: &Path,
) -> Result<String, FuncError> {
    let base = match content {
        Some(c) => c.to_string(),
        None => generate_template::<C>(),
    };

    let mut doc: toml_edit::DocumentMut =
        base.parse()
            .map_err(|e: toml_edit::TomlError| FuncError::Render {
                what: "settings document",
                reason: format!("{}: {e}", path.display()),
            })?;

    for (key, value) in values {
        if defaults.get(key) == Some(value) {
            doc.remove(key);
            continue;
        }
        if doc.get(key).is_some_and(|item| holds(item, value)) {
            continue;
        }
        doc[key.as_str()] = toml_edit::value(to_edit_value(value));
    }

    Ok(doc.to_string())
}

/// Atomically replace `path` with `contents`.
///
/// Creates parent directories as needed. Readers see either the old file or
/// the new one, never a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), FuncError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let write_err = |source| FuncError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(parent).map_err(|source| FuncError::WriteError {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!(event = "core.persist.write_completed", path = %path.display());
    Ok(())
}

/// Read a file that may legitimately be absent.
pub fn read_optional(path: &Path) -> Result<Option<String>, FuncError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(FuncError::IoError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn holds(item: &toml_edit::Item, value: &Value) -> bool {
    let Some(current) = item.as_value() else {
        return false;
    };
    match value {
        Value::String(s) => current.as_str() == Some(s.as_str()),
        Value::Boolean(b) => current.as_bool() == Some(*b),
        Value::Integer(i) => current.as_integer() == Some(*i),
        Value::Float(f) => current.as_float() == Some(*f),
        _ => false,
    }
}

fn to_edit_value(value: &Value) -> toml_edit::Value {
    match value {
        Value::String(s) => toml_edit::Value::from(s.as_str()),
        Value::Boolean(b) => toml_edit::Value::from(*b),
        Value::Integer(i) => toml_edit::Value::from(*i),
        Value::Float(f) => toml_edit::Value::from(*f),
        other => toml_edit::Value::from(other.to_string()),
    }
}
