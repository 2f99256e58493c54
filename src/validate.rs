//! Strict-mode validation: detect unknown keys in the global settings file.
//!
//! Uses `serde_ignored` to deserialize into `C::Layer` (all-optional fields)
//! and capture any keys the layer doesn't consume. Each unknown key is
//! reported with its file path and best-effort line number, which is how a
//! typo like `regsitry = "..."` gets caught instead of silently ignored.

use std::path::Path;

use confique::Config;
use serde::Deserialize;

use crate::error::FuncError;

/// Validate that a TOML settings file contains no keys unknown to `C`.
pub fn validate_unknown_keys<C: Config>(content: &str, path: &Path) -> Result<(), FuncError>
where
    C::Layer: for<'de> Deserialize<'de>,
{
    let mut unknown_keys: Vec<String> = Vec::new();

    let deserializer = toml::Deserializer::new(content);
    let _layer: C::Layer = serde_ignored::deserialize(deserializer, |ignored_path| {
        unknown_keys.push(ignored_path.to_string());
    })
    .map_err(|e| FuncError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if unknown_keys.is_empty() {
        return Ok(());
    }

    let errors: Vec<FuncError> = unknown_keys
        .into_iter()
        .map(|key| {
            let line = find_key_line(content, &key);
            FuncError::UnknownKey {
                key,
                path: path.to_path_buf(),
                line,
            }
        })
        .collect();

    Err(FuncError::UnknownKeys(errors))
}

/// 1-indexed line of a `key = ...` assignment, or 0 when it can't be found.
///
/// Settings are flat, so an unknown table shows up under its own name and is
/// located by its `[section]` header.
fn find_key_line(content: &str, key: &str) -> usize {
    let head = key.split('.').next().unwrap_or(key);

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            if header == head {
                return i + 1;
            }
            continue;
        }
        if let Some(after_key) = trimmed.strip_prefix(head)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}
