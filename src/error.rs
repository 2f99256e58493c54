use std::path::PathBuf;

use thiserror::Error;

use crate::output::OutputFormat;

/// Broad failure classes. Callers use these to decide whether a failure can
/// be recovered by prompting, must be shown with a file path, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid name, key or value syntax. Local, never retried.
    Validation,
    /// A setting needed by the action has no resolved value.
    RequiredValueMissing,
    /// A settings or project file could not be read, parsed or written.
    Persistence,
    /// A builder, deployer or other external tool failed.
    ExternalCollaborator,
    /// The user aborted an interactive prompt.
    Cancelled,
}

#[derive(Debug, Error)]
#[cfg_attr(feature = "rich-errors", derive(miette::Diagnostic))]
pub enum FuncError {
    #[error("Invalid {field} '{value}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(func::validation)))]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown setting '{name}'. Known settings: {known}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(code(func::unknown_setting), help("run `func config list` to see all settings"))
    )]
    UnknownSetting { name: String, known: String },

    #[error("Invalid value '{value}' for setting '{name}': {reason}")]
    #[cfg_attr(feature = "rich-errors", diagnostic(code(func::invalid_value)))]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Required value '{setting}' is missing. {hint}")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(
            code(func::required_value_missing),
            help("run the command from a terminal with --confirm to be prompted")
        )
    )]
    RequiredValueMissing { setting: &'static str, hint: String },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unknown keys in config file: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    UnknownKeys(Vec<FuncError>),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ProjectParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("'{path}' contains errors:\n\t{}", .errors.join("\n\t"))]
    InvalidProject { path: PathBuf, errors: Vec<String> },

    #[error("No function found in '{0}'")]
    #[cfg_attr(
        feature = "rich-errors",
        diagnostic(help("create one with `func init` or point --path at an existing function"))
    )]
    NotInitialized(PathBuf),

    #[error("A function already exists in '{0}'")]
    AlreadyInitialized(PathBuf),

    #[error("Function path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("No {noun} matches '{selector}'")]
    NoMatch {
        noun: &'static str,
        selector: String,
    },

    #[error("Position {index} is out of range for a collection of {len} entries")]
    PositionOutOfRange { index: usize, len: usize },

    #[error("Output format '{format}' is not supported here; use one of: {supported}")]
    UnsupportedFormat {
        format: OutputFormat,
        supported: String,
    },

    #[error("Failed to render {what}: {reason}")]
    Render { what: &'static str, reason: String },

    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl FuncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FuncError::Validation { .. }
            | FuncError::UnknownSetting { .. }
            | FuncError::InvalidValue { .. }
            | FuncError::NoMatch { .. }
            | FuncError::PositionOutOfRange { .. }
            | FuncError::UnsupportedFormat { .. }
            | FuncError::AlreadyInitialized(_) => ErrorKind::Validation,
            FuncError::RequiredValueMissing { .. } => ErrorKind::RequiredValueMissing,
            FuncError::UnknownKey { .. }
            | FuncError::UnknownKeys(_)
            | FuncError::ParseError { .. }
            | FuncError::ProjectParse { .. }
            | FuncError::IoError { .. }
            | FuncError::WriteError { .. }
            | FuncError::ConfigError(_)
            | FuncError::InvalidProject { .. }
            | FuncError::NotInitialized(_)
            | FuncError::NotADirectory(_)
            | FuncError::Render { .. } => ErrorKind::Persistence,
            FuncError::Collaborator { .. } => ErrorKind::ExternalCollaborator,
            FuncError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn validation(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        FuncError::Validation {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
