//! Named validators, keyed by the kind of value being checked.
//!
//! Every prompt, flag and project entry routes its input through
//! [`Field::validate`], so one rule set governs interactive input, flags and
//! files on disk alike.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::FuncError;

const DNS1035_LABEL: &str = r"^[a-z]([-a-z0-9]*[a-z0-9])?$";
const DNS1123_LABEL: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";
const DNS1123_SUBDOMAIN: &str =
    r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";
const ENV_VAR_NAME: &str = r"^[-._a-zA-Z][-._a-zA-Z0-9]*$";
const KEY_NAME: &str = r"^[-._a-zA-Z0-9]+$";
const QUALIFIED_NAME: &str = r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$";

const LABEL_MAX: usize = 63;
const SUBDOMAIN_MAX: usize = 253;

static DNS1035: LazyLock<Regex> = LazyLock::new(|| compiled(DNS1035_LABEL));
static DNS1123: LazyLock<Regex> = LazyLock::new(|| compiled(DNS1123_LABEL));
static SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| compiled(DNS1123_SUBDOMAIN));
static ENV_NAME: LazyLock<Regex> = LazyLock::new(|| compiled(ENV_VAR_NAME));
static KEY: LazyLock<Regex> = LazyLock::new(|| compiled(KEY_NAME));
static QUALIFIED: LazyLock<Regex> = LazyLock::new(|| compiled(QUALIFIED_NAME));

fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex")
}

/// The kinds of user-supplied values that have a syntax of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FunctionName,
    EnvVarName,
    ConfigMapKey,
    SecretKey,
    LabelKey,
    LabelValue,
    Namespace,
    /// Name of a Secret, ConfigMap or PersistentVolumeClaim.
    ResourceName,
    MountPath,
    Registry,
}

impl Field {
    pub fn describe(self) -> &'static str {
        match self {
            Field::FunctionName => "function name",
            Field::EnvVarName => "environment variable name",
            Field::ConfigMapKey => "ConfigMap key",
            Field::SecretKey => "Secret key",
            Field::LabelKey => "label key",
            Field::LabelValue => "label value",
            Field::Namespace => "namespace",
            Field::ResourceName => "resource name",
            Field::MountPath => "mount path",
            Field::Registry => "registry",
        }
    }

    pub fn validate(self, value: &str) -> Result<(), FuncError> {
        let reason = match self {
            Field::FunctionName => check_label(value, &DNS1035, DNS1035_HINT),
            Field::Namespace => {
                if value.is_empty() {
                    None
                } else {
                    check_label(value, &DNS1123, DNS1123_HINT)
                }
            }
            Field::EnvVarName => check_regex(value, &ENV_NAME, ENV_HINT),
            Field::ConfigMapKey | Field::SecretKey => {
                if value.len() > SUBDOMAIN_MAX {
                    Some(format!("must be no more than {SUBDOMAIN_MAX} characters"))
                } else {
                    check_regex(value, &KEY, KEY_HINT)
                }
            }
            Field::ResourceName => {
                if value.len() > SUBDOMAIN_MAX {
                    Some(format!("must be no more than {SUBDOMAIN_MAX} characters"))
                } else {
                    check_regex(value, &SUBDOMAIN, SUBDOMAIN_HINT)
                }
            }
            Field::LabelKey => check_label_key(value),
            Field::LabelValue => check_label_value(value),
            Field::MountPath => {
                if value.starts_with('/') {
                    None
                } else {
                    Some("must be an absolute path starting with '/'".into())
                }
            }
            Field::Registry => check_registry(value),
        };
        match reason {
            Some(reason) => Err(FuncError::validation(self.describe(), value, reason)),
            None => Ok(()),
        }
    }
}

const DNS1035_HINT: &str = "must consist of lower case alphanumeric characters or '-', \
     start with an alphabetic character, and end with an alphanumeric character";
const DNS1123_HINT: &str = "must consist of lower case alphanumeric characters or '-', \
     and must start and end with an alphanumeric character";
const SUBDOMAIN_HINT: &str = "must consist of lower case alphanumeric characters, '-' or '.', \
     and must start and end with an alphanumeric character";
const ENV_HINT: &str = "must consist of alphabetic characters, digits, '_', '-', or '.', \
     and must not start with a digit";
const KEY_HINT: &str = "must consist of alphanumeric characters, '-', '_' or '.'";
const QUALIFIED_HINT: &str = "must consist of alphanumeric characters, '-', '_' or '.', \
     and must start and end with an alphanumeric character";

fn check_regex(value: &str, re: &Regex, hint: &str) -> Option<String> {
    if re.is_match(value) {
        None
    } else {
        Some(hint.to_string())
    }
}

fn check_label(value: &str, re: &Regex, hint: &str) -> Option<String> {
    if value.len() > LABEL_MAX {
        return Some(format!("must be no more than {LABEL_MAX} characters"));
    }
    check_regex(value, re, hint)
}

fn check_label_key(value: &str) -> Option<String> {
    let (prefix, name) = match value.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, value),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() {
            return Some("prefix part must be non-empty".into());
        }
        if prefix.len() > SUBDOMAIN_MAX || !SUBDOMAIN.is_match(prefix) {
            return Some(format!("prefix part {SUBDOMAIN_HINT}"));
        }
    }
    if name.is_empty() {
        return Some("name part must be non-empty".into());
    }
    if name.len() > LABEL_MAX {
        return Some(format!("name part must be no more than {LABEL_MAX} characters"));
    }
    check_regex(name, &QUALIFIED, QUALIFIED_HINT).map(|hint| format!("name part {hint}"))
}

fn check_label_value(value: &str) -> Option<String> {
    // Template references are resolved later, at deploy time.
    if value.is_empty() || value.starts_with("{{") {
        return None;
    }
    check_label(value, &QUALIFIED, QUALIFIED_HINT)
}

fn check_registry(value: &str) -> Option<String> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Some("must not be empty".into());
    }
    let tokens: Vec<&str> = trimmed.split('/').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Some("must not contain empty path segments".into());
    }
    if tokens.len() > 3 {
        return Some(
            "should be either 'namespace', 'registry/namespace' or \
             'registry/parent/namespace'; the image name is derived from the function name"
                .into(),
        );
    }
    None
}
