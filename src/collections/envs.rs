//! Environment variables set on the deployed function.
//!
//! A value is either a literal or a reference:
//!
//! ```text
//! {{ env:NAME }}                 value of a local environment variable
//! {{ configMap:name }}           every key of a ConfigMap (entry has no name)
//! {{ configMap:name:key }}       one key of a ConfigMap
//! {{ secret:name }}              every key of a Secret (entry has no name)
//! {{ secret:name:key }}          one key of a Secret
//! ```
//!
//! Referenced ConfigMaps and Secrets are recorded by name only; whether they
//! exist is the cluster's concern.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Entry, PromptContext};
use crate::collaborators::ResourceKind;
use crate::error::FuncError;
use crate::names::Field;

static WHOLE_SECRET: LazyLock<Regex> =
    LazyLock::new(|| reference(r"^\{\{\s*secret:((?:\w|['-]\w)+)\s*\}\}$"));
static KEY_FROM_SECRET: LazyLock<Regex> =
    LazyLock::new(|| reference(r"^\{\{\s*secret:((?:\w|['-]\w)+):([-._a-zA-Z0-9]+)\s*\}\}$"));
static WHOLE_CONFIG_MAP: LazyLock<Regex> =
    LazyLock::new(|| reference(r"^\{\{\s*configMap:((?:\w|['-]\w)+)\s*\}\}$"));
static KEY_FROM_CONFIG_MAP: LazyLock<Regex> =
    LazyLock::new(|| reference(r"^\{\{\s*configMap:((?:\w|['-]\w)+):([-._a-zA-Z0-9]+)\s*\}\}$"));
pub(crate) static LOCAL_ENV: LazyLock<Regex> =
    LazyLock::new(|| reference(r"^\{\{\s*env:(\w+)\s*\}\}$"));

fn reference(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// What an env value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef<'a> {
    Literal(&'a str),
    LocalEnv(&'a str),
    ConfigMap(&'a str),
    ConfigMapKey { name: &'a str, key: &'a str },
    Secret(&'a str),
    SecretKey { name: &'a str, key: &'a str },
    /// Starts with `{{` but matches no known reference form.
    Malformed(&'a str),
}

impl<'a> ValueRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        let group = |caps: &regex::Captures<'a>, i: usize| caps.get(i).map_or("", |m| m.as_str());
        if let Some(c) = LOCAL_ENV.captures(value) {
            return ValueRef::LocalEnv(group(&c, 1));
        }
        if let Some(c) = WHOLE_SECRET.captures(value) {
            return ValueRef::Secret(group(&c, 1));
        }
        if let Some(c) = KEY_FROM_SECRET.captures(value) {
            return ValueRef::SecretKey {
                name: group(&c, 1),
                key: group(&c, 2),
            };
        }
        if let Some(c) = WHOLE_CONFIG_MAP.captures(value) {
            return ValueRef::ConfigMap(group(&c, 1));
        }
        if let Some(c) = KEY_FROM_CONFIG_MAP.captures(value) {
            return ValueRef::ConfigMapKey {
                name: group(&c, 1),
                key: group(&c, 2),
            };
        }
        if value.starts_with("{{") {
            return ValueRef::Malformed(value);
        }
        ValueRef::Literal(value)
    }
}

impl Env {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
        }
    }

    /// An entry importing every key of a ConfigMap or Secret.
    pub fn whole(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: Some(value.into()),
        }
    }

    /// Entry from `--name`/`--value` flags. At least one must be given.
    pub fn from_flags(name: Option<String>, value: Option<String>) -> Result<Self, FuncError> {
        if name.is_none() && value.is_none() {
            return Err(FuncError::validation(
                "environment variable",
                "",
                "provide --name and/or --value",
            ));
        }
        if let Some(name) = &name {
            Field::EnvVarName.validate(name)?;
        }
        let env = Env { name, value };
        let problems = env.problems(0);
        if !problems.is_empty() {
            return Err(FuncError::validation(
                "environment variable",
                &env.to_string(),
                problems.join("; "),
            ));
        }
        Ok(env)
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, &self.value) {
            (None, Some(value)) => match ValueRef::parse(value) {
                ValueRef::Secret(secret) => {
                    write!(f, "All key=value pairs from Secret \"{secret}\"")
                }
                ValueRef::ConfigMap(cm) => {
                    write!(f, "All key=value pairs from ConfigMap \"{cm}\"")
                }
                _ => write!(f, "Env without name and value \"{value}\""),
            },
            (Some(name), Some(value)) => match ValueRef::parse(value) {
                ValueRef::SecretKey { name: secret, key } => write!(
                    f,
                    "Env \"{name}\" with value set from key \"{key}\" from Secret \"{secret}\""
                ),
                ValueRef::ConfigMapKey { name: cm, key } => write!(
                    f,
                    "Env \"{name}\" with value set from key \"{key}\" from ConfigMap \"{cm}\""
                ),
                ValueRef::LocalEnv(local) => write!(
                    f,
                    "Env \"{name}\" with value set from local env variable \"{local}\""
                ),
                _ => write!(f, "Env \"{name}\" with value \"{value}\""),
            },
            (Some(name), None) => write!(f, "Env \"{name}\" without value"),
            (None, None) => write!(f, "Empty env entry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvKind {
    Value,
    LocalEnv,
    ConfigMapAll,
    ConfigMapKey,
    SecretAll,
    SecretKey,
}

impl fmt::Display for EnvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnvKind::Value => "Environment variable with a specified value",
            EnvKind::LocalEnv => "Value from a local environment variable",
            EnvKind::ConfigMapAll => "ConfigMap: all key=value pairs as environment variables",
            EnvKind::ConfigMapKey => "ConfigMap: value from a key",
            EnvKind::SecretAll => "Secret: all key=value pairs as environment variables",
            EnvKind::SecretKey => "Secret: value from a key",
        })
    }
}

const KINDS: [EnvKind; 6] = [
    EnvKind::Value,
    EnvKind::LocalEnv,
    EnvKind::ConfigMapAll,
    EnvKind::ConfigMapKey,
    EnvKind::SecretAll,
    EnvKind::SecretKey,
];

impl Entry for Env {
    const NOUN: &'static str = "environment variable";
    const NOUN_PLURAL: &'static str = "environment variables";
    const XML_NAME: &'static str = "env";

    type Kind = EnvKind;

    fn kinds() -> &'static [EnvKind] {
        &KINDS
    }

    fn prompt(kind: EnvKind, ctx: &mut PromptContext<'_>) -> Result<Self, FuncError> {
        match kind {
            EnvKind::Value => {
                let name = ctx.validated("Please specify the environment variable name:", Field::EnvVarName)?;
                let value = ctx.prompter.input("Please specify the environment variable value:", "")?;
                Ok(Env::new(name, value))
            }
            EnvKind::LocalEnv => {
                let name = ctx.validated("Please specify the environment variable name:", Field::EnvVarName)?;
                let local = ctx.validated("Please specify the local environment variable:", Field::EnvVarName)?;
                if !ctx.local_env_is_set(&local) {
                    tracing::warn!(event = "core.envs.local_variable_unset", variable = %local);
                    ctx.prompter.notice(&format!(
                        "Warning: specified local environment variable \"{local}\" is not set"
                    ));
                }
                Ok(Env::new(name, format!("{{{{ env:{local} }}}}")))
            }
            EnvKind::ConfigMapAll => {
                let cm = ctx.resource_name(ResourceKind::ConfigMap, "Which ConfigMap do you want to use?")?;
                Ok(Env::whole(format!("{{{{ configMap:{cm} }}}}")))
            }
            EnvKind::ConfigMapKey => {
                let name = ctx.validated("Please specify the environment variable name:", Field::EnvVarName)?;
                let cm = ctx.resource_name(ResourceKind::ConfigMap, "Which ConfigMap do you want to use?")?;
                let key = ctx.validated("Please specify a key from the selected ConfigMap:", Field::ConfigMapKey)?;
                Ok(Env::new(name, format!("{{{{ configMap:{cm}:{key} }}}}")))
            }
            EnvKind::SecretAll => {
                let secret = ctx.resource_name(ResourceKind::Secret, "Which Secret do you want to use?")?;
                Ok(Env::whole(format!("{{{{ secret:{secret} }}}}")))
            }
            EnvKind::SecretKey => {
                let name = ctx.validated("Please specify the environment variable name:", Field::EnvVarName)?;
                let secret = ctx.resource_name(ResourceKind::Secret, "Which Secret do you want to use?")?;
                let key = ctx.validated("Please specify a key from the selected Secret:", Field::SecretKey)?;
                Ok(Env::new(name, format!("{{{{ secret:{secret}:{key} }}}}")))
            }
        }
    }

    fn problems(&self, i: usize) -> Vec<String> {
        let mut problems = Vec::new();
        match (&self.name, &self.value) {
            (None, None) => problems.push(format!("env entry #{i} is not properly set")),
            (Some(name), None) => problems.push(format!(
                "env entry #{i} is missing value field, only name '{name}' is set"
            )),
            (None, Some(value)) => {
                if !matches!(ValueRef::parse(value), ValueRef::Secret(_) | ValueRef::ConfigMap(_)) {
                    problems.push(format!(
                        "env entry #{i} has invalid value field set, it has '{value}', but allowed is only \
                         '{{{{ secret:secretName }}}}' or '{{{{ configMap:configMapName }}}}'"
                    ));
                }
            }
            (Some(name), Some(value)) => {
                if let Err(e) = Field::EnvVarName.validate(name) {
                    problems.push(format!("env entry #{i} has invalid name set: {name:?}; {}", reason(e)));
                }
                if matches!(
                    ValueRef::parse(value),
                    ValueRef::Malformed(_) | ValueRef::Secret(_) | ValueRef::ConfigMap(_)
                ) {
                    problems.push(format!(
                        "env entry #{i} with name '{name}' has invalid value field set, it has '{value}', \
                         but allowed is only '{{{{ env:MY_ENV }}}}', '{{{{ secret:secretName:key }}}}' or \
                         '{{{{ configMap:configMapName:key }}}}'"
                    ));
                }
            }
        }
        problems
    }
}

pub(crate) fn reason(e: FuncError) -> String {
    match e {
        FuncError::Validation { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Every problem across `envs`, numbered by position.
pub fn validate_all(envs: &[Env]) -> Vec<String> {
    envs.iter().enumerate().flat_map(|(i, e)| e.problems(i)).collect()
}

/// Replace `{{ env:NAME }}` with the local variable's value.
///
/// Other values are returned as they are. Fails when the local variable is
/// not set.
pub fn interpolate(value: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<String, FuncError> {
    match ValueRef::parse(value) {
        ValueRef::LocalEnv(local) => lookup(local).ok_or_else(|| {
            FuncError::validation(
                "environment variable reference",
                value,
                format!("required local environment variable \"{local}\" is not set"),
            )
        }),
        _ => Ok(value.to_string()),
    }
}
