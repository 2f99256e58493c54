//! Labels attached to the deployed function.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::envs::{LOCAL_ENV, reason};
use super::{Entry, PromptContext};
use crate::error::FuncError;
use crate::names::Field;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// Entry from `--name`/`--value` flags.
    pub fn from_flags(key: String, value: String) -> Result<Self, FuncError> {
        Field::LabelKey.validate(&key)?;
        Field::LabelValue.validate(&value)?;
        let label = Label::new(key, value);
        let problems = label.problems(0);
        if !problems.is_empty() {
            return Err(FuncError::validation("label", &label.to_string(), problems.join("; ")));
        }
        Ok(label)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, &self.value) {
            (Some(key), None) => write!(f, "Label with key \"{key}\""),
            (Some(key), Some(value)) => match LOCAL_ENV.captures(value).and_then(|c| c.get(1)) {
                Some(local) => write!(
                    f,
                    "Label with key \"{key}\" and value set from local env variable \"{}\"",
                    local.as_str()
                ),
                None => write!(f, "Label with key \"{key}\" and value \"{value}\""),
            },
            (None, Some(value)) => write!(f, "Label without key and value \"{value}\""),
            (None, None) => write!(f, "Empty label entry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Value,
    LocalEnv,
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LabelKind::Value => "Label with a specified value",
            LabelKind::LocalEnv => "Value from a local environment variable",
        })
    }
}

const KINDS: [LabelKind; 2] = [LabelKind::Value, LabelKind::LocalEnv];

impl Entry for Label {
    const NOUN: &'static str = "label";
    const NOUN_PLURAL: &'static str = "labels";
    const XML_NAME: &'static str = "label";

    type Kind = LabelKind;

    fn kinds() -> &'static [LabelKind] {
        &KINDS
    }

    fn prompt(kind: LabelKind, ctx: &mut PromptContext<'_>) -> Result<Self, FuncError> {
        let key = ctx.validated("Please specify the label key:", Field::LabelKey)?;
        match kind {
            LabelKind::Value => {
                let value = ctx.validated("Please specify the label value:", Field::LabelValue)?;
                Ok(Label::new(key, value))
            }
            LabelKind::LocalEnv => {
                let local = ctx.validated("Please specify the local environment variable:", Field::EnvVarName)?;
                if !ctx.local_env_is_set(&local) {
                    tracing::warn!(event = "core.labels.local_variable_unset", variable = %local);
                    ctx.prompter.notice(&format!(
                        "Warning: specified local environment variable \"{local}\" is not set"
                    ));
                }
                Ok(Label::new(key, format!("{{{{ env:{local} }}}}")))
            }
        }
    }

    fn problems(&self, i: usize) -> Vec<String> {
        let mut problems = Vec::new();
        match (&self.key, &self.value) {
            (None, None) => problems.push(format!("label entry #{i} is not properly set")),
            (None, Some(value)) => problems.push(format!(
                "label entry #{i} is missing key field, only value '{value}' is set"
            )),
            (Some(key), value) => {
                if let Err(e) = Field::LabelKey.validate(key) {
                    problems.push(format!("label entry #{i} has invalid key set: {key:?}; {}", reason(e)));
                }
                if let Some(value) = value {
                    if let Err(e) = Field::LabelValue.validate(value) {
                        problems.push(format!(
                            "label entry #{i} has invalid value set: {value:?}; {}",
                            reason(e)
                        ));
                    }
                    if value.starts_with("{{") && !LOCAL_ENV.is_match(value) {
                        problems.push(format!(
                            "label entry #{i} with key '{key}' has invalid value field set, it has '{value}', \
                             but allowed is only '{{{{ env:MY_ENV }}}}'"
                        ));
                    }
                }
            }
        }
        problems
    }
}

/// Every problem across `labels`, numbered by position.
pub fn validate_all(labels: &[Label]) -> Vec<String> {
    labels.iter().enumerate().flat_map(|(i, l)| l.problems(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{PromptContext, add_interactive};
    use crate::fixtures::test::NoResources;
    use crate::prompt::ScriptedPrompter;

    #[test]
    fn renders_like_the_cli_prints_them() {
        assert_eq!(
            Label::new("app", "web").to_string(),
            "Label with key \"app\" and value \"web\""
        );
        assert_eq!(
            Label::new("team", "{{ env:TEAM }}").to_string(),
            "Label with key \"team\" and value set from local env variable \"TEAM\""
        );
        let key_only = Label {
            key: Some("tier".into()),
            value: None,
        };
        assert_eq!(key_only.to_string(), "Label with key \"tier\"");
    }

    #[test]
    fn validation_aggregates() {
        let labels = vec![
            Label::default(),
            Label {
                key: None,
                value: Some("v".into()),
            },
            Label::new("-bad", "ok"),
            Label::new("ok", "{{ secret:x }}"),
            Label::new("fine", ""),
        ];
        let problems = validate_all(&labels);
        assert_eq!(problems.len(), 4);
        assert!(problems[0].contains("#0 is not properly set"));
        assert!(problems[1].contains("#1 is missing key field"));
        assert!(problems[2].contains("#2 has invalid key"));
        assert!(problems[3].contains("#3 with key 'ok'"));
    }

    #[test]
    fn from_flags_validates_key_and_value() {
        assert!(Label::from_flags("app".into(), "web".into()).is_ok());
        assert!(Label::from_flags("bad key".into(), "web".into()).is_err());
        assert!(Label::from_flags("app".into(), "-web".into()).is_err());
        assert!(Label::from_flags("app".into(), "{{ nope }}".into()).is_err());
    }

    #[test]
    fn prompt_reprompts_invalid_key() {
        let mut p = ScriptedPrompter::new(["Label with a specified value", "bad key", "app", "web"]);
        let mut ctx = PromptContext {
            prompter: &mut p,
            resources: &NoResources,
            namespace: "default".into(),
            local_env: &[],
        };
        let out = add_interactive::<Label>(&[], &mut ctx).unwrap();
        assert_eq!(out, vec![Label::new("app", "web")]);
        assert_eq!(p.notices.len(), 1);
    }

    #[test]
    fn prompt_local_env_known_variable_no_warning() {
        let local = vec![("TEAM".to_string(), "core".to_string())];
        let mut p = ScriptedPrompter::new(["Value from a local environment variable", "team", "TEAM"]);
        let mut ctx = PromptContext {
            prompter: &mut p,
            resources: &NoResources,
            namespace: "default".into(),
            local_env: &local,
        };
        let out = add_interactive::<Label>(&[], &mut ctx).unwrap();
        assert_eq!(out, vec![Label::new("team", "{{ env:TEAM }}")]);
        assert!(p.notices.is_empty());
    }
}
