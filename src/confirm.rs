//! Interactive confirmation: the topmost layer of the cascade.
//!
//! Without a terminal nothing is asked and missing requirements become
//! errors. With `confirm` on, every value the command lists is offered for
//! editing with its resolved value as the default. Otherwise only missing
//! requirements are asked for. Advanced settings (verbose, output,
//! registry_insecure, builder image, language) are never prompted.

use crate::error::FuncError;
use crate::names::Field;
use crate::prompt::{self, Prompter};
use crate::resolve::{EffectiveConfig, Requirement};
use crate::settings::BuilderKind;

/// A value that can be confirmed at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promptable {
    Registry,
    Image,
    Builder,
    Namespace,
}

/// What a command needs confirmed.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmRequest<'a> {
    /// Values offered for editing when confirming, in prompt order.
    pub promptable: &'a [Promptable],
    /// Values that must end up non-empty.
    pub requirements: &'a [Requirement],
}

pub const BUILD: ConfirmRequest<'static> = ConfirmRequest {
    promptable: &[Promptable::Registry, Promptable::Image, Promptable::Builder],
    requirements: &[Requirement::Registry],
};

pub const DEPLOY: ConfirmRequest<'static> = ConfirmRequest {
    promptable: &[Promptable::Registry, Promptable::Image, Promptable::Namespace],
    requirements: &[Requirement::Registry, Requirement::Namespace],
};

/// Apply the interactive layer to `config`.
pub fn confirm(
    mut config: EffectiveConfig,
    request: ConfirmRequest<'_>,
    prompter: &mut dyn Prompter,
) -> Result<EffectiveConfig, FuncError> {
    if !prompter.is_interactive() {
        tracing::debug!(event = "core.confirm.skipped", reason = "not interactive");
        config.require(request.requirements)?;
        return Ok(config);
    }

    if config.settings.confirm {
        for &value in request.promptable {
            ask(&mut config, value, prompter)?;
        }
    } else {
        for missing in config.missing(request.requirements) {
            match missing {
                Requirement::Registry => ask(&mut config, Promptable::Registry, prompter)?,
                Requirement::Namespace => ask(&mut config, Promptable::Namespace, prompter)?,
            }
        }
    }

    config.require(request.requirements)?;
    tracing::debug!(event = "core.confirm.completed", confirmed = config.settings.confirm);
    Ok(config)
}

fn ask(config: &mut EffectiveConfig, value: Promptable, prompter: &mut dyn Prompter) -> Result<(), FuncError> {
    match value {
        Promptable::Registry => {
            let image_given = !config.image.is_empty();
            let answer = prompt::ask_validated(
                prompter,
                "Registry for function images:",
                &config.settings.registry,
                |v| {
                    if v.is_empty() && image_given {
                        Ok(())
                    } else {
                        Field::Registry.validate(v)
                    }
                },
            )?;
            config.settings.registry = answer;
        }
        Promptable::Image => {
            let default = config.image().unwrap_or_default();
            let answer = prompter.input("Full image name (e.g. quay.io/boson/node-sample):", &default)?;
            config.image_explicit = !answer.is_empty();
            config.image = answer;
        }
        Promptable::Builder => {
            let options: Vec<String> = [BuilderKind::Pack, BuilderKind::S2i]
                .iter()
                .map(|b| b.as_str().to_string())
                .collect();
            let current = usize::from(config.settings.builder == BuilderKind::S2i);
            let chosen = prompter.select("Builder:", &options, current)?;
            config.settings.builder = if chosen == 1 {
                BuilderKind::S2i
            } else {
                BuilderKind::Pack
            };
        }
        Promptable::Namespace => {
            let answer = prompt::ask_validated(
                prompter,
                "Namespace:",
                &config.settings.namespace,
                |v| {
                    if v.is_empty() {
                        Err(FuncError::validation("namespace", v, "must not be empty"))
                    } else {
                        Field::Namespace.validate(v)
                    }
                },
            )?;
            config.settings.namespace = answer;
        }
    }
    Ok(())
}
