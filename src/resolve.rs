//! Core resolution pipeline: layer every settings source and produce the
//! effective configuration for one invocation.
//!
//! Operates on pre-loaded data ([`ResolveInput`]) with no I/O and no process
//! environment lookups, so every precedence rule can be tested with synthetic
//! inputs. Layers, lowest first:
//!
//! 1. Static defaults (`#[config(default)]` on [`GlobalSettings`])
//! 2. The global settings file (unknown keys rejected in strict mode)
//! 3. Settings the project persisted for itself
//! 4. `FUNC_*` environment variables
//! 5. Command-line flags
//!
//! Each layer replaces whole values; nothing is merged inside a value.
//! Interactive confirmation, the sixth layer, lives in [`crate::confirm`].

use std::path::PathBuf;

use confique::Config;
use toml::{Table, Value};

use crate::env;
use crate::error::FuncError;
use crate::merge::overlay;
use crate::overrides;
use crate::project::{self, Project};
use crate::settings::{self, GlobalSettings};
use crate::validate;

/// All pre-loaded data needed to resolve settings. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct ResolveInput {
    /// Path and contents of the global settings file, if it exists.
    pub global_file: Option<(PathBuf, String)>,
    /// Settings persisted by the project, see [`project_layer`].
    pub project: Table,
    /// Raw environment variable pairs (`std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Env var prefix (e.g. `"FUNC"`). `None` disables the environment layer.
    pub env_prefix: Option<String>,
    /// Flag overrides as `(setting, value)` pairs.
    pub flag_overrides: Vec<(String, Value)>,
    /// Whether to reject unknown keys in the global file.
    pub strict: bool,
}

/// Resolve settings from pre-loaded inputs.
pub fn resolve(input: ResolveInput) -> Result<GlobalSettings, FuncError> {
    let defaults = settings::to_table(&settings::defaults()?)?;
    let mut merged = Table::new();

    if let Some((path, content)) = &input.global_file {
        if input.strict {
            validate::validate_unknown_keys::<GlobalSettings>(content, path)?;
        }
        let table: Table = toml::from_str(content).map_err(|e| FuncError::ParseError {
            path: path.clone(),
            source: e,
        })?;
        check_file_values(&table, &defaults, path)?;
        merged = overlay(merged, table);
    }

    merged = overlay(merged, input.project);

    if let Some(prefix) = &input.env_prefix {
        let env_table = env::env_to_table(prefix, input.env_vars, &defaults)?;
        merged = overlay(merged, env_table);
    }

    if !input.flag_overrides.is_empty() {
        let flag_table = overrides::overrides_to_table(&input.flag_overrides, &GlobalSettings::META)?;
        merged = overlay(merged, flag_table);
    }

    let layer: <GlobalSettings as Config>::Layer =
        Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| FuncError::InvalidValue {
                name: "settings".into(),
                value: String::new(),
                reason: e.message().to_string(),
            })?;

    let resolved = GlobalSettings::builder().preloaded(layer).load()?;
    tracing::debug!(event = "core.resolve.completed", settings = ?resolved);
    Ok(resolved)
}

/// Hand-edited string values get the same checks as `config set`: enum
/// value spaces and registry/namespace syntax.
fn check_file_values(table: &Table, defaults: &Table, path: &std::path::Path) -> Result<(), FuncError> {
    for (name, value) in table {
        if let (Some(current @ Value::String(_)), Value::String(raw)) = (defaults.get(name), value) {
            settings::coerce(name, current, raw).map_err(|e| match e {
                FuncError::InvalidValue { name, value, reason } => FuncError::InvalidValue {
                    name,
                    value,
                    reason: format!("{reason} (in {})", path.display()),
                },
                other => other,
            })?;
        }
    }
    Ok(())
}

/// The settings layer a project contributes. Only values the project
/// actually persisted are present, so an unset field never masks the layers
/// below it.
pub fn project_layer(project: &Project) -> Table {
    let mut table = Table::new();
    if let Some(builder) = project.build.builder {
        table.insert("builder".into(), Value::String(builder.as_str().into()));
    }
    if !project.runtime.is_empty() {
        table.insert("language".into(), Value::String(project.runtime.clone()));
    }
    if !project.deploy.namespace.is_empty() {
        table.insert("namespace".into(), Value::String(project.deploy.namespace.clone()));
    }
    if !project.registry.is_empty() {
        table.insert("registry".into(), Value::String(project.registry.clone()));
    }
    table
}

/// Project-only values given as flags. They have no global counterpart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFlags {
    pub image: Option<String>,
    pub builder_image: Option<String>,
}

/// A value an action cannot proceed without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// A registry to derive the image from, or an explicit image.
    Registry,
    Namespace,
}

impl Requirement {
    pub fn setting(self) -> &'static str {
        match self {
            Requirement::Registry => "registry",
            Requirement::Namespace => "namespace",
        }
    }

    fn hint(self) -> &'static str {
        match self {
            Requirement::Registry => {
                "Provide --registry or --image, set FUNC_REGISTRY, or run `func config set registry <registry>`."
            }
            Requirement::Namespace => {
                "Provide --namespace, set FUNC_NAMESPACE, or run `func config set namespace <namespace>`."
            }
        }
    }
}

/// Everything one invocation acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub settings: GlobalSettings,
    /// Explicit image, empty when it should be derived from the registry.
    pub image: String,
    /// Whether `image` came from a flag or `FUNC_IMAGE` rather than the
    /// project. A saved image follows registry changes; an explicit one never does.
    pub image_explicit: bool,
    pub builder_image: Option<String>,
    pub project: Project,
}

impl EffectiveConfig {
    /// Resolve settings with `project` as the project layer, then the
    /// project-only values: flag, then `FUNC_IMAGE`/`FUNC_BUILDER_IMAGE`, then
    /// what the project persisted.
    pub fn resolve(
        mut input: ResolveInput,
        project: Project,
        flags: ProjectFlags,
    ) -> Result<Self, FuncError> {
        input.project = project_layer(&project);
        let from_env = |suffix: &str| {
            input
                .env_prefix
                .as_deref()
                .and_then(|prefix| env::lookup(prefix, &input.env_vars, suffix))
                .filter(|v| !v.is_empty())
        };
        let image_env = from_env("IMAGE");
        let builder_image_env = from_env("BUILDER_IMAGE");

        let settings = resolve(input)?;

        let explicit = flags.image.filter(|v| !v.is_empty()).or(image_env);
        let image_explicit = explicit.is_some();
        let image = explicit.unwrap_or_else(|| project.image.clone());
        let builder_image = flags
            .builder_image
            .filter(|v| !v.is_empty())
            .or(builder_image_env)
            .or_else(|| project.build.builder_images.get(settings.builder.as_str()).cloned());

        Ok(Self {
            settings,
            image,
            image_explicit,
            builder_image,
            project,
        })
    }

    /// Requirements from `wanted` that have no value.
    pub fn missing(&self, wanted: &[Requirement]) -> Vec<Requirement> {
        wanted
            .iter()
            .copied()
            .filter(|r| match r {
                Requirement::Registry => self.settings.registry.is_empty() && self.image.is_empty(),
                Requirement::Namespace => self.settings.namespace.is_empty(),
            })
            .collect()
    }

    pub fn require(&self, wanted: &[Requirement]) -> Result<(), FuncError> {
        match self.missing(wanted).first() {
            Some(r) => Err(FuncError::RequiredValueMissing {
                setting: r.setting(),
                hint: r.hint().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// The saved image moved under the configured registry, when the two
    /// disagree. Only the last path segment (name and tag) is kept.
    pub fn retagged_image(&self) -> Option<String> {
        let registry = self.settings.registry.trim_matches('/');
        if self.image_explicit || registry.is_empty() || !self.image.find('/').is_some_and(|i| i > 0) {
            return None;
        }
        let prefix = if registry.contains('/') {
            registry.to_string()
        } else {
            format!("{}/{registry}", project::DEFAULT_REGISTRY)
        };
        if self.image.starts_with(&format!("{prefix}/")) {
            return None;
        }
        let last = self.image.rsplit('/').next()?;
        Some(format!("{prefix}/{last}"))
    }

    /// Message telling the user the saved image is being retagged.
    pub fn registry_warning(&self) -> Option<String> {
        self.retagged_image().map(|updated| {
            format!(
                "Warning: function has current image '{}' which has a different registry than the \
                 currently configured registry '{}'. The new image tag will be '{updated}'. \
                 To use an explicit image, use --image.",
                self.image, self.settings.registry
            )
        })
    }

    /// The image to act on: the explicit one, else the saved one (retagged
    /// when the registry changed), else derived from registry and function
    /// name.
    pub fn image(&self) -> Result<String, FuncError> {
        if let Some(updated) = self.retagged_image() {
            return Ok(updated);
        }
        if !self.image.is_empty() {
            return Ok(self.image.clone());
        }
        project::derive_image(&self.settings.registry, &self.project.name)
    }

    /// Record the values a build uses in the project.
    pub fn configure_build(&mut self) -> Result<(), FuncError> {
        self.require(&[Requirement::Registry])?;
        let image = self.image()?;
        let builder = self.settings.builder;
        let project = &mut self.project;
        if !self.settings.registry.is_empty() {
            project.registry = self.settings.registry.clone();
        }
        project.build.builder = Some(builder);
        if let Some(builder_image) = &self.builder_image {
            project
                .build
                .builder_images
                .insert(builder.as_str().to_string(), builder_image.clone());
        }
        if project.image != image {
            project.image_digest.clear();
        }
        project.image = image.clone();
        self.image = image;
        Ok(())
    }

    /// Record the values a deployment used in the project.
    pub fn configure_deploy(&mut self) -> Result<(), FuncError> {
        self.require(&[Requirement::Registry, Requirement::Namespace])?;
        let image = self.image()?;
        let project = &mut self.project;
        if !self.settings.registry.is_empty() {
            project.registry = self.settings.registry.clone();
        }
        project.deploy.namespace = self.settings.namespace.clone();
        if project.image != image {
            project.image_digest.clear();
        }
        project.image = image.clone();
        self.image = image;
        Ok(())
    }
}
