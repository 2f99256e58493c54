//! Clap adapter: the `func` command line.
//!
//! Parsing stays here. Each argument group converts itself into the
//! framework-independent types in [`crate::types`] with an `into_action` or
//! `invocation` method, and everything after that flows through
//! [`crate::commands`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::collections::volumes::VolumeFlags;
use crate::collections::{Env, Label, Volume};
use crate::error::FuncError;
use crate::output::OutputFormat;
use crate::settings::BuilderKind;
use crate::types::{
    CollectionAction, ConfigAction, EnvAction, GitAction, GitUpdate, Invocation, LabelAction,
    VolumeAction,
};

#[derive(Debug, Parser)]
#[command(name = "func", version, about = "Manage function projects and their configuration")]
pub struct Cli {
    /// Print verbose logs.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a function project in a directory.
    Init(InitArgs),
    /// Build the function image.
    Build(BuildArgs),
    /// Deploy the function to the cluster.
    Deploy(DeployArgs),
    /// Show a deployed function.
    Describe(DescribeArgs),
    /// List deployed functions.
    List(ListArgs),
    /// Show and change global settings.
    Config(ConfigArgs),
    /// Manage the function's environment variables.
    Envs(EnvsArgs),
    /// Manage the function's labels.
    Labels(LabelsArgs),
    /// Manage the function's volume mounts.
    Volumes(VolumesArgs),
    /// Manage the function's Git source.
    Git(GitArgs),
}

/// Options shared by commands that act on a function project.
#[derive(Debug, Clone, Args)]
pub struct PathArgs {
    /// Path to the function project.
    #[arg(short, long, env = "FUNC_PATH", default_value = ".", global = true)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ConfirmArgs {
    /// Prompt to confirm all values before acting.
    #[arg(
        short = 'c',
        long,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub confirm: Option<bool>,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    #[command(flatten)]
    pub path: PathArgs,

    /// Function name. Defaults to the directory name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Language runtime of the function.
    #[arg(short, long, env = "FUNC_LANGUAGE")]
    pub language: Option<String>,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub confirm: ConfirmArgs,

    /// Registry to derive the image from, e.g. quay.io/alice.
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Full image name, overriding the derived one.
    #[arg(short, long)]
    pub image: Option<String>,

    /// Builder to use.
    #[arg(short, long, value_enum)]
    pub builder: Option<BuilderKind>,

    /// Builder image to use.
    #[arg(long)]
    pub builder_image: Option<String>,

    /// Push to the registry without TLS verification.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub registry_insecure: Option<bool>,
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub confirm: ConfirmArgs,

    /// Registry to derive the image from, e.g. quay.io/alice.
    #[arg(short, long)]
    pub registry: Option<String>,

    /// Full image name, overriding the derived one.
    #[arg(short, long)]
    pub image: Option<String>,

    /// Namespace to deploy to.
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Name of the function. Defaults to the function at --path.
    pub name: Option<String>,

    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    /// Namespace of the function.
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Namespace to list.
    #[arg(short, long)]
    pub namespace: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub action: Option<ConfigSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show every global setting.
    List,
    /// Show one global setting and what it does.
    Get {
        /// Setting name (e.g. "registry").
        name: String,
    },
    /// Persist a global setting.
    Set {
        /// Setting name (e.g. "registry").
        name: String,
        /// Value to set.
        value: String,
    },
    /// Reset a global setting to its default.
    Unset {
        /// Setting name (e.g. "registry").
        name: String,
    },
}

impl ConfigArgs {
    /// Bare `config` and `config list` both list.
    pub fn into_action(self) -> ConfigAction {
        match self.action {
            None | Some(ConfigSubcommand::List) => ConfigAction::List,
            Some(ConfigSubcommand::Get { name }) => ConfigAction::Get { name },
            Some(ConfigSubcommand::Set { name, value }) => ConfigAction::Set { name, value },
            Some(ConfigSubcommand::Unset { name }) => ConfigAction::Unset { name },
        }
    }
}

#[derive(Debug, Args)]
pub struct EnvsArgs {
    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub action: Option<EnvsSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum EnvsSubcommand {
    /// List environment variables.
    List,
    /// Add an environment variable. Prompts when no flags are given.
    Add {
        /// Variable name.
        #[arg(long)]
        name: Option<String>,
        /// Value, or a reference such as '{{ secret:name:key }}'.
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove environment variables. Prompts when --name is not given.
    Remove {
        /// Remove every variable with this name.
        #[arg(long)]
        name: Option<String>,
    },
}

impl EnvsArgs {
    pub fn into_action(self) -> Result<EnvAction, FuncError> {
        Ok(match self.action {
            None | Some(EnvsSubcommand::List) => CollectionAction::List,
            Some(EnvsSubcommand::Add {
                name: None,
                value: None,
            }) => CollectionAction::Add(None),
            Some(EnvsSubcommand::Add { name, value }) => {
                CollectionAction::Add(Some(Env::from_flags(name, value)?))
            }
            Some(EnvsSubcommand::Remove { name }) => CollectionAction::Remove(name),
        })
    }
}

#[derive(Debug, Args)]
pub struct LabelsArgs {
    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub action: Option<LabelsSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum LabelsSubcommand {
    /// List labels.
    List,
    /// Add a label. Prompts when no flags are given.
    Add {
        /// Label key.
        #[arg(long)]
        name: Option<String>,
        /// Label value, or '{{ env:NAME }}'. Defaults to empty.
        #[arg(long)]
        value: Option<String>,
    },
    /// Remove labels. Prompts when --name is not given.
    Remove {
        /// Remove every label with this key.
        #[arg(long)]
        name: Option<String>,
    },
}

impl LabelsArgs {
    pub fn into_action(self) -> Result<LabelAction, FuncError> {
        Ok(match self.action {
            None | Some(LabelsSubcommand::List) => CollectionAction::List,
            Some(LabelsSubcommand::Add {
                name: None,
                value: None,
            }) => CollectionAction::Add(None),
            Some(LabelsSubcommand::Add {
                name: None,
                value: Some(value),
            }) => {
                return Err(FuncError::validation("label", &value, "--name is required with --value"));
            }
            Some(LabelsSubcommand::Add {
                name: Some(name),
                value,
            }) => CollectionAction::Add(Some(Label::from_flags(name, value.unwrap_or_default())?)),
            Some(LabelsSubcommand::Remove { name }) => CollectionAction::Remove(name),
        })
    }
}

#[derive(Debug, Args)]
pub struct VolumesArgs {
    #[command(flatten)]
    pub path: PathArgs,
    #[command(flatten)]
    pub output: OutputArgs,

    #[command(subcommand)]
    pub action: Option<VolumesSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum VolumesSubcommand {
    /// List volume mounts.
    List,
    /// Add a volume mount. Prompts when no flags are given.
    Add {
        /// Volume type: configmap, secret, pvc or emptydir.
        #[arg(long = "type")]
        kind: Option<String>,
        /// Name of the ConfigMap, Secret or PersistentVolumeClaim.
        #[arg(long)]
        source: Option<String>,
        /// Absolute path to mount the volume at.
        #[arg(long)]
        mount_path: Option<String>,
        /// Mount a PersistentVolumeClaim read-only.
        #[arg(long)]
        read_only: bool,
        /// Size limit of an EmptyDir, e.g. 1Gi.
        #[arg(long)]
        size: Option<String>,
        /// Storage medium of an EmptyDir: 'Memory' or empty.
        #[arg(long)]
        medium: Option<String>,
    },
    /// Remove volume mounts. Prompts when --mount-path is not given.
    Remove {
        /// Remove every volume mounted at this path.
        #[arg(long)]
        mount_path: Option<String>,
    },
}

impl VolumesArgs {
    pub fn into_action(self) -> Result<VolumeAction, FuncError> {
        Ok(match self.action {
            None | Some(VolumesSubcommand::List) => CollectionAction::List,
            Some(VolumesSubcommand::Add {
                kind,
                source,
                mount_path,
                read_only,
                size,
                medium,
            }) => {
                let flags = VolumeFlags {
                    kind,
                    source,
                    mount_path,
                    read_only,
                    size,
                    medium,
                };
                if flags.kind.is_none()
                    && flags.source.is_none()
                    && flags.mount_path.is_none()
                    && !flags.read_only
                    && flags.size.is_none()
                    && flags.medium.is_none()
                {
                    CollectionAction::Add(None)
                } else {
                    CollectionAction::Add(Some(Volume::from_flags(flags)?))
                }
            }
            Some(VolumesSubcommand::Remove { mount_path }) => CollectionAction::Remove(mount_path),
        })
    }
}

#[derive(Debug, Args)]
pub struct GitArgs {
    #[command(flatten)]
    pub path: PathArgs,

    #[command(subcommand)]
    pub action: GitSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum GitSubcommand {
    /// Set the Git source. Prompts when no flags are given.
    Set {
        /// Repository URL.
        #[arg(long = "git-url")]
        url: Option<String>,
        /// Branch, tag or commit.
        #[arg(long = "git-branch")]
        revision: Option<String>,
        /// Directory of the function inside the repository.
        #[arg(long = "git-dir")]
        context_dir: Option<String>,
    },
    /// Remove the Git source.
    Remove,
}

impl GitArgs {
    pub fn into_action(self) -> GitAction {
        match self.action {
            GitSubcommand::Set {
                url,
                revision,
                context_dir,
            } => GitAction::Set(GitUpdate {
                url,
                revision,
                context_dir,
            }),
            GitSubcommand::Remove => GitAction::Remove,
        }
    }
}

fn push_flag(flags: &mut Vec<(String, String)>, name: &str, value: Option<String>) {
    if let Some(value) = value {
        flags.push((name.to_string(), value));
    }
}

impl BuildArgs {
    pub fn invocation(&self) -> Invocation {
        let mut flags = Vec::new();
        push_flag(&mut flags, "confirm", self.confirm.confirm.map(|b| b.to_string()));
        push_flag(&mut flags, "registry", self.registry.clone());
        push_flag(&mut flags, "builder", self.builder.map(|b| b.as_str().to_string()));
        push_flag(
            &mut flags,
            "registry_insecure",
            self.registry_insecure.map(|b| b.to_string()),
        );
        Invocation {
            path: self.path.path.clone(),
            flags,
            image: self.image.clone(),
            builder_image: self.builder_image.clone(),
        }
    }
}

impl DeployArgs {
    pub fn invocation(&self) -> Invocation {
        let mut flags = Vec::new();
        push_flag(&mut flags, "confirm", self.confirm.confirm.map(|b| b.to_string()));
        push_flag(&mut flags, "registry", self.registry.clone());
        push_flag(&mut flags, "namespace", self.namespace.clone());
        Invocation {
            path: self.path.path.clone(),
            flags,
            image: self.image.clone(),
            builder_image: None,
        }
    }
}

impl DescribeArgs {
    pub fn invocation(&self) -> Invocation {
        let mut flags = Vec::new();
        push_flag(&mut flags, "namespace", self.namespace.clone());
        push_flag(&mut flags, "output", self.output.output.map(|o| o.as_str().to_string()));
        Invocation {
            path: self.path.path.clone(),
            flags,
            ..Invocation::default()
        }
    }
}

impl ListArgs {
    pub fn invocation(&self) -> Invocation {
        let mut flags = Vec::new();
        push_flag(&mut flags, "namespace", self.namespace.clone());
        push_flag(&mut flags, "output", self.output.output.map(|o| o.as_str().to_string()));
        Invocation {
            path: PathBuf::from("."),
            flags,
            ..Invocation::default()
        }
    }
}

/// Invocation for commands that only take a path and an output format.
pub fn path_invocation(path: &PathArgs, output: Option<&OutputArgs>) -> Invocation {
    let mut flags = Vec::new();
    push_flag(
        &mut flags,
        "output",
        output.and_then(|o| o.output).map(|o| o.as_str().to_string()),
    );
    Invocation {
        path: path.path.clone(),
        flags,
        ..Invocation::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn bare_config_lists() {
        let Commands::Config(args) = parse(&["func", "config"]).command else {
            panic!("expected config");
        };
        assert_eq!(args.into_action(), ConfigAction::List);
    }

    #[test]
    fn config_set_and_unset() {
        let Commands::Config(args) = parse(&["func", "config", "set", "registry", "quay.io/a"]).command
        else {
            panic!("expected config");
        };
        assert_eq!(
            args.into_action(),
            ConfigAction::Set {
                name: "registry".into(),
                value: "quay.io/a".into()
            }
        );
        let Commands::Config(args) = parse(&["func", "config", "unset", "registry"]).command else {
            panic!("expected config");
        };
        assert_eq!(args.into_action(), ConfigAction::Unset { name: "registry".into() });
    }

    #[test]
    fn config_output_flag() {
        let Commands::Config(args) = parse(&["func", "config", "-o", "json", "list"]).command else {
            panic!("expected config");
        };
        assert_eq!(args.output.output, Some(OutputFormat::Json));
    }

    #[test]
    fn envs_add_from_flags() {
        let Commands::Envs(args) =
            parse(&["func", "envs", "add", "--name", "FOO", "--value", "bar"]).command
        else {
            panic!("expected envs");
        };
        assert_eq!(
            args.into_action().unwrap(),
            CollectionAction::Add(Some(Env::new("FOO", "bar")))
        );
    }

    #[test]
    fn envs_add_without_flags_is_interactive() {
        let Commands::Envs(args) = parse(&["func", "envs", "add"]).command else {
            panic!("expected envs");
        };
        assert_eq!(args.into_action().unwrap(), CollectionAction::Add(None));
    }

    #[test]
    fn envs_add_invalid_name_fails_before_anything_runs() {
        let Commands::Envs(args) =
            parse(&["func", "envs", "add", "--name", "1FOO", "--value", "bar"]).command
        else {
            panic!("expected envs");
        };
        assert!(args.into_action().is_err());
    }

    #[test]
    fn bare_collection_command_lists() {
        let Commands::Labels(args) = parse(&["func", "labels", "-p", "/tmp/f"]).command else {
            panic!("expected labels");
        };
        assert_eq!(args.path.path, PathBuf::from("/tmp/f"));
        assert_eq!(args.into_action().unwrap(), CollectionAction::List);
    }

    #[test]
    fn labels_value_without_name_fails() {
        let Commands::Labels(args) = parse(&["func", "labels", "add", "--value", "x"]).command else {
            panic!("expected labels");
        };
        assert!(args.into_action().is_err());
    }

    #[test]
    fn labels_remove_by_key() {
        let Commands::Labels(args) = parse(&["func", "labels", "remove", "--name", "app"]).command
        else {
            panic!("expected labels");
        };
        assert_eq!(
            args.into_action().unwrap(),
            CollectionAction::Remove(Some("app".into()))
        );
    }

    #[test]
    fn volumes_add_from_flags() {
        let Commands::Volumes(args) = parse(&[
            "func",
            "volumes",
            "add",
            "--type",
            "secret",
            "--source",
            "creds",
            "--mount-path",
            "/creds",
        ])
        .command
        else {
            panic!("expected volumes");
        };
        let CollectionAction::Add(Some(volume)) = args.into_action().unwrap() else {
            panic!("expected add");
        };
        assert_eq!(volume.secret.as_deref(), Some("creds"));
        assert_eq!(volume.mount_path(), Some("/creds"));
    }

    #[test]
    fn build_flags_become_overrides() {
        let Commands::Build(args) = parse(&[
            "func",
            "build",
            "--registry",
            "quay.io/a",
            "--builder",
            "s2i",
            "-c",
            "--builder-image",
            "my/builder",
        ])
        .command
        else {
            panic!("expected build");
        };
        let inv = args.invocation();
        assert!(inv.flags.contains(&("registry".into(), "quay.io/a".into())));
        assert!(inv.flags.contains(&("builder".into(), "s2i".into())));
        assert!(inv.flags.contains(&("confirm".into(), "true".into())));
        assert_eq!(inv.builder_image.as_deref(), Some("my/builder"));
        assert_eq!(inv.path, PathBuf::from("."));
    }

    #[test]
    fn unset_flags_are_not_overrides() {
        let Commands::Deploy(args) = parse(&["func", "deploy"]).command else {
            panic!("expected deploy");
        };
        assert!(args.invocation().flags.is_empty());
    }

    #[test]
    fn confirm_can_be_turned_off_explicitly() {
        let Commands::Deploy(args) = parse(&["func", "deploy", "--confirm=false"]).command else {
            panic!("expected deploy");
        };
        assert_eq!(args.confirm.confirm, Some(false));
    }

    #[test]
    fn git_set_flags() {
        let Commands::Git(args) = parse(&[
            "func",
            "git",
            "set",
            "--git-url",
            "https://example.com/f.git",
            "--git-branch",
            "main",
        ])
        .command
        else {
            panic!("expected git");
        };
        assert_eq!(
            args.into_action(),
            GitAction::Set(GitUpdate {
                url: Some("https://example.com/f.git".into()),
                revision: Some("main".into()),
                context_dir: None,
            })
        );
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["func", "list", "-o", "csv"]).is_err());
    }
}
