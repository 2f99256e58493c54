//! Command handlers: resolve, confirm, mutate, persist.
//!
//! Every handler works against a [`Context`] holding the pre-read process
//! environment, a prompter, an output sink and the external collaborators,
//! so whole commands run in tests without a terminal or a cluster.
//!
//! When each handler writes `func.yaml` relative to its action is decided
//! per command and noted at the call site.

use std::io::Write;
use std::path::PathBuf;

use toml::Value;

use crate::cli::{self, Cli, Commands, InitArgs};
use crate::collaborators::{
    BuildRequest, DeployRequest, Deployer, Describer, ImageBuilder, InstanceList, Lister,
    ResourceEnumerator,
};
use crate::collections::{self, Entry, EntryList, Env, Label, PromptContext, Volume};
use crate::confirm;
use crate::env;
use crate::error::FuncError;
use crate::names::Field;
use crate::ops;
use crate::output::{self, OutputFormat};
use crate::persist;
use crate::project::{self, Project};
use crate::prompt::{self, Prompter};
use crate::resolve::{self, EffectiveConfig, ProjectFlags, ResolveInput};
use crate::settings::{self, GlobalSettings};
use crate::types::{CollectionAction, ConfigAction, GitAction, GitUpdate, Invocation};

/// The external tools a command may call.
pub struct Collaborators<'a> {
    pub builder: &'a dyn ImageBuilder,
    pub deployer: &'a dyn Deployer,
    pub describer: &'a dyn Describer,
    pub lister: &'a dyn Lister,
    pub resources: &'a dyn ResourceEnumerator,
}

pub struct Context<'a> {
    /// Global settings file; `None` when no config directory exists.
    pub config_file: Option<PathBuf>,
    /// The process environment, read once at startup.
    pub env_vars: Vec<(String, String)>,
    pub prompter: &'a mut dyn Prompter,
    pub out: &'a mut dyn Write,
    pub tools: Collaborators<'a>,
}

impl Context<'_> {
    fn resolve_input(&self, inv: &Invocation) -> Result<ResolveInput, FuncError> {
        let global_file = match &self.config_file {
            Some(path) => persist::read_optional(path)?.map(|content| (path.clone(), content)),
            None => None,
        };
        Ok(ResolveInput {
            global_file,
            project: toml::Table::new(),
            env_vars: self.env_vars.clone(),
            env_prefix: Some(env::PREFIX.to_string()),
            flag_overrides: typed_flags(&inv.flags)?,
            strict: true,
        })
    }

    /// Settings without a project layer.
    fn settings(&self, inv: &Invocation) -> Result<GlobalSettings, FuncError> {
        resolve::resolve(self.resolve_input(inv)?)
    }

    fn effective(&self, inv: &Invocation, project: Project) -> Result<EffectiveConfig, FuncError> {
        let flags = ProjectFlags {
            image: inv.image.clone(),
            builder_image: inv.builder_image.clone(),
        };
        EffectiveConfig::resolve(self.resolve_input(inv)?, project, flags)
    }

    /// Whether debug logging should be on: the flag, else the resolved
    /// `verbose` setting. Unreadable settings count as off.
    pub fn verbose(&self, flag: bool) -> bool {
        flag || self
            .settings(&Invocation::default())
            .map(|s| s.verbose)
            .unwrap_or(false)
    }

    fn say(&mut self, message: impl std::fmt::Display) -> Result<(), FuncError> {
        writeln!(self.out, "{message}").map_err(output::io_error)
    }
}

/// Type flag values after the setting they override.
fn typed_flags(flags: &[(String, String)]) -> Result<Vec<(String, Value)>, FuncError> {
    let defaults = settings::to_table(&settings::defaults()?)?;
    flags
        .iter()
        .map(|(name, raw)| -> Result<(String, Value), FuncError> {
            let value = match defaults.get(name) {
                Some(current) => settings::coerce(name, current, raw)?,
                None => Value::String(raw.clone()),
            };
            Ok((name.clone(), value))
        })
        .collect()
}

pub fn run(cli: Cli, ctx: &mut Context<'_>) -> Result<(), FuncError> {
    match cli.command {
        Commands::Init(args) => init(ctx, args),
        Commands::Build(args) => build(ctx, &args.invocation()),
        Commands::Deploy(args) => deploy(ctx, &args.invocation()),
        Commands::Describe(args) => {
            let inv = args.invocation();
            describe(ctx, &inv, args.name.as_deref())
        }
        Commands::List(args) => list(ctx, &args.invocation()),
        Commands::Config(args) => {
            let inv = Invocation {
                flags: output_flag(args.output.output),
                ..Invocation::default()
            };
            config(ctx, &inv, &args.into_action())
        }
        Commands::Envs(args) => {
            let inv = cli::path_invocation(&args.path, Some(&args.output));
            collection::<Env>(ctx, &inv, args.into_action()?)
        }
        Commands::Labels(args) => {
            let inv = cli::path_invocation(&args.path, Some(&args.output));
            collection::<Label>(ctx, &inv, args.into_action()?)
        }
        Commands::Volumes(args) => {
            let inv = cli::path_invocation(&args.path, Some(&args.output));
            collection::<Volume>(ctx, &inv, args.into_action()?)
        }
        Commands::Git(args) => {
            let inv = cli::path_invocation(&args.path, None);
            git(ctx, &inv, args.into_action())
        }
    }
}

fn output_flag(format: Option<OutputFormat>) -> Vec<(String, String)> {
    format
        .map(|f| vec![("output".to_string(), f.as_str().to_string())])
        .unwrap_or_default()
}

fn init(ctx: &mut Context<'_>, args: InitArgs) -> Result<(), FuncError> {
    let inv = cli::path_invocation(&args.path, None);
    let root = std::path::absolute(&inv.path).map_err(|source| FuncError::IoError {
        path: inv.path.clone(),
        source,
    })?;
    let settings = ctx.settings(&inv)?;
    let interactive = ctx.prompter.is_interactive();

    let language = match args
        .language
        .filter(|l| !l.is_empty())
        .or_else(|| Some(settings.language.clone()).filter(|l| !l.is_empty()))
    {
        Some(language) => language,
        None if interactive => prompt::ask_validated(&mut *ctx.prompter, "Language runtime:", "", |v| {
            if v.trim().is_empty() {
                Err(FuncError::validation("language", v, "must not be empty"))
            } else {
                Ok(())
            }
        })?,
        None => {
            return Err(FuncError::RequiredValueMissing {
                setting: "language",
                hint: "Provide --language, set FUNC_LANGUAGE, or run `func config set language <language>`."
                    .into(),
            });
        }
    };

    let derived = project::name_from_path(&root);
    let name = match args.name {
        Some(name) => name,
        None if interactive && Field::FunctionName.validate(&derived).is_err() => {
            prompt::ask_validated(&mut *ctx.prompter, "Function name:", "", |v| {
                Field::FunctionName.validate(v)
            })?
        }
        None => derived,
    };

    let project = Project::init(&root, &name, &language)?;
    ctx.say(format!(
        "Created {} function '{}' in {}",
        project.runtime,
        project.name,
        root.display()
    ))
}

fn build(ctx: &mut Context<'_>, inv: &Invocation) -> Result<(), FuncError> {
    let project = Project::load_initialized(&inv.path)?;
    let config = ctx.effective(inv, project)?;
    let mut config = confirm::confirm(config, confirm::BUILD, &mut *ctx.prompter)?;
    warn_on_retag(ctx, &config);
    config.configure_build()?;

    // Configure-then-act: registry, builder and image are recorded before
    // the build starts and stay recorded if it fails.
    config.project.write()?;

    let request = BuildRequest {
        root: config.project.root.clone(),
        image: config.image.clone(),
        builder: config.settings.builder,
        builder_image: config.builder_image.clone(),
        registry_insecure: config.settings.registry_insecure,
    };
    tracing::info!(event = "core.build.started", image = %request.image, builder = %request.builder);
    ctx.tools.builder.build(&request)?;
    tracing::info!(event = "core.build.completed", image = %request.image);
    ctx.say(format!("Function image built: {}", request.image))
}

fn deploy(ctx: &mut Context<'_>, inv: &Invocation) -> Result<(), FuncError> {
    let project = Project::load_initialized(&inv.path)?;
    let config = ctx.effective(inv, project)?;
    let mut config = confirm::confirm(config, confirm::DEPLOY, &mut *ctx.prompter)?;
    warn_on_retag(ctx, &config);
    config.configure_deploy()?;
    config.project.validate()?;

    let project = &config.project;
    let request = DeployRequest {
        name: project.name.clone(),
        namespace: config.settings.namespace.clone(),
        image: project.image_with_digest(),
        envs: project.run.envs.clone(),
        labels: project.deploy.labels.clone(),
        volumes: project.run.volumes.clone(),
    };
    tracing::info!(event = "core.deploy.started", name = %request.name, namespace = %request.namespace);
    let instance = ctx.tools.deployer.deploy(&request)?;

    // Act-then-write: namespace and image are only recorded once the
    // deployment went through.
    config.project.write()?;
    tracing::info!(event = "core.deploy.completed", url = %instance.url);
    ctx.say(format!(
        "Function deployed in namespace \"{}\" and exposed at URL:\n   {}",
        instance.namespace, instance.url
    ))
}

/// The saved image is about to move to the configured registry; say so.
fn warn_on_retag(ctx: &mut Context<'_>, config: &EffectiveConfig) {
    if let Some(warning) = config.registry_warning() {
        tracing::debug!(event = "core.image.retagged", from = %config.image, registry = %config.settings.registry);
        ctx.prompter.notice(&warning);
    }
}

fn describe(ctx: &mut Context<'_>, inv: &Invocation, name: Option<&str>) -> Result<(), FuncError> {
    let (name, settings) = match name {
        Some(name) => (name.to_string(), ctx.settings(inv)?),
        None => {
            let project = Project::load_initialized(&inv.path)?;
            let config = ctx.effective(inv, project)?;
            (config.project.name, config.settings)
        }
    };
    let instance = ctx.tools.describer.describe(&name, &settings.namespace)?;
    output::write(&instance, settings.output, ctx.out)
}

fn list(ctx: &mut Context<'_>, inv: &Invocation) -> Result<(), FuncError> {
    let settings = ctx.settings(inv)?;
    let instances = ctx.tools.lister.list(&settings.namespace)?;
    output::write(&InstanceList(instances), settings.output, ctx.out)
}

fn config(ctx: &mut Context<'_>, inv: &Invocation, action: &ConfigAction) -> Result<(), FuncError> {
    let path = ctx.config_file.clone().ok_or_else(|| FuncError::RequiredValueMissing {
        setting: "FUNC_CONFIG_FILE",
        hint: "No config directory could be determined; set FUNC_CONFIG_FILE to the settings file path."
            .into(),
    })?;
    let format = ctx.settings(inv)?.output;
    let result = ops::handle(action, &path)?;
    result.render(format, ctx.out)
}

/// Where each collection lives in the project and how flag removal picks
/// its entries.
trait Stored: Entry {
    /// Flag that selects entries for removal.
    const SELECTOR: &'static str;

    fn entries(project: &Project) -> &[Self];
    fn replace(project: &mut Project, entries: Vec<Self>);
    fn selected_by(&self, selector: &str) -> bool;
}

impl Stored for Env {
    const SELECTOR: &'static str = "--name";

    fn entries(project: &Project) -> &[Self] {
        &project.run.envs
    }

    fn replace(project: &mut Project, entries: Vec<Self>) {
        project.run.envs = entries;
    }

    fn selected_by(&self, selector: &str) -> bool {
        self.name.as_deref() == Some(selector)
    }
}

impl Stored for Label {
    const SELECTOR: &'static str = "--name";

    fn entries(project: &Project) -> &[Self] {
        &project.deploy.labels
    }

    fn replace(project: &mut Project, entries: Vec<Self>) {
        project.deploy.labels = entries;
    }

    fn selected_by(&self, selector: &str) -> bool {
        self.key.as_deref() == Some(selector)
    }
}

impl Stored for Volume {
    const SELECTOR: &'static str = "--mount-path";

    fn entries(project: &Project) -> &[Self] {
        &project.run.volumes
    }

    fn replace(project: &mut Project, entries: Vec<Self>) {
        project.run.volumes = entries;
    }

    fn selected_by(&self, selector: &str) -> bool {
        self.mount_path() == Some(selector)
    }
}

/// List, add or remove entries. Every mutation builds the new collection
/// first; `func.yaml` is written once, after the splice.
fn collection<T: Stored>(
    ctx: &mut Context<'_>,
    inv: &Invocation,
    action: CollectionAction<T>,
) -> Result<(), FuncError> {
    let mut project = Project::load_initialized(&inv.path)?;

    let updated = match action {
        CollectionAction::List => {
            let format = ctx.settings(inv)?.output;
            return output::write(&EntryList(T::entries(&project)), format, ctx.out);
        }
        CollectionAction::Add(Some(entry)) => collections::append(T::entries(&project), entry),
        CollectionAction::Add(None) => {
            if !ctx.prompter.is_interactive() {
                return Err(FuncError::RequiredValueMissing {
                    setting: T::NOUN,
                    hint: format!("Pass the {} as flags, or run from a terminal.", T::NOUN),
                });
            }
            let namespace = ctx.effective(inv, project.clone())?.settings.namespace;
            let mut prompt_ctx = PromptContext {
                prompter: &mut *ctx.prompter,
                resources: ctx.tools.resources,
                namespace,
                local_env: &ctx.env_vars,
            };
            collections::add_interactive(T::entries(&project), &mut prompt_ctx)?
        }
        CollectionAction::Remove(Some(selector)) => {
            collections::remove_all(T::entries(&project), |e| e.selected_by(&selector))
                .ok_or(FuncError::NoMatch {
                    noun: T::NOUN,
                    selector,
                })?
        }
        CollectionAction::Remove(None) => {
            if T::entries(&project).is_empty() {
                return ctx.say(format!("There are no configured {}", T::NOUN_PLURAL));
            }
            if !ctx.prompter.is_interactive() {
                return Err(FuncError::RequiredValueMissing {
                    setting: T::NOUN,
                    hint: format!("Pass {} to choose what to remove, or run from a terminal.", T::SELECTOR),
                });
            }
            match collections::remove_interactive(T::entries(&project), &mut *ctx.prompter)? {
                Some(updated) => updated,
                None => return ctx.say(format!("No {} removed", T::NOUN)),
            }
        }
    };

    let before = T::entries(&project).len();
    let after = updated.len();
    T::replace(&mut project, updated);
    project.write()?;
    if after > before {
        ctx.say(format!("Added {}", T::NOUN))
    } else {
        ctx.say(format!("Removed {} {}", before - after, pluralize(before - after, T::NOUN, T::NOUN_PLURAL)))
    }
}

fn pluralize<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

fn git(ctx: &mut Context<'_>, inv: &Invocation, action: GitAction) -> Result<(), FuncError> {
    let mut project = Project::load_initialized(&inv.path)?;
    match action {
        GitAction::Set(update) => {
            let update = if update.is_empty() {
                ask_git(ctx, &project)?
            } else {
                update
            };
            let git = &mut project.build.git;
            if let Some(url) = update.url {
                git.url = Some(url);
            }
            if let Some(revision) = update.revision {
                git.revision = Some(revision);
            }
            if let Some(dir) = update.context_dir {
                git.context_dir = Some(dir);
            }
            project.write()?;
            ctx.say("Git source updated")
        }
        GitAction::Remove => {
            if project.build.git.is_empty() {
                return ctx.say("There is no Git source configured");
            }
            project.build.git = Default::default();
            project.write()?;
            ctx.say("Git source removed")
        }
    }
}

fn ask_git(ctx: &mut Context<'_>, project: &Project) -> Result<GitUpdate, FuncError> {
    if !ctx.prompter.is_interactive() {
        return Err(FuncError::RequiredValueMissing {
            setting: "git url",
            hint: "Provide --git-url, --git-branch or --git-dir.".into(),
        });
    }
    let current = &project.build.git;
    let non_empty = |s: String| Some(s).filter(|s| !s.trim().is_empty());
    let url = ctx
        .prompter
        .input("Git repository URL:", current.url.as_deref().unwrap_or(""))?;
    let revision = ctx.prompter.input(
        "Git branch, tag or commit (optional):",
        current.revision.as_deref().unwrap_or(""),
    )?;
    let context_dir = ctx.prompter.input(
        "Directory of the function in the repository (optional):",
        current.context_dir.as_deref().unwrap_or(""),
    )?;
    Ok(GitUpdate {
        url: non_empty(url),
        revision: non_empty(revision),
        context_dir: non_empty(context_dir),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Instance;
    use crate::fixtures::test::{FakeCluster, RecordingBuilder, StaticResources, hello_project};
    use crate::prompt::ScriptedPrompter;
    use crate::settings::BuilderKind;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        env: Vec<(String, String)>,
        builder: RecordingBuilder,
        cluster: FakeCluster,
        resources: StaticResources,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir(dir.path().join("hello")).unwrap();
            Self {
                dir,
                env: Vec::new(),
                builder: RecordingBuilder::default(),
                cluster: FakeCluster::default(),
                resources: StaticResources::default(),
            }
        }

        fn with_project(self) -> Self {
            hello_project(&self.root());
            self
        }

        fn root(&self) -> PathBuf {
            self.dir.path().join("hello")
        }

        fn config_file(&self) -> PathBuf {
            self.dir.path().join("config").join("config.toml")
        }

        fn project(&self) -> Project {
            Project::load(&self.root()).unwrap()
        }

        fn exec(&self, prompter: &mut dyn Prompter, args: &[&str]) -> Result<String, FuncError> {
            let root = self.root().display().to_string();
            let mut argv = vec!["func"];
            argv.extend_from_slice(args);
            if !matches!(args.first(), Some(&"config") | Some(&"list")) {
                argv.extend_from_slice(&["--path", &root]);
            }
            let cli = Cli::try_parse_from(argv).unwrap();
            let mut out = Vec::new();
            let mut ctx = Context {
                config_file: Some(self.config_file()),
                env_vars: self.env.clone(),
                prompter,
                out: &mut out,
                tools: Collaborators {
                    builder: &self.builder,
                    deployer: &self.cluster,
                    describer: &self.cluster,
                    lister: &self.cluster,
                    resources: &self.resources,
                },
            };
            run(cli, &mut ctx)?;
            Ok(String::from_utf8(out).unwrap())
        }

        fn batch(&self, args: &[&str]) -> Result<String, FuncError> {
            self.exec(&mut ScriptedPrompter::non_interactive(), args)
        }
    }

    #[test]
    fn envs_add_then_list_as_json() {
        let h = Harness::new().with_project();
        assert_eq!(h.batch(&["envs", "list"]).unwrap(), "There are no configured environment variables\n");
        h.batch(&["envs", "add", "--name", "FOO", "--value", "bar"]).unwrap();

        let human = h.batch(&["envs", "list"]).unwrap();
        assert_eq!(human, "Configured environment variables:\n - Env \"FOO\" with value \"bar\"\n");

        let json = h.batch(&["envs", "list", "-o", "json"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!([{"name": "FOO", "value": "bar"}]));
    }

    #[test]
    fn label_inserted_before_chosen_entry() {
        let h = Harness::new().with_project();
        h.batch(&["labels", "add", "--name", "a", "--value", "b"]).unwrap();
        h.batch(&["labels", "add", "--name", "c", "--value", "d"]).unwrap();

        let mut p = ScriptedPrompter::new([
            "Insert before:  Label with key \"a\" and value \"b\"",
            "Label with a specified value",
            "e",
            "f",
        ]);
        h.exec(&mut p, &["labels", "add"]).unwrap();

        let keys: Vec<_> = h
            .project()
            .deploy
            .labels
            .iter()
            .map(|l| format!("{}={}", l.key.clone().unwrap(), l.value.clone().unwrap()))
            .collect();
        assert_eq!(keys, vec!["e=f", "a=b", "c=d"]);
    }

    #[test]
    fn cancelled_add_writes_nothing() {
        let h = Harness::new().with_project();
        h.batch(&["envs", "add", "--name", "A", "--value", "1"]).unwrap();
        let before = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();

        let mut p = ScriptedPrompter::new(["", "Environment variable with a specified value", "B"]);
        let err = h.exec(&mut p, &["envs", "add"]).unwrap_err();
        assert!(matches!(err, FuncError::Cancelled));
        let after = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn interactive_add_requires_a_terminal() {
        let h = Harness::new().with_project();
        let err = h.batch(&["volumes", "add"]).unwrap_err();
        assert!(matches!(err, FuncError::RequiredValueMissing { .. }));
    }

    #[test]
    fn flag_removal_removes_every_match() {
        let h = Harness::new().with_project();
        h.batch(&["envs", "add", "--name", "A", "--value", "1"]).unwrap();
        h.batch(&["envs", "add", "--name", "B", "--value", "2"]).unwrap();
        h.batch(&["envs", "add", "--name", "A", "--value", "3"]).unwrap();
        let out = h.batch(&["envs", "remove", "--name", "A"]).unwrap();
        assert_eq!(out, "Removed 2 environment variables\n");
        assert_eq!(h.project().run.envs, vec![Env::new("B", "2")]);
    }

    #[test]
    fn flag_removal_without_match_fails_and_writes_nothing() {
        let h = Harness::new().with_project();
        h.batch(&["volumes", "add", "--type", "secret", "--source", "s", "--mount-path", "/s"]).unwrap();
        let before = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();
        let err = h.batch(&["volumes", "remove", "--mount-path", "/other"]).unwrap_err();
        assert!(matches!(err, FuncError::NoMatch { noun: "volume", .. }));
        assert_eq!(before, fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap());
    }

    #[test]
    fn interactive_remove_on_empty_collection_says_so() {
        let h = Harness::new().with_project();
        let mut p = ScriptedPrompter::new(Vec::<String>::new());
        let out = h.exec(&mut p, &["labels", "remove"]).unwrap();
        assert_eq!(out, "There are no configured labels\n");
        assert!(p.asked.is_empty());
    }

    #[test]
    fn interactive_volume_add_offers_cluster_claims() {
        let mut h = Harness::new().with_project();
        h.resources = StaticResources::with_claims(&["data"]);
        let mut p = ScriptedPrompter::new(["PersistentVolumeClaim", "data", "y", "/data"]);
        h.exec(&mut p, &["volumes", "add"]).unwrap();
        let volumes = h.project().run.volumes;
        assert_eq!(volumes.len(), 1);
        let pvc = volumes[0].persistent_volume_claim.clone().unwrap();
        assert_eq!(pvc.claim_name.as_deref(), Some("data"));
        assert!(pvc.read_only);
    }

    #[test]
    fn build_without_registry_in_batch_mode_fails() {
        let h = Harness::new().with_project();
        let before = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();
        let err = h.batch(&["build"]).unwrap_err();
        assert!(matches!(
            err,
            FuncError::RequiredValueMissing {
                setting: "registry",
                ..
            }
        ));
        assert!(h.builder.requests.borrow().is_empty());
        assert_eq!(before, fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap());
    }

    #[test]
    fn build_records_configuration_even_when_the_build_fails() {
        let mut h = Harness::new().with_project();
        h.builder.fail = true;
        let err = h.batch(&["build", "--registry", "quay.io/alice"]).unwrap_err();
        assert!(matches!(err, FuncError::Collaborator { collaborator: "pack", .. }));
        let project = h.project();
        assert_eq!(project.registry, "quay.io/alice");
        assert_eq!(project.image, "quay.io/alice/hello:latest");
        assert_eq!(project.build.builder, Some(BuilderKind::Pack));
    }

    #[test]
    fn build_builder_follows_project_over_global() {
        let h = Harness::new().with_project();
        h.batch(&["config", "set", "builder", "pack"]).unwrap();
        h.batch(&["config", "set", "registry", "quay.io/alice"]).unwrap();

        h.batch(&["build"]).unwrap();
        assert_eq!(h.builder.requests.borrow()[0].builder, BuilderKind::Pack);

        let mut project = h.project();
        project.build.builder = Some(BuilderKind::S2i);
        project.write().unwrap();
        h.batch(&["build"]).unwrap();
        assert_eq!(h.builder.requests.borrow()[1].builder, BuilderKind::S2i);

        h.batch(&["build", "--builder", "pack"]).unwrap();
        assert_eq!(h.builder.requests.borrow()[2].builder, BuilderKind::Pack);
    }

    #[test]
    fn build_prompts_for_missing_registry_when_interactive() {
        let h = Harness::new().with_project();
        let mut p = ScriptedPrompter::new(["quay.io/bob"]);
        let out = h.exec(&mut p, &["build"]).unwrap();
        assert_eq!(out, "Function image built: quay.io/bob/hello:latest\n");
        assert_eq!(h.project().registry, "quay.io/bob");
    }

    #[test]
    fn saved_image_moves_to_a_new_registry() {
        let h = Harness::new().with_project();
        h.batch(&["build", "--registry", "quay.io/alice"]).unwrap();
        assert_eq!(h.project().image, "quay.io/alice/hello:latest");

        let mut p = ScriptedPrompter::non_interactive();
        let out = h.exec(&mut p, &["build", "--registry", "quay.io/bob"]).unwrap();
        assert_eq!(out, "Function image built: quay.io/bob/hello:latest\n");
        assert_eq!(h.builder.requests.borrow()[1].image, "quay.io/bob/hello:latest");
        assert_eq!(p.notices.len(), 1);
        assert!(p.notices[0].contains("quay.io/alice/hello:latest"));
        assert!(p.notices[0].contains("'quay.io/bob'"));

        let project = h.project();
        assert_eq!(project.registry, "quay.io/bob");
        assert_eq!(project.image, "quay.io/bob/hello:latest");
    }

    #[test]
    fn explicit_image_stays_put_when_registry_changes() {
        let h = Harness::new().with_project();
        h.batch(&["build", "--registry", "quay.io/alice"]).unwrap();

        let mut p = ScriptedPrompter::non_interactive();
        h.exec(
            &mut p,
            &["build", "--registry", "quay.io/bob", "--image", "quay.io/alice/hello:v2"],
        )
        .unwrap();
        assert_eq!(h.builder.requests.borrow()[1].image, "quay.io/alice/hello:v2");
        assert!(p.notices.is_empty());
        assert_eq!(h.project().image, "quay.io/alice/hello:v2");
    }

    #[test]
    fn deploy_moves_saved_image_to_a_new_registry() {
        let h = Harness::new().with_project();
        h.batch(&["build", "--registry", "quay.io/alice"]).unwrap();
        h.batch(&["deploy", "--registry", "quay.io/bob"]).unwrap();

        assert_eq!(h.cluster.requests.borrow()[0].image, "quay.io/bob/hello:latest");
        assert_eq!(h.project().image, "quay.io/bob/hello:latest");
    }

    #[test]
    fn collection_write_keeps_unmodelled_keys() {
        let h = Harness::new();
        fs::write(
            h.root().join(project::FUNCTION_FILE),
            "specVersion: 0.35.0\n\
             name: hello\n\
             runtime: go\n\
             created: 2024-03-01T10:00:00Z\n\
             build:\n  buildpacks:\n  - paketo-buildpacks/go\n\
             run:\n  buildEnvs:\n  - name: CGO_ENABLED\n    value: '0'\n\
             deploy:\n  options:\n    scale:\n      min: 1\n",
        )
        .unwrap();

        h.batch(&["envs", "add", "--name", "FOO", "--value", "bar"]).unwrap();

        let content = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();
        assert!(content.contains("2024-03-01T10:00:00Z"));
        assert!(content.contains("buildpacks:"));
        assert!(content.contains("buildEnvs:"));
        assert!(content.contains("options:"));
        assert_eq!(h.project().run.envs, vec![Env::new("FOO", "bar")]);
    }

    #[test]
    fn failed_deploy_writes_nothing() {
        let mut h = Harness::new().with_project();
        h.cluster.fail = true;
        let before = fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap();
        let err = h
            .batch(&["deploy", "--registry", "quay.io/alice", "--namespace", "team-a"])
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalCollaborator);
        assert_eq!(before, fs::read_to_string(h.root().join(project::FUNCTION_FILE)).unwrap());
    }

    #[test]
    fn deploy_records_namespace_and_passes_metadata() {
        let h = Harness::new().with_project();
        h.batch(&["envs", "add", "--name", "A", "--value", "1"]).unwrap();
        h.batch(&["labels", "add", "--name", "app", "--value", "web"]).unwrap();
        let out = h
            .batch(&["deploy", "--registry", "quay.io/alice", "--namespace", "team-a"])
            .unwrap();
        assert!(out.contains("http://hello.team-a.example.com"));

        let request = h.cluster.requests.borrow()[0].clone();
        assert_eq!(request.namespace, "team-a");
        assert_eq!(request.image, "quay.io/alice/hello:latest");
        assert_eq!(request.envs, vec![Env::new("A", "1")]);
        assert_eq!(request.labels, vec![Label::new("app", "web")]);
        assert_eq!(h.project().deploy.namespace, "team-a");
    }

    #[test]
    fn describe_uses_project_name_and_output_format() {
        let mut h = Harness::new().with_project();
        h.cluster = FakeCluster::with_instances(vec![Instance {
            name: "hello".into(),
            namespace: "default".into(),
            image: "quay.io/a/hello".into(),
            url: "http://hello.default.example.com".into(),
        }]);
        let out = h.batch(&["describe", "-o", "url"]).unwrap();
        assert_eq!(out, "http://hello.default.example.com\n");
        let json = h.batch(&["describe", "-o", "json"]).unwrap();
        assert!(json.contains("\"name\": \"hello\""));
    }

    #[test]
    fn list_honours_output_setting_from_environment() {
        let mut h = Harness::new();
        h.env = vec![("FUNC_OUTPUT".into(), "plain".into())];
        h.cluster = FakeCluster::with_instances(vec![Instance {
            name: "a".into(),
            namespace: "default".into(),
            image: String::new(),
            url: "http://a".into(),
        }]);
        assert_eq!(h.batch(&["list"]).unwrap(), "a default http://a\n");
    }

    #[test]
    fn config_set_get_unset_round_trip() {
        let h = Harness::new();
        h.batch(&["config", "set", "namespace", "team-x"]).unwrap();
        assert!(h.batch(&["config", "get", "namespace"]).unwrap().ends_with("team-x\n"));
        h.batch(&["config", "unset", "namespace"]).unwrap();
        assert!(h.batch(&["config", "get", "namespace"]).unwrap().ends_with("default\n"));
    }

    #[test]
    fn init_uses_directory_name_and_language_setting() {
        let h = Harness::new();
        h.batch(&["config", "set", "language", "rust"]).unwrap();
        let out = h.batch(&["init"]).unwrap();
        assert!(out.starts_with("Created rust function 'hello'"));
        assert_eq!(h.project().runtime, "rust");
    }

    #[test]
    fn init_without_language_in_batch_mode_fails() {
        let h = Harness::new();
        let err = h.batch(&["init"]).unwrap_err();
        assert!(matches!(
            err,
            FuncError::RequiredValueMissing {
                setting: "language",
                ..
            }
        ));
    }

    #[test]
    fn commands_on_missing_project_fail() {
        let h = Harness::new();
        assert!(matches!(
            h.batch(&["envs", "list"]).unwrap_err(),
            FuncError::NotInitialized(_)
        ));
    }

    #[test]
    fn git_set_and_remove() {
        let h = Harness::new().with_project();
        h.batch(&["git", "set", "--git-url", "https://example.com/h.git", "--git-dir", "fn"])
            .unwrap();
        let git = h.project().build.git;
        assert_eq!(git.url.as_deref(), Some("https://example.com/h.git"));
        assert_eq!(git.context_dir.as_deref(), Some("fn"));

        assert_eq!(h.batch(&["git", "remove"]).unwrap(), "Git source removed\n");
        assert!(h.project().build.git.is_empty());
    }

    #[test]
    fn git_set_prompts_with_current_values() {
        let h = Harness::new().with_project();
        h.batch(&["git", "set", "--git-url", "https://example.com/h.git"]).unwrap();
        let mut p = ScriptedPrompter::new(["", "v1", ""]);
        h.exec(&mut p, &["git", "set"]).unwrap();
        let git = h.project().build.git;
        assert_eq!(git.url.as_deref(), Some("https://example.com/h.git"));
        assert_eq!(git.revision.as_deref(), Some("v1"));
    }
}
