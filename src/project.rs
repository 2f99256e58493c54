//! The function project: a directory holding `func.yaml`.
//!
//! The file keeps the project's own settings (registry, image, namespace,
//! builder), its Git source, and the three ordered collections. It is only
//! ever written whole, after validation, through a temp file and rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::collections::{Env, Label, Volume, envs, labels, volumes};
use crate::error::FuncError;
use crate::names::Field;
use crate::persist;
use crate::settings::BuilderKind;

pub const FUNCTION_FILE: &str = "func.yaml";

/// Version of the file layout written by this tool.
pub const SPEC_VERSION: &str = "0.35.0";

/// Registry prepended to single-segment registries (`alice` → `docker.io/alice`).
pub const DEFAULT_REGISTRY: &str = "docker.io";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Directory the project lives in. Not persisted.
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_digest: String,
    #[serde(default)]
    pub build: BuildSpec,
    #[serde(default)]
    pub run: RunSpec,
    #[serde(default)]
    pub deploy: DeploySpec,
    /// Keys this tool does not model (`created`, ...), written back untouched.
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderKind>,
    /// Builder image per builder name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub builder_images: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "GitSpec::is_empty")]
    pub git: GitSpec,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Where the function source can be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_dir: Option<String>,
}

impl GitSpec {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.revision.is_none() && self.context_dir.is_none()
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.url.is_none() && (self.revision.is_some() || self.context_dir.is_some()) {
            problems.push("git url is required when a revision or context dir is set".to_string());
        }
        if let Some(url) = &self.url
            && url.trim().is_empty()
        {
            problems.push("git url must not be empty".to_string());
        }
        if let Some(dir) = &self.context_dir
            && dir.starts_with('/')
        {
            problems.push(format!("git context dir '{dir}' must be relative to the repository"));
        }
        problems
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<Env>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploySpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Project {
    /// Load the project at `root`.
    ///
    /// A directory without `func.yaml` yields an empty, uninitialized project
    /// rooted there; see [`Project::is_initialized`].
    pub fn load(root: &Path) -> Result<Self, FuncError> {
        if root.exists() && !root.is_dir() {
            return Err(FuncError::NotADirectory(root.to_path_buf()));
        }
        let path = root.join(FUNCTION_FILE);
        let mut project = match persist::read_optional(&path)? {
            Some(content) => serde_yaml::from_str::<Project>(&content)
                .map_err(|source| FuncError::ProjectParse { path, source })?,
            None => Project::default(),
        };
        project.root = root.to_path_buf();
        tracing::debug!(
            event = "core.project.load_completed",
            root = %root.display(),
            initialized = project.is_initialized(),
        );
        Ok(project)
    }

    /// [`Project::load`], failing when there is no function at `root`.
    pub fn load_initialized(root: &Path) -> Result<Self, FuncError> {
        let project = Self::load(root)?;
        if !project.is_initialized() {
            return Err(FuncError::NotInitialized(root.to_path_buf()));
        }
        Ok(project)
    }

    /// Create and write a new project at `root`.
    pub fn init(root: &Path, name: &str, runtime: &str) -> Result<Self, FuncError> {
        if root.join(FUNCTION_FILE).exists() {
            return Err(FuncError::AlreadyInitialized(root.to_path_buf()));
        }
        if root.exists() && !root.is_dir() {
            return Err(FuncError::NotADirectory(root.to_path_buf()));
        }
        Field::FunctionName.validate(name)?;
        if runtime.trim().is_empty() {
            return Err(FuncError::validation("language", runtime, "must not be empty"));
        }
        let project = Project {
            root: root.to_path_buf(),
            spec_version: SPEC_VERSION.to_string(),
            name: name.to_string(),
            runtime: runtime.to_string(),
            ..Project::default()
        };
        project.write()?;
        tracing::info!(event = "core.project.init_completed", root = %root.display(), name);
        Ok(project)
    }

    pub fn is_initialized(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn file(&self) -> PathBuf {
        self.root.join(FUNCTION_FILE)
    }

    /// Every problem with the project, grouped by section.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Err(e) = Field::FunctionName.validate(&self.name) {
            problems.push(format!("function name {:?} is invalid; {}", self.name, envs::reason(e)));
        }
        if !self.deploy.namespace.is_empty()
            && let Err(e) = Field::Namespace.validate(&self.deploy.namespace)
        {
            problems.push(format!(
                "namespace {:?} is invalid; {}",
                self.deploy.namespace,
                envs::reason(e)
            ));
        }
        problems.extend(volumes::validate_all(&self.run.volumes));
        problems.extend(envs::validate_all(&self.run.envs));
        problems.extend(labels::validate_all(&self.deploy.labels));
        problems.extend(self.build.git.problems());
        problems
    }

    pub fn validate(&self) -> Result<(), FuncError> {
        let errors = self.problems();
        if errors.is_empty() {
            return Ok(());
        }
        Err(FuncError::InvalidProject {
            path: PathBuf::from(FUNCTION_FILE),
            errors,
        })
    }

    /// Validate and persist. Returns `false` when the file already holds
    /// exactly this content and was left alone.
    pub fn write(&self) -> Result<bool, FuncError> {
        self.validate()?;
        let path = self.file();
        let rendered = serde_yaml::to_string(self).map_err(|e| FuncError::Render {
            what: "project",
            reason: e.to_string(),
        })?;
        if persist::read_optional(&path)?.as_deref() == Some(rendered.as_str()) {
            tracing::debug!(event = "core.project.write_skipped", path = %path.display());
            return Ok(false);
        }
        persist::write_atomic(&path, &rendered)?;
        tracing::info!(event = "core.project.write_completed", path = %path.display());
        Ok(true)
    }

    /// The image reference with the recorded digest, if any.
    pub fn image_with_digest(&self) -> String {
        image_with_digest(&self.image, &self.image_digest)
    }
}

/// `[registry]/[name]:latest`, qualifying a bare registry account with
/// [`DEFAULT_REGISTRY`].
pub fn derive_image(registry: &str, name: &str) -> Result<String, FuncError> {
    if name.is_empty() {
        return Err(FuncError::validation("function name", name, "must not be empty"));
    }
    let registry = registry.trim_matches('/');
    if registry.is_empty() {
        return Err(FuncError::RequiredValueMissing {
            setting: "registry",
            hint: "Provide --registry, set FUNC_REGISTRY, or run `func config set registry <registry>`."
                .into(),
        });
    }
    match registry.split('/').count() {
        1 => Ok(format!("{DEFAULT_REGISTRY}/{registry}/{name}:latest")),
        2 | 3 => Ok(format!("{registry}/{name}:latest")),
        _ => Err(FuncError::validation(
            "registry",
            registry,
            "expected [registry/]account[/path]",
        )),
    }
}

/// `image` pinned to `digest`, replacing any tag or earlier digest.
pub fn image_with_digest(image: &str, digest: &str) -> String {
    if digest.is_empty() {
        return image.to_string();
    }
    if let Some(at) = image.find("@sha256:")
        && at > 0
    {
        return format!("{}@{digest}", &image[..at]);
    }
    let (dir, last) = match image.rfind('/') {
        Some(slash) => image.split_at(slash + 1),
        None => ("", image),
    };
    let repo = last.split(':').next().unwrap_or(last);
    format!("{dir}{repo}@{digest}")
}

/// Default function name for a directory: its last path component.
pub fn name_from_path(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::volumes::{EmptyDir, PersistentVolumeClaim};
    use std::fs;
    use tempfile::TempDir;

    fn sample(root: &Path) -> Project {
        Project {
            root: root.to_path_buf(),
            spec_version: SPEC_VERSION.into(),
            name: "hello".into(),
            runtime: "go".into(),
            registry: "quay.io/alice".into(),
            build: BuildSpec {
                builder: Some(BuilderKind::S2i),
                git: GitSpec {
                    url: Some("https://example.com/hello.git".into()),
                    revision: Some("main".into()),
                    context_dir: None,
                },
                ..BuildSpec::default()
            },
            run: RunSpec {
                envs: vec![
                    Env::new("B", "2"),
                    Env::new("A", "1"),
                    Env::whole("{{ secret:creds }}"),
                    Env::new("A", "{{ env:HOME }}"),
                ],
                volumes: vec![
                    Volume {
                        persistent_volume_claim: Some(PersistentVolumeClaim {
                            claim_name: Some("data".into()),
                            read_only: true,
                        }),
                        path: Some("/data".into()),
                        ..Volume::default()
                    },
                    Volume {
                        empty_dir: Some(EmptyDir {
                            medium: "Memory".into(),
                            size_limit: Some("1Gi".into()),
                        }),
                        path: Some("/cache".into()),
                        ..Volume::default()
                    },
                ],
                ..RunSpec::default()
            },
            deploy: DeploySpec {
                namespace: "team-a".into(),
                labels: vec![Label::new("z", "1"), Label::new("a", "2")],
                ..DeploySpec::default()
            },
            ..Project::default()
        }
    }

    #[test]
    fn missing_file_is_uninitialized() {
        let dir = TempDir::new().unwrap();
        let project = Project::load(dir.path()).unwrap();
        assert!(!project.is_initialized());
        assert!(matches!(
            Project::load_initialized(dir.path()).unwrap_err(),
            FuncError::NotInitialized(_)
        ));
    }

    #[test]
    fn file_as_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            Project::load(&file).unwrap_err(),
            FuncError::NotADirectory(_)
        ));
    }

    #[test]
    fn write_then_load_preserves_everything_in_order() {
        let dir = TempDir::new().unwrap();
        let project = sample(dir.path());
        assert!(project.write().unwrap());
        let loaded = Project::load(dir.path()).unwrap();
        assert_eq!(loaded, project);
    }

    #[test]
    fn unchanged_project_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let project = sample(dir.path());
        assert!(project.write().unwrap());
        assert!(!project.write().unwrap());
    }

    #[test]
    fn keys_without_a_model_survive_a_rewrite() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(FUNCTION_FILE),
            "specVersion: 0.35.0\n\
             name: hello\n\
             runtime: go\n\
             created: 2024-03-01T10:00:00Z\n\
             build:\n  buildpacks:\n  - paketo-buildpacks/go\n\
             run:\n  buildEnvs:\n  - name: CGO_ENABLED\n    value: '0'\n\
             deploy:\n  options:\n    scale:\n      min: 1\n",
        )
        .unwrap();

        let mut project = Project::load(dir.path()).unwrap();
        project.run.envs.push(Env::new("FOO", "bar"));
        assert!(project.write().unwrap());

        let content = fs::read_to_string(dir.path().join(FUNCTION_FILE)).unwrap();
        assert!(content.contains("2024-03-01T10:00:00Z"));
        assert!(content.contains("paketo-buildpacks/go"));
        assert!(content.contains("buildEnvs:"));
        assert!(content.contains("CGO_ENABLED"));
        assert!(content.contains("min: 1"));
        assert!(content.contains("FOO"));

        let reloaded = Project::load(dir.path()).unwrap();
        assert_eq!(reloaded, project);
        assert!(reloaded.extra.contains_key("created"));
        assert!(reloaded.build.extra.contains_key("buildpacks"));
        assert!(reloaded.run.extra.contains_key("buildEnvs"));
        assert!(reloaded.deploy.extra.contains_key("options"));
    }

    #[test]
    fn yaml_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        sample(dir.path()).write().unwrap();
        let content = fs::read_to_string(dir.path().join(FUNCTION_FILE)).unwrap();
        assert!(content.contains("specVersion:"));
        assert!(content.contains("persistentVolumeClaim:"));
        assert!(content.contains("claimName: data"));
        assert!(content.contains("sizeLimit: 1Gi"));
        assert!(!content.contains("imageDigest"));
    }

    #[test]
    fn invalid_project_is_never_written() {
        let dir = TempDir::new().unwrap();
        let mut project = sample(dir.path());
        project.run.envs.push(Env::default());
        project.deploy.labels.push(Label::default());
        let err = project.write().unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("'func.yaml' contains errors:"));
        assert!(msg.contains("env entry #4"));
        assert!(msg.contains("label entry #2"));
        assert!(!dir.path().join(FUNCTION_FILE).exists());
    }

    #[test]
    fn init_creates_and_refuses_twice() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("hello");
        let project = Project::init(&root, "hello", "node").unwrap();
        assert!(project.is_initialized());
        assert_eq!(Project::load(&root).unwrap().runtime, "node");
        assert!(matches!(
            Project::init(&root, "hello", "node").unwrap_err(),
            FuncError::AlreadyInitialized(_)
        ));
    }

    #[test]
    fn init_validates_name() {
        let dir = TempDir::new().unwrap();
        assert!(Project::init(dir.path(), "Hello_World", "go").is_err());
        assert!(!dir.path().join(FUNCTION_FILE).exists());
    }

    #[test]
    fn malformed_yaml_names_the_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(FUNCTION_FILE), "run: [unterminated").unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert!(matches!(err, FuncError::ProjectParse { .. }));
        assert!(err.to_string().contains(FUNCTION_FILE));
    }

    #[test]
    fn git_revision_requires_url() {
        let dir = TempDir::new().unwrap();
        let mut project = sample(dir.path());
        project.build.git.url = None;
        assert!(project.problems().iter().any(|p| p.contains("git url is required")));
    }

    #[test]
    fn derive_image_by_registry_depth() {
        assert_eq!(
            derive_image("alice", "hello").unwrap(),
            "docker.io/alice/hello:latest"
        );
        assert_eq!(
            derive_image("/quay.io/alice/", "hello").unwrap(),
            "quay.io/alice/hello:latest"
        );
        assert_eq!(
            derive_image("reg.local:5000/team/sub", "hello").unwrap(),
            "reg.local:5000/team/sub/hello:latest"
        );
        assert!(derive_image("a/b/c/d", "hello").is_err());
        assert!(matches!(
            derive_image("", "hello").unwrap_err(),
            FuncError::RequiredValueMissing { setting: "registry", .. }
        ));
    }

    #[test]
    fn digest_replaces_tag_or_digest() {
        let d = "sha256:abc";
        assert_eq!(image_with_digest("quay.io/a/hello:latest", ""), "quay.io/a/hello:latest");
        assert_eq!(
            image_with_digest("quay.io/a/hello:latest", d),
            "quay.io/a/hello@sha256:abc"
        );
        assert_eq!(
            image_with_digest("quay.io/a/hello@sha256:old", d),
            "quay.io/a/hello@sha256:abc"
        );
        assert_eq!(
            image_with_digest("reg:5000/a/hello", d),
            "reg:5000/a/hello@sha256:abc"
        );
    }

    #[test]
    fn name_from_directory() {
        assert_eq!(name_from_path(Path::new("/src/my-func")), "my-func");
        assert_eq!(name_from_path(Path::new("/")), "");
    }
}
