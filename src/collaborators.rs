//! External tools: image builders, the deployer and cluster queries.
//!
//! Each concern sits behind a narrow trait so commands can be exercised
//! without a cluster. The process-backed implementations only assemble
//! arguments and check exit status; the heavy lifting is the tool's.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::collections::envs::{self, ValueRef};
use crate::collections::{Env, Label, Volume};
use crate::error::FuncError;
use crate::output::Formatted;
use crate::settings::BuilderKind;

/// Cluster resources a metadata entry can reference by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Secret,
    ConfigMap,
    PersistentVolumeClaim,
}

impl ResourceKind {
    fn resource(self) -> &'static str {
        match self {
            ResourceKind::Secret => "secrets",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaims",
        }
    }
}

/// Everything a builder needs to produce and push an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub root: PathBuf,
    pub image: String,
    pub builder: BuilderKind,
    pub builder_image: Option<String>,
    pub registry_insecure: bool,
}

/// Everything the deployer needs to run a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub envs: Vec<Env>,
    pub labels: Vec<Label>,
    pub volumes: Vec<Volume>,
}

/// A deployed function as reported by the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub url: String,
}

impl Formatted for Instance {
    const XML_ROOT: &'static str = "function";

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Function:")?;
        writeln!(w, "  Name:      {}", self.name)?;
        writeln!(w, "  Namespace: {}", self.namespace)?;
        writeln!(w, "  Image:     {}", self.image)?;
        writeln!(w, "  URL:       {}", self.url)
    }

    fn plain(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Name {}", self.name)?;
        writeln!(w, "Namespace {}", self.namespace)?;
        writeln!(w, "Image {}", self.image)?;
        writeln!(w, "URL {}", self.url)
    }

    fn url(&self, w: &mut dyn Write) -> Result<(), FuncError> {
        writeln!(w, "{}", self.url).map_err(crate::output::io_error)
    }
}

/// Deployed functions, as printed by `list`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct InstanceList(pub Vec<Instance>);

impl Formatted for InstanceList {
    const XML_ROOT: &'static str = "functions";

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.0.is_empty() {
            return writeln!(w, "No functions found");
        }
        let width = self.0.iter().map(|i| i.name.len()).max().unwrap_or(0).max(4);
        writeln!(w, "{:<width$}  {:<12}  URL", "NAME", "NAMESPACE")?;
        for i in &self.0 {
            writeln!(w, "{:<width$}  {:<12}  {}", i.name, i.namespace, i.url)?;
        }
        Ok(())
    }

    fn plain(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for i in &self.0 {
            writeln!(w, "{} {} {}", i.name, i.namespace, i.url)?;
        }
        Ok(())
    }

    fn url(&self, w: &mut dyn Write) -> Result<(), FuncError> {
        for i in &self.0 {
            writeln!(w, "{}", i.url).map_err(crate::output::io_error)?;
        }
        Ok(())
    }

    fn xml(&self) -> Result<String, FuncError> {
        #[derive(Serialize)]
        struct Wrapper<'a> {
            function: &'a [Instance],
        }
        quick_xml::se::to_string_with_root(Self::XML_ROOT, &Wrapper { function: &self.0 }).map_err(
            |e| FuncError::Render {
                what: "xml",
                reason: e.to_string(),
            },
        )
    }
}

pub trait ImageBuilder {
    fn build(&self, request: &BuildRequest) -> Result<(), FuncError>;
}

pub trait Deployer {
    fn deploy(&self, request: &DeployRequest) -> Result<Instance, FuncError>;
}

pub trait Describer {
    fn describe(&self, name: &str, namespace: &str) -> Result<Instance, FuncError>;
}

pub trait Lister {
    fn list(&self, namespace: &str) -> Result<Vec<Instance>, FuncError>;
}

pub trait ResourceEnumerator {
    fn list_names(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<String>, FuncError>;
}

/// Names of `kind` in `namespace`, or an empty list when the cluster can't
/// be asked. Selection prompts then fall back to free-text input.
pub fn names_or_empty(
    resources: &dyn ResourceEnumerator,
    kind: ResourceKind,
    namespace: &str,
) -> Vec<String> {
    match resources.list_names(kind, namespace) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(
                event = "core.resources.list_failed",
                kind = ?kind,
                namespace,
                error = %e,
            );
            Vec::new()
        }
    }
}

fn run(collaborator: &'static str, program: &str, args: &[String]) -> Result<String, FuncError> {
    tracing::info!(event = "core.collaborator.invoke_started", collaborator, args = ?args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| FuncError::Collaborator {
            collaborator,
            message: format!("could not start {program}: {e}"),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::warn!(event = "core.collaborator.invoke_failed", collaborator, status = %output.status);
        return Err(FuncError::Collaborator {
            collaborator,
            message: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Builds with `pack` or `s2i`, depending on the requested builder.
#[derive(Debug, Default)]
pub struct ProcessBuilder;

/// Builder image used when the project names none.
pub fn default_builder_image(builder: BuilderKind) -> &'static str {
    match builder {
        BuilderKind::Pack => "ghcr.io/knative/builder-jammy-base:latest",
        BuilderKind::S2i => "registry.access.redhat.com/ubi8/nodejs-20-minimal",
    }
}

pub fn build_args(request: &BuildRequest) -> Vec<String> {
    let root = request.root.display().to_string();
    let builder_image = request
        .builder_image
        .clone()
        .unwrap_or_else(|| default_builder_image(request.builder).to_string());
    match request.builder {
        BuilderKind::Pack => {
            let mut args = vec![
                "build".to_string(),
                request.image.clone(),
                "--path".to_string(),
                root,
                "--builder".to_string(),
                builder_image,
                "--publish".to_string(),
            ];
            if request.registry_insecure {
                args.push("--insecure-registry".to_string());
                args.push(registry_host(&request.image).to_string());
            }
            args
        }
        BuilderKind::S2i => vec!["build".to_string(), root, builder_image, request.image.clone()],
    }
}

fn registry_host(image: &str) -> &str {
    image.split('/').next().unwrap_or(image)
}

impl ImageBuilder for ProcessBuilder {
    fn build(&self, request: &BuildRequest) -> Result<(), FuncError> {
        let (collaborator, program) = match request.builder {
            BuilderKind::Pack => ("pack", "pack"),
            BuilderKind::S2i => ("s2i", "s2i"),
        };
        run(collaborator, program, &build_args(request))?;
        Ok(())
    }
}

/// Deploys, describes and lists through the `kn` CLI.
#[derive(Debug)]
pub struct KnClient {
    lookup: fn(&str) -> Option<String>,
}

impl Default for KnClient {
    fn default() -> Self {
        Self {
            lookup: |name| std::env::var(name).ok(),
        }
    }
}

/// `kn service create` arguments for `request`. Local env references are
/// resolved through `lookup`.
pub fn deploy_args(
    request: &DeployRequest,
    lookup: impl Fn(&str) -> Option<String> + Copy,
) -> Result<Vec<String>, FuncError> {
    let mut args = vec![
        "service".to_string(),
        "create".to_string(),
        request.name.clone(),
        "--image".to_string(),
        request.image.clone(),
        "--namespace".to_string(),
        request.namespace.clone(),
        "--force".to_string(),
    ];

    for env in &request.envs {
        let Some(value) = &env.value else { continue };
        match (&env.name, ValueRef::parse(value)) {
            (None, ValueRef::Secret(name)) => push(&mut args, "--env-from", format!("secret:{name}")),
            (None, ValueRef::ConfigMap(name)) => {
                push(&mut args, "--env-from", format!("config-map:{name}"))
            }
            (Some(var), ValueRef::SecretKey { name, key }) => {
                push(&mut args, "--env-value-from", format!("{var}=secret:{name}:{key}"))
            }
            (Some(var), ValueRef::ConfigMapKey { name, key }) => push(
                &mut args,
                "--env-value-from",
                format!("{var}=config-map:{name}:{key}"),
            ),
            (Some(var), _) => {
                let resolved = envs::interpolate(value, lookup)?;
                push(&mut args, "--env", format!("{var}={resolved}"));
            }
            (None, _) => {}
        }
    }

    for label in &request.labels {
        let Some(key) = &label.key else { continue };
        let value = match &label.value {
            Some(v) => envs::interpolate(v, lookup)?,
            None => String::new(),
        };
        push(&mut args, "--label", format!("{key}={value}"));
    }

    for volume in &request.volumes {
        let Some(path) = volume.mount_path() else { continue };
        let source = if let Some(secret) = &volume.secret {
            format!("secret:{secret}")
        } else if let Some(cm) = &volume.config_map {
            format!("cm:{cm}")
        } else if let Some(claim) = volume
            .persistent_volume_claim
            .as_ref()
            .and_then(|pvc| pvc.claim_name.as_ref())
        {
            format!("pvc:{claim}")
        } else {
            return Err(FuncError::Collaborator {
                collaborator: "kn",
                message: format!("volume {volume} cannot be mounted with kn"),
            });
        };
        push(&mut args, "--mount", format!("{path}={source}"));
    }

    Ok(args)
}

fn push(args: &mut Vec<String>, flag: &str, value: String) {
    args.push(flag.to_string());
    args.push(value);
}

/// Pull an [`Instance`] out of a Knative service object.
pub fn instance_from_service(service: &serde_json::Value) -> Instance {
    let text = |v: &serde_json::Value| v.as_str().unwrap_or_default().to_string();
    Instance {
        name: text(&service["metadata"]["name"]),
        namespace: text(&service["metadata"]["namespace"]),
        image: text(&service["spec"]["template"]["spec"]["containers"][0]["image"]),
        url: text(&service["status"]["url"]),
    }
}

fn parse_json(collaborator: &'static str, raw: &str) -> Result<serde_json::Value, FuncError> {
    serde_json::from_str(raw).map_err(|e| FuncError::Collaborator {
        collaborator,
        message: format!("unexpected output: {e}"),
    })
}

impl Deployer for KnClient {
    fn deploy(&self, request: &DeployRequest) -> Result<Instance, FuncError> {
        let lookup = self.lookup;
        run("kn", "kn", &deploy_args(request, lookup)?)?;
        self.describe(&request.name, &request.namespace)
    }
}

impl Describer for KnClient {
    fn describe(&self, name: &str, namespace: &str) -> Result<Instance, FuncError> {
        let args: Vec<String> = ["service", "describe", name, "--namespace", namespace, "-o", "json"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let out = run("kn", "kn", &args)?;
        Ok(instance_from_service(&parse_json("kn", &out)?))
    }
}

impl Lister for KnClient {
    fn list(&self, namespace: &str) -> Result<Vec<Instance>, FuncError> {
        let args: Vec<String> = ["service", "list", "--namespace", namespace, "-o", "json"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let out = run("kn", "kn", &args)?;
        let parsed = parse_json("kn", &out)?;
        Ok(parsed["items"]
            .as_array()
            .map(|items| items.iter().map(instance_from_service).collect())
            .unwrap_or_default())
    }
}

/// Enumerates cluster resources with `kubectl get`.
#[derive(Debug, Default)]
pub struct KubectlResources;

impl ResourceEnumerator for KubectlResources {
    fn list_names(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<String>, FuncError> {
        let args: Vec<String> = ["get", kind.resource(), "--namespace", namespace, "-o", "name"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let out = run("kubectl", "kubectl", &args)?;
        Ok(parse_resource_names(&out))
    }
}

/// `kubectl get -o name` prints `kind/name` per line.
pub fn parse_resource_names(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
        .collect()
}
