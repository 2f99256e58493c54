//! Volumes mounted into the function's container.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Entry, PromptContext};
use crate::collaborators::ResourceKind;
use crate::error::FuncError;
use crate::names::Field;

pub const MEDIUM_DEFAULT: &str = "";
pub const MEDIUM_MEMORY: &str = "Memory";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentVolumeClaim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyDir {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub medium: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_limit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_volume_claim: Option<PersistentVolumeClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_dir: Option<EmptyDir>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// `volumes add` flags, before validation.
#[derive(Debug, Clone, Default)]
pub struct VolumeFlags {
    pub kind: Option<String>,
    pub source: Option<String>,
    pub mount_path: Option<String>,
    pub read_only: bool,
    pub size: Option<String>,
    pub medium: Option<String>,
}

impl Volume {
    pub fn mount_path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn type_count(&self) -> usize {
        [
            self.secret.is_some(),
            self.config_map.is_some(),
            self.persistent_volume_claim.is_some(),
            self.empty_dir.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn from_flags(flags: VolumeFlags) -> Result<Self, FuncError> {
        let mount_path = flags
            .mount_path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| FuncError::validation("mount path", "", "--mount-path is required"))?;
        Field::MountPath.validate(&mount_path)?;

        let kind = flags.kind.unwrap_or_default();
        let source = flags.source.filter(|s| !s.is_empty());
        let needs_source = |kind: &str| {
            source.clone().ok_or_else(|| {
                FuncError::validation("volume source", "", format!("--source is required for {kind} volumes"))
            })
        };

        let mut volume = Volume {
            path: Some(mount_path),
            ..Volume::default()
        };
        match kind.as_str() {
            "configmap" => {
                let name = needs_source("configmap")?;
                Field::ResourceName.validate(&name)?;
                volume.config_map = Some(name);
            }
            "secret" => {
                let name = needs_source("secret")?;
                Field::ResourceName.validate(&name)?;
                volume.secret = Some(name);
            }
            "pvc" => {
                let name = needs_source("pvc")?;
                Field::ResourceName.validate(&name)?;
                volume.persistent_volume_claim = Some(PersistentVolumeClaim {
                    claim_name: Some(name),
                    read_only: flags.read_only,
                });
            }
            "emptydir" => {
                let medium = flags.medium.unwrap_or_default();
                if medium != MEDIUM_DEFAULT && medium != MEDIUM_MEMORY {
                    return Err(FuncError::validation(
                        "storage medium",
                        &medium,
                        "must be 'Memory' or empty",
                    ));
                }
                volume.empty_dir = Some(EmptyDir {
                    medium,
                    size_limit: flags.size.filter(|s| !s.is_empty()),
                });
            }
            other => {
                return Err(FuncError::validation(
                    "volume type",
                    other,
                    "must be one of: configmap, secret, pvc, emptydir",
                ));
            }
        }
        Ok(volume)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cm) = &self.config_map {
            write!(f, "ConfigMap \"{cm}\"")?;
        } else if let Some(secret) = &self.secret {
            write!(f, "Secret \"{secret}\"")?;
        } else if let Some(pvc) = &self.persistent_volume_claim {
            write!(f, "PersistentVolumeClaim")?;
            if let Some(claim) = &pvc.claim_name {
                write!(f, " \"{claim}\"")?;
            }
        } else if let Some(dir) = &self.empty_dir {
            write!(f, "EmptyDir")?;
            if dir.medium == MEDIUM_MEMORY {
                write!(f, " in memory")?;
            }
            if let Some(limit) = &dir.size_limit {
                write!(f, " with size limit \"{limit}\"")?;
            }
        } else {
            write!(f, "No volume type")?;
        }
        if let Some(path) = &self.path {
            write!(f, " at path: \"{path}\"")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    EmptyDir,
}

impl fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VolumeKind::ConfigMap => "ConfigMap",
            VolumeKind::Secret => "Secret",
            VolumeKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            VolumeKind::EmptyDir => "EmptyDir",
        })
    }
}

const KINDS: [VolumeKind; 4] = [
    VolumeKind::ConfigMap,
    VolumeKind::Secret,
    VolumeKind::PersistentVolumeClaim,
    VolumeKind::EmptyDir,
];

impl Entry for Volume {
    const NOUN: &'static str = "volume";
    const NOUN_PLURAL: &'static str = "volumes";
    const XML_NAME: &'static str = "volume";

    type Kind = VolumeKind;

    fn kinds() -> &'static [VolumeKind] {
        &KINDS
    }

    fn prompt(kind: VolumeKind, ctx: &mut PromptContext<'_>) -> Result<Self, FuncError> {
        let mut volume = Volume::default();
        match kind {
            VolumeKind::ConfigMap => {
                let name = ctx.resource_name(
                    ResourceKind::ConfigMap,
                    "Which \"ConfigMap\" do you want to mount?",
                )?;
                volume.config_map = Some(name);
            }
            VolumeKind::Secret => {
                let name =
                    ctx.resource_name(ResourceKind::Secret, "Which \"Secret\" do you want to mount?")?;
                volume.secret = Some(name);
            }
            VolumeKind::PersistentVolumeClaim => {
                let name = ctx.resource_name(
                    ResourceKind::PersistentVolumeClaim,
                    "Which \"PersistentVolumeClaim\" do you want to mount?",
                )?;
                let read_only = ctx.prompter.confirm("Is this volume read-only?", false)?;
                volume.persistent_volume_claim = Some(PersistentVolumeClaim {
                    claim_name: Some(name),
                    read_only,
                });
            }
            VolumeKind::EmptyDir => {
                let mediums = vec!["Default (node storage)".to_string(), "Memory".to_string()];
                let medium = ctx.prompter.select(
                    "Which storage medium should the EmptyDir use?",
                    &mediums,
                    0,
                )?;
                let limit = ctx
                    .prompter
                    .input("Maximum size limit (leave empty for no limit):", "")?;
                volume.empty_dir = Some(EmptyDir {
                    medium: if medium == 1 { MEDIUM_MEMORY } else { MEDIUM_DEFAULT }.to_string(),
                    size_limit: Some(limit).filter(|l| !l.is_empty()),
                });
            }
        }
        let path = ctx.validated(
            &format!("Please specify the path where the {kind} should be mounted:"),
            Field::MountPath,
        )?;
        volume.path = Some(path);
        Ok(volume)
    }

    fn problems(&self, i: usize) -> Vec<String> {
        let mut problems = Vec::new();
        if let Some(pvc) = &self.persistent_volume_claim
            && pvc.claim_name.is_none()
        {
            problems.push(format!("volume entry #{i} ({self}) is missing claim name"));
        }
        if let Some(dir) = &self.empty_dir
            && dir.medium != MEDIUM_DEFAULT
            && dir.medium != MEDIUM_MEMORY
        {
            problems.push(format!(
                "volume entry #{i} ({self}) has invalid storage medium ({})",
                dir.medium
            ));
        }
        match self.type_count() {
            0 => problems.push(format!("volume entry #{i} ({self}) is missing a volume type")),
            1 => {}
            _ => problems.push(format!(
                "volume entry #{i} ({self}) may not specify more than one volume type"
            )),
        }
        match &self.path {
            None => problems.push(format!("volume entry #{i} ({self}) is missing path field")),
            Some(path) if !path.starts_with('/') => problems.push(format!(
                "volume entry #{i} ({self}) has a relative mount path"
            )),
            Some(_) => {}
        }
        problems
    }
}

/// Every problem across `volumes`, numbered by position.
pub fn validate_all(volumes: &[Volume]) -> Vec<String> {
    volumes.iter().enumerate().flat_map(|(i, v)| v.problems(i)).collect()
}
