use std::path::PathBuf;

use crate::collections::{Env, Label, Volume};

/// A `config` operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigAction {
    List,
    Get { name: String },
    Set { name: String, value: String },
    Unset { name: String },
}

/// An operation on one of the ordered collections.
///
/// `Add(None)` and `Remove(None)` are the interactive forms; the `Some`
/// forms carry an entry or selector built from flags.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionAction<T> {
    List,
    Add(Option<T>),
    Remove(Option<String>),
}

pub type EnvAction = CollectionAction<Env>;
pub type LabelAction = CollectionAction<Label>;
pub type VolumeAction = CollectionAction<Volume>;

/// Changes to the Git source of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitUpdate {
    pub url: Option<String>,
    pub revision: Option<String>,
    pub context_dir: Option<String>,
}

impl GitUpdate {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.revision.is_none() && self.context_dir.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitAction {
    Set(GitUpdate),
    Remove,
}

/// Options shared by every command that acts on a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub path: PathBuf,
    /// Flag overrides as `(setting, raw value)`; typed during resolution.
    pub flags: Vec<(String, String)>,
    pub image: Option<String>,
    pub builder_image: Option<String>,
}
