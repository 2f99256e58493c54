//! Layered settings and ordered metadata for function projects.
//!
//! funcfig is the configuration core of the `func` command line. It decides
//! which registry, namespace, builder and image a build or deployment uses,
//! and it manages the environment variables, labels and volume mounts
//! stored in a function's `func.yaml`.
//!
//! # Layer precedence
//!
//! ```text
//! Static defaults       GlobalSettings field defaults
//!        ↑ overridden by
//! Global settings file  ~/.config/func/config.toml (or FUNC_CONFIG_FILE)
//!        ↑ overridden by
//! Project file          func.yaml values for builder, registry, namespace
//!        ↑ overridden by
//! Environment vars      FUNC_<SETTING>
//!        ↑ overridden by
//! Flags                 --registry, --namespace, ...
//!        ↑ overridden by
//! Prompts               only when attached to a terminal
//! ```
//!
//! Each layer is sparse and replaces whole values: a layer that does not
//! mention a setting leaves it alone. The global settings file is strict;
//! a misspelled key is an error carrying its line number rather than a
//! silently ignored entry.
//!
//! # Project files
//!
//! [`Project`] loads and writes `func.yaml`. Writes are validated first and
//! skipped when nothing changed, so running `func build` twice in a row
//! leaves the file untouched the second time.
//!
//! # Ordered collections
//!
//! Environment variables, labels and volumes are ordered lists that allow
//! duplicates. The functions in [`collections`] never mutate in place: they
//! return a new list, and commands write it only once the whole interactive
//! flow has finished.
//!
//! # Collaborators
//!
//! Building and deploying are delegated to external tools behind the traits
//! in [`collaborators`]. The binary shells out to `pack`/`s2i`, `kn` and
//! `kubectl`; tests substitute in-memory fakes.
//!
//! # Error handling
//!
//! Every fallible operation returns [`FuncError`]. [`FuncError::kind`] maps a
//! failure to a broad [`ErrorKind`]. With the `rich-errors` feature the
//! error also implements `miette::Diagnostic`.

pub mod cli;
pub mod collaborators;
pub mod collections;
pub mod commands;
pub mod confirm;
pub mod env;
pub mod error;
pub mod logging;
pub mod merge;
pub mod names;
pub mod ops;
pub mod output;
pub mod overrides;
pub mod persist;
pub mod project;
pub mod prompt;
pub mod resolve;
pub mod settings;
pub mod store;
pub mod types;
pub mod validate;

pub use collections::{Env, Label, Volume};
pub use error::{ErrorKind, FuncError};
pub use output::OutputFormat;
pub use project::Project;
pub use resolve::{EffectiveConfig, ResolveInput};
pub use settings::{BuilderKind, GlobalSettings};
pub use types::{CollectionAction, ConfigAction, Invocation};
