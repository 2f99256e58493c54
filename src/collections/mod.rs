//! Ordered, key-addressable metadata collections: environment variables,
//! labels and volumes.
//!
//! All three share one algorithm. Entries keep insertion order, removal never
//! reorders, and duplicates are allowed. Every mutation here is pure: it
//! takes a slice and returns a new `Vec`, so a prompt that fails or is
//! cancelled halfway leaves both the in-memory project and the file on disk
//! untouched.

pub mod envs;
pub mod labels;
pub mod volumes;

use std::fmt;
use std::io::Write;

use serde::Serialize;

use crate::collaborators::{self, ResourceEnumerator, ResourceKind};
use crate::error::FuncError;
use crate::names::Field;
use crate::output::Formatted;
use crate::prompt::{self, Prompter};

pub use envs::Env;
pub use labels::Label;
pub use volumes::Volume;

/// Option text for appending at the end of a non-empty collection.
pub const INSERT_HERE: &str = "Insert here.";

/// An element of an ordered collection.
pub trait Entry: fmt::Display + Clone + PartialEq + Serialize {
    /// Singular noun used in messages ("label").
    const NOUN: &'static str;
    /// Plural noun used in messages ("labels").
    const NOUN_PLURAL: &'static str;
    /// XML element name for a single entry.
    const XML_NAME: &'static str;

    /// The shapes an entry can take, offered when adding interactively.
    type Kind: Copy + fmt::Display + 'static;

    fn kinds() -> &'static [Self::Kind];

    /// Ask for the fields of a new entry of `kind`.
    fn prompt(kind: Self::Kind, ctx: &mut PromptContext<'_>) -> Result<Self, FuncError>;

    /// Problems with this entry when stored at position `index`.
    fn problems(&self, index: usize) -> Vec<String>;
}

/// Everything an interactive add needs besides the collection itself.
pub struct PromptContext<'a> {
    pub prompter: &'a mut dyn Prompter,
    pub resources: &'a dyn ResourceEnumerator,
    pub namespace: String,
    /// The local process environment, for `{{ env:NAME }}` references.
    pub local_env: &'a [(String, String)],
}

impl PromptContext<'_> {
    /// Name of an existing cluster resource of `kind`.
    ///
    /// Offers the enumerated names when there are any; otherwise asks for a
    /// name, validated as a resource name.
    pub fn resource_name(&mut self, kind: ResourceKind, message: &str) -> Result<String, FuncError> {
        let names = collaborators::names_or_empty(self.resources, kind, &self.namespace);
        if names.is_empty() {
            return prompt::ask_validated(self.prompter, message, "", |v| {
                Field::ResourceName.validate(v)
            });
        }
        let index = self.prompter.select(message, &names, 0)?;
        Ok(names[index].clone())
    }

    pub fn validated(&mut self, message: &str, field: Field) -> Result<String, FuncError> {
        prompt::ask_validated(self.prompter, message, "", |v| field.validate(v))
    }

    pub fn local_env_is_set(&self, name: &str) -> bool {
        self.local_env.iter().any(|(k, _)| k == name)
    }
}

/// Insert `entry` before position `index`; `index == len` appends.
pub fn insert_at<T: Clone>(entries: &[T], index: usize, entry: T) -> Result<Vec<T>, FuncError> {
    if index > entries.len() {
        return Err(FuncError::PositionOutOfRange {
            index,
            len: entries.len(),
        });
    }
    let mut out = Vec::with_capacity(entries.len() + 1);
    out.extend_from_slice(&entries[..index]);
    out.push(entry);
    out.extend_from_slice(&entries[index..]);
    Ok(out)
}

pub fn append<T: Clone>(entries: &[T], entry: T) -> Vec<T> {
    let mut out = entries.to_vec();
    out.push(entry);
    out
}

pub fn remove_at<T: Clone>(entries: &[T], index: usize) -> Result<Vec<T>, FuncError> {
    if index >= entries.len() {
        return Err(FuncError::PositionOutOfRange {
            index,
            len: entries.len(),
        });
    }
    let mut out = entries.to_vec();
    out.remove(index);
    Ok(out)
}

/// Remove the first entry matching `pred`. `None` when nothing matches.
pub fn remove_first<T: Clone>(entries: &[T], pred: impl Fn(&T) -> bool) -> Option<Vec<T>> {
    let index = entries.iter().position(pred)?;
    let mut out = entries.to_vec();
    out.remove(index);
    Some(out)
}

/// Remove every entry matching `pred`. `None` when nothing matches.
pub fn remove_all<T: Clone>(entries: &[T], pred: impl Fn(&T) -> bool) -> Option<Vec<T>> {
    let kept: Vec<T> = entries.iter().filter(|e| !pred(e)).cloned().collect();
    if kept.len() == entries.len() {
        None
    } else {
        Some(kept)
    }
}

/// Remove the first entry whose rendering is exactly `rendered`.
pub fn remove_rendered<T: Clone + fmt::Display>(entries: &[T], rendered: &str) -> Option<Vec<T>> {
    remove_first(entries, |e| e.to_string() == rendered)
}

/// Options for the position prompt: one "Insert before" per entry, then
/// [`INSERT_HERE`]. Option `i` inserts at index `i`.
pub fn position_options<T: fmt::Display>(entries: &[T]) -> Vec<String> {
    entries
        .iter()
        .map(|e| format!("Insert before:  {e}"))
        .chain(std::iter::once(INSERT_HERE.to_string()))
        .collect()
}

/// Interactively build a new entry and splice it in.
///
/// Returns the new collection; the caller persists it. Nothing is returned
/// (and so nothing is written) if any prompt fails or is cancelled.
pub fn add_interactive<T: Entry>(
    entries: &[T],
    ctx: &mut PromptContext<'_>,
) -> Result<Vec<T>, FuncError> {
    let index = if entries.is_empty() {
        0
    } else {
        let options = position_options(entries);
        ctx.prompter.select(
            &format!("Where do you want to add the {}?", T::NOUN),
            &options,
            entries.len(),
        )?
    };

    let kinds = T::kinds();
    let kind = if kinds.len() == 1 {
        kinds[0]
    } else {
        let options: Vec<String> = kinds.iter().map(ToString::to_string).collect();
        let chosen = ctx.prompter.select(
            &format!("What type of {} do you want to add?", T::NOUN),
            &options,
            0,
        )?;
        kinds[chosen]
    };

    let entry = T::prompt(kind, ctx)?;
    let problems = entry.problems(index);
    if !problems.is_empty() {
        return Err(FuncError::validation(T::NOUN, &entry.to_string(), problems.join("; ")));
    }

    tracing::debug!(event = "core.collection.entry_inserted", noun = T::NOUN, index, entry = %entry);
    insert_at(entries, index, entry)
}

/// Interactively pick an entry to remove.
///
/// `Ok(None)` means there was nothing to remove or the selection matched no
/// entry; either way nothing should be written.
pub fn remove_interactive<T: Entry>(
    entries: &[T],
    prompter: &mut dyn Prompter,
) -> Result<Option<Vec<T>>, FuncError> {
    if entries.is_empty() {
        return Ok(None);
    }
    let options: Vec<String> = entries.iter().map(ToString::to_string).collect();
    let chosen = prompter.select(
        &format!("Which {} do you want to remove?", T::NOUN),
        &options,
        0,
    )?;
    let updated = remove_rendered(entries, &options[chosen]);
    if updated.is_some() {
        tracing::debug!(event = "core.collection.entry_removed", noun = T::NOUN, rendered = %options[chosen]);
    }
    Ok(updated)
}

/// A collection as printed by `envs|labels|volumes list`.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct EntryList<'a, T: Entry>(pub &'a [T]);

impl<T: Entry> Formatted for EntryList<'_, T> {
    const XML_ROOT: &'static str = T::NOUN_PLURAL;

    fn human(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.0.is_empty() {
            return writeln!(w, "There are no configured {}", T::NOUN_PLURAL);
        }
        writeln!(w, "Configured {}:", T::NOUN_PLURAL)?;
        for entry in self.0 {
            writeln!(w, " - {entry}")?;
        }
        Ok(())
    }

    fn plain(&self, w: &mut dyn Write) -> std::io::Result<()> {
        for entry in self.0 {
            writeln!(w, "{entry}")?;
        }
        Ok(())
    }

    fn xml(&self) -> Result<String, FuncError> {
        let mut out = format!("<{}>", xml_tag(T::NOUN_PLURAL));
        for entry in self.0 {
            let item = quick_xml::se::to_string_with_root(T::XML_NAME, entry).map_err(|e| {
                FuncError::Render {
                    what: "xml",
                    reason: e.to_string(),
                }
            })?;
            out.push_str(&item);
        }
        out.push_str(&format!("</{}>", xml_tag(T::NOUN_PLURAL)));
        Ok(out)
    }
}

fn xml_tag(noun: &str) -> String {
    noun.replace(' ', "-")
}
