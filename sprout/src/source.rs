//! Discovery and resolution of template files across several root
//! directories.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::Pattern;
use log::trace;

use crate::fs::maybe_canonicalize;
use crate::Error;

/// The template roots of a template set.
///
/// Source roots hold templates that are rendered to output files. Include
/// roots hold templates that can only be pulled into other templates. Both
/// are searched, in that order, when a template is resolved by identifier.
#[derive(Debug, Clone)]
pub struct TemplateSources {
    sources: Vec<PathBuf>,
    includes: Vec<PathBuf>,
}

impl TemplateSources {
    /// Constructor.
    pub fn new<P1, P2>(sources: &[P1], includes: &[P2]) -> Self
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        Self {
            sources: sources.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            includes: includes.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Identifiers of all templates under the source roots. When several
    /// roots contain the same relative path, only one template results.
    pub fn template_identifiers(&self) -> Result<BTreeSet<String>, Error> {
        collect_identifiers(&self.sources)
    }

    /// Identifiers of all templates under the include roots.
    pub fn include_identifiers(&self) -> Result<BTreeSet<String>, Error> {
        collect_identifiers(&self.includes)
    }

    /// Every root that is searched when resolving a template, in search order.
    pub fn search_roots(&self) -> impl Iterator<Item = &PathBuf> {
        self.sources.iter().chain(self.includes.iter())
    }

    /// Finds the file backing the template with the given identifier. The
    /// first root containing it wins.
    pub fn find(&self, identifier: &str) -> Result<Option<PathBuf>, Error> {
        let relative = checked_relative_path(identifier)?;
        for root in self.search_roots() {
            let candidate = root.join(&relative);
            if !candidate.is_file() {
                continue;
            }
            // Symlinks may still point outside of the root.
            let root_canonical = maybe_canonicalize(root)?;
            let candidate_canonical = maybe_canonicalize(&candidate)?;
            match (root_canonical, candidate_canonical) {
                (Some(r), Some(c)) if c.starts_with(&r) => {
                    trace!("Resolved template {} to {}", identifier, c.display());
                    return Ok(Some(candidate));
                }
                _ => return Err(Error::PathEscapesRoot(identifier.to_string(), root.clone())),
            }
        }
        Ok(None)
    }

    /// Reads the content of the template with the given identifier.
    pub fn resolve(&self, identifier: &str) -> Result<String, Error> {
        let path = self
            .find(identifier)?
            .ok_or_else(|| Error::TemplateNotFound {
                identifier: identifier.to_string(),
                roots: self.search_roots().cloned().collect(),
            })?;
        fs::read_to_string(&path).map_err(|e| Error::io(&path, e))
    }
}

// Identifiers must stay below whichever root they are joined onto.
fn checked_relative_path(identifier: &str) -> Result<PathBuf, Error> {
    let path = Path::new(identifier);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => relative.push(c),
            Component::CurDir => {}
            _ => {
                return Err(Error::PathEscapesRoot(
                    identifier.to_string(),
                    PathBuf::from("."),
                ))
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(Error::InvalidTemplatePath(path.to_path_buf()));
    }
    Ok(relative)
}

fn collect_identifiers(roots: &[PathBuf]) -> Result<BTreeSet<String>, Error> {
    let mut identifiers = BTreeSet::new();
    for root in roots {
        for identifier in walk_root(root)? {
            if !identifiers.insert(identifier.clone()) {
                trace!(
                    "Template {} in {} is shadowed by an earlier root",
                    identifier,
                    root.display()
                );
            }
        }
    }
    Ok(identifiers)
}

// Relative, `/`-separated paths of all regular files below the given root.
fn walk_root(root: &Path) -> Result<Vec<String>, Error> {
    let root_str = root
        .to_str()
        .ok_or_else(|| Error::InvalidTemplatePath(root.to_path_buf()))?;
    let pattern = format!("{}/**/*", Pattern::escape(root_str.trim_end_matches('/')));
    let paths =
        glob::glob(&pattern).map_err(|e| Error::SourceFilePattern(pattern.clone(), e))?;

    // glob drops `.` components from the paths it yields, so compare both
    // sides without them.
    let root = without_cur_dir(root);
    let mut identifiers = Vec::new();
    for entry in paths {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let normalized = without_cur_dir(&path);
        let relative = normalized
            .strip_prefix(&root)
            .map_err(|_| Error::InvalidTemplatePath(path.clone()))?;
        let parts = relative
            .components()
            .map(|c| {
                c.as_os_str()
                    .to_str()
                    .ok_or_else(|| Error::InvalidTemplatePath(path.clone()))
            })
            .collect::<Result<Vec<&str>, Error>>()?;
        identifiers.push(parts.join("/"));
    }
    Ok(identifiers)
}

fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
