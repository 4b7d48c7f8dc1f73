use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced by Sprout.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input in {0}: {1}")]
    Yaml(PathBuf, serde_yaml::Error),
    #[error("template data files must have a mapping as the root node: {0}")]
    RootNotMapping(PathBuf),
    #[error("value of 'variants' entry in {0} must be a mapping of variant names to mappings")]
    VariantsNotMapping(PathBuf),
    #[error("variant '{1}' in {0} was expected to have a mapping value, but it was a {2}")]
    VariantNotMapping(PathBuf, String, &'static str),
    #[error("mapping keys must be scalars, but found a {0}")]
    UnsupportedKey(&'static str),
    #[error("unknown variants declared in file for template set \"{set}\": {{{}}}", .names.join(", "))]
    UnknownVariants { set: String, names: Vec<String> },
    #[error("variant \"{variant}\" is already declared in template set \"{set}\"")]
    DuplicateVariant { set: String, variant: String },
    #[error("template set \"{0}\" is already declared")]
    DuplicateTemplateSet(String),
    #[error("no such template set: {0}")]
    NoSuchTemplateSet(String),
    #[error("failed to load manifest {0}")]
    FailedToLoadManifest(PathBuf),
    #[error("no source directories declared for template set \"{0}\"")]
    NoSourceDirectories(String),
    #[error("could not find template \"{identifier}\" in any of: {}", display_paths(.roots))]
    TemplateNotFound {
        identifier: String,
        roots: Vec<PathBuf>,
    },
    #[error("template \"{0}\" resolves outside of its root {1}")]
    PathEscapesRoot(String, PathBuf),
    #[error("cannot use path as a template identifier: {0}")]
    InvalidTemplatePath(PathBuf),
    #[error("failed to parse source file pattern \"{0}\": {1}")]
    SourceFilePattern(String, glob::PatternError),
    #[error("source files iteration failed: {0}")]
    SourceIter(#[from] glob::GlobError),
    #[error("failed to register template \"{0}\": {1}")]
    TemplateRegistration(String, Box<handlebars::TemplateError>),
    #[error("failed to render template \"{0}\": {1}")]
    TemplateRender(String, Box<handlebars::RenderError>),
    #[error("rendered file name for template \"{0}\" lost its disambiguation prefix")]
    MissingDisambiguationPrefix(String),
    #[error("output file \"{0}\" (from template \"{1}\") must be a relative path inside the output directory")]
    OutputEscapesRoot(String, String),
    #[error("variant \"{variant}\" of template set \"{set}\" cannot be used as an output directory name")]
    InvalidVariantDirectory { set: String, variant: String },
    #[error(
        "output file {} (a variant of input \"{template}\"{}) has already been written by \"{previous_template}\"{}",
        .path.display(),
        variant_suffix(.variant),
        variant_suffix(.previous_variant)
    )]
    DuplicateOutput {
        path: PathBuf,
        template: String,
        variant: Option<String>,
        previous_template: String,
        previous_variant: Option<String>,
    },
    #[error("output directories of template sets \"{0}\" and \"{1}\" overlap")]
    OverlappingOutputRoots(String, String),
    #[error("path has no parent directory: {0}")]
    PathMissingParent(PathBuf),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<String>>()
        .join("; ")
}

fn variant_suffix(variant: &Option<String>) -> String {
    match variant {
        Some(name) => format!(", variant \"{}\"", name),
        None => String::new(),
    }
}

impl Error {
    /// Wraps an I/O error with a description of the path involved.
    pub(crate) fn io<P: AsRef<std::path::Path>>(path: P, e: std::io::Error) -> Self {
        Self::Io(path.as_ref().display().to_string(), e)
    }
}
