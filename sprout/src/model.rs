//! The template set model: what to generate, from where, and with which data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::value::to_value;
use crate::{Dictionary, Error, Map, Value};

/// The default suffix marking a file as a template. It is stripped from the
/// name of the generated file.
pub const DEFAULT_TEMPLATE_SUFFIX: &str = ".peb";

/// In-memory properties supplied alongside (and taking precedence over) data
/// files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(Dictionary);

impl Properties {
    /// Convenience method for constructing a set of properties.
    pub fn with<K, V>(mut self, key: K, value: V) -> Result<Self, Error>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let _ = self.set(key, value)?;
        Ok(self)
    }

    /// Set the value associated with the given key, returning the previous
    /// value if there was one.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>, Error>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let value = to_value(value)?;
        Ok(self.0.insert(key.as_ref().to_string(), value))
    }

    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<&Value> {
        self.0.get(key.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays these properties on top of the given dictionary. Properties
    /// always win on key collision.
    pub fn apply_to(&self, target: &mut Dictionary) {
        target.extend(self.0.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

impl From<Dictionary> for Properties {
    fn from(d: Dictionary) -> Self {
        Self(d)
    }
}

/// Whether a template set produces source code or resources. The two only
/// differ in where their output goes by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetKind {
    Source,
    Resource,
}

impl Default for SetKind {
    fn default() -> Self {
        Self::Source
    }
}

impl SetKind {
    /// The directory, relative to the generated files root, under which sets
    /// of this kind place their output.
    pub fn output_dir_name(&self) -> &'static str {
        match self {
            Self::Source => "sources",
            Self::Resource => "resources",
        }
    }
}

/// How variant outputs are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputLayout {
    /// All variants write into one shared output root. File names must be
    /// unique across every template and variant.
    Unified,
    /// Each variant writes into a subdirectory of the output root named after
    /// the variant.
    PerVariant,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::Unified
    }
}

/// A named alternate configuration of a template set.
#[derive(Debug, Clone, Default)]
pub struct Variant {
    name: String,
    data_files: Vec<PathBuf>,
    properties: Properties,
}

impl Variant {
    pub fn new<N: AsRef<str>>(name: N) -> Self {
        Self {
            name: name.as_ref().to_string(),
            ..Default::default()
        }
    }

    pub fn with_data_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_files.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_files(&self) -> &[PathBuf] {
        &self.data_files
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// A named group of templates sharing one configuration and output policy.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    name: String,
    kind: SetKind,
    data_files: Vec<PathBuf>,
    properties: Properties,
    header: Option<String>,
    variants: Map<String, Variant>,
    includes: Vec<PathBuf>,
    sources: Vec<PathBuf>,
    output: PathBuf,
    template_suffix: String,
    layout: OutputLayout,
}

impl TemplateSet {
    /// Constructor. The output root is where generated files are written.
    pub fn new<N, P>(name: N, output: P) -> Self
    where
        N: AsRef<str>,
        P: AsRef<Path>,
    {
        Self {
            name: name.as_ref().to_string(),
            kind: SetKind::default(),
            data_files: Vec::new(),
            properties: Properties::default(),
            header: None,
            variants: Map::new(),
            includes: Vec::new(),
            sources: Vec::new(),
            output: output.as_ref().to_path_buf(),
            template_suffix: DEFAULT_TEMPLATE_SUFFIX.to_string(),
            layout: OutputLayout::default(),
        }
    }

    pub fn with_kind(mut self, kind: SetKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_data_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_files.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_header<S: AsRef<str>>(mut self, header: S) -> Self {
        self.header = Some(header.as_ref().to_string());
        self
    }

    pub fn with_source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_include_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.includes.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_template_suffix<S: AsRef<str>>(mut self, suffix: S) -> Self {
        self.template_suffix = suffix.as_ref().to_string();
        self
    }

    pub fn with_layout(mut self, layout: OutputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Adds a variant, failing if one with the same name already exists.
    pub fn with_variant(mut self, variant: Variant) -> Result<Self, Error> {
        self.add_variant(variant)?;
        Ok(self)
    }

    pub fn add_variant(&mut self, variant: Variant) -> Result<(), Error> {
        if self.variants.contains_key(variant.name()) {
            return Err(Error::DuplicateVariant {
                set: self.name.clone(),
                variant: variant.name().to_string(),
            });
        }
        self.variants.insert(variant.name().to_string(), variant);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    pub fn data_files(&self) -> &[PathBuf] {
        &self.data_files
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Variants, ordered by name.
    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.values()
    }

    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }

    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn template_suffix(&self) -> &str {
        &self.template_suffix
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }
}
