//! A project brings together all of the template sets that generate files
//! into one build output directory.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use log::{debug, info};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::fs::delete_contents;
use crate::{
    generate, Dictionary, Error, Map, OutputLayout, Properties, SetKind, TemplateSet, Value,
    Variant,
};

/// The name of the manifest file looked for by default.
pub const DEFAULT_MANIFEST: &str = "sprout.yml";

/// The source set used to locate templates if none is given.
pub const DEFAULT_SOURCE_SET: &str = "main";

/// A collection of named template sets that share a base directory and a
/// generated files directory.
#[derive(Debug)]
pub struct Project {
    base: PathBuf,
    generated: PathBuf,
    sets: Map<String, TemplateSet>,
}

impl Project {
    /// Constructor. Generated files go to `build/generated` under the base
    /// directory unless configured otherwise.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref().to_path_buf();
        Self {
            generated: base.join("build").join("generated"),
            base,
            sets: Map::new(),
        }
    }

    pub fn with_generated_dir<P: AsRef<Path>>(mut self, generated: P) -> Self {
        self.generated = self.resolve_path(generated);
        self
    }

    /// Load a project from the given manifest file. Relative paths in the
    /// manifest are resolved against the manifest's directory.
    pub fn load<P: AsRef<Path>>(manifest_path: P) -> Result<Self> {
        let manifest_path = manifest_path.as_ref();
        debug!("Attempting to load manifest: {}", manifest_path.display());
        let content = fs::read_to_string(manifest_path)
            .wrap_err_with(|| Error::FailedToLoadManifest(manifest_path.to_path_buf()))?;
        let manifest = serde_yaml::from_str::<Manifest>(&content)
            .wrap_err_with(|| Error::FailedToLoadManifest(manifest_path.to_path_buf()))?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let project = Self::from_manifest(base, manifest)
            .wrap_err_with(|| Error::FailedToLoadManifest(manifest_path.to_path_buf()))?;
        debug!(
            "Loaded {} template set(s) from {}",
            project.sets.len(),
            manifest_path.display()
        );
        Ok(project)
    }

    fn from_manifest(base: PathBuf, manifest: Manifest) -> Result<Self, Error> {
        let mut project = Self::new(base);
        if let Some(generated) = manifest.generated {
            project = project.with_generated_dir(generated);
        }
        for (name, set_manifest) in manifest.template_sets {
            let set = project.build_set(&name, set_manifest)?;
            project.add(set)?;
        }
        Ok(project)
    }

    fn build_set(&self, name: &str, m: SetManifest) -> Result<TemplateSet, Error> {
        let output = match &m.output {
            Some(output) => self.resolve_path(output),
            None => self.default_output_dir(m.kind, name),
        };
        let mut set = TemplateSet::new(name, output)
            .with_kind(m.kind)
            .with_layout(m.layout)
            .with_properties(to_properties(m.properties)?);
        if m.templates.is_empty() {
            let source_set = m.source_set.as_deref().unwrap_or(DEFAULT_SOURCE_SET);
            set = set.with_source_dir(self.default_templates_dir(source_set, name));
        }
        for dir in &m.templates {
            set = set.with_source_dir(self.resolve_path(dir));
        }
        for dir in &m.includes {
            set = set.with_include_dir(self.resolve_path(dir));
        }
        for file in &m.data_files {
            set = set.with_data_file(self.resolve_path(file));
        }
        if let Some(header) = &m.header {
            set = set.with_header(header);
        }
        if let Some(suffix) = &m.template_suffix {
            set = set.with_template_suffix(suffix);
        }
        match m.variants {
            VariantsManifest::Names(names) => {
                for variant in names {
                    set.add_variant(Variant::new(variant))?;
                }
            }
            VariantsManifest::Detailed(variants) => {
                for (variant_name, vm) in variants {
                    let vm = vm.unwrap_or_default();
                    let mut variant = Variant::new(&variant_name)
                        .with_properties(to_properties(vm.properties)?);
                    for file in &vm.data_files {
                        variant = variant.with_data_file(self.resolve_path(file));
                    }
                    set.add_variant(variant)?;
                }
            }
        }
        Ok(set)
    }

    fn resolve_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }

    /// Where templates for the named set are read from by default:
    /// `src/<source set>/<set name>-templates`.
    pub fn default_templates_dir(&self, source_set: &str, set_name: &str) -> PathBuf {
        self.base
            .join("src")
            .join(source_set)
            .join(format!("{}-templates", set_name))
    }

    /// Where the output of the named set goes by default.
    pub fn default_output_dir(&self, kind: SetKind, set_name: &str) -> PathBuf {
        self.generated.join(kind.output_dir_name()).join(set_name)
    }

    /// Adds a template set, returning an error if one with the same name
    /// already exists.
    pub fn add(&mut self, set: TemplateSet) -> Result<(), Error> {
        if self.sets.contains_key(set.name()) {
            return Err(Error::DuplicateTemplateSet(set.name().to_string()));
        }
        debug!("Registered template set {}", set.name());
        self.sets.insert(set.name().to_string(), set);
        Ok(())
    }

    pub fn template_set(&self, name: &str) -> Option<&TemplateSet> {
        self.sets.get(name)
    }

    /// All template sets, ordered by name.
    pub fn template_sets(&self) -> impl Iterator<Item = &TemplateSet> {
        self.sets.values()
    }

    /// Template sets write into separate output directories, so they must not
    /// share (or nest) them.
    pub fn check_output_dirs(&self) -> Result<(), Error> {
        let sets = self.sets.values().collect::<Vec<&TemplateSet>>();
        for (i, a) in sets.iter().enumerate() {
            for b in &sets[i + 1..] {
                if a.output().starts_with(b.output()) || b.output().starts_with(a.output()) {
                    return Err(Error::OverlappingOutputRoots(
                        a.name().to_string(),
                        b.name().to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Generates the named template sets, in the given order. If `clean` is
    /// set, each set's output directory is emptied first.
    ///
    /// Returns the number of files written.
    pub fn generate<S: AsRef<str>>(&self, names: &[S], clean: bool) -> Result<usize> {
        self.check_output_dirs()?;
        let mut count = 0_usize;
        for name in names {
            let name = name.as_ref();
            let set = self
                .sets
                .get(name)
                .ok_or_else(|| Error::NoSuchTemplateSet(name.to_string()))?;
            if clean {
                delete_contents(set.output())?;
            }
            count += generate(set)
                .wrap_err_with(|| format!("failed to process templates of set \"{}\"", name))?
                .len();
        }
        info!("Generated {} file(s) in total", count);
        Ok(count)
    }

    /// Generates every template set, ordered by name.
    pub fn generate_all(&self, clean: bool) -> Result<usize> {
        let names = self.sets.keys().cloned().collect::<Vec<String>>();
        self.generate(&names, clean)
    }
}

fn to_properties(properties: Map<String, YamlValue>) -> Result<Properties, Error> {
    Ok(Properties::from(
        properties
            .into_iter()
            .map(|(k, v)| Ok::<_, Error>((k, Value::try_from(v)?)))
            .collect::<Result<Dictionary, Error>>()?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    generated: Option<PathBuf>,
    #[serde(default)]
    template_sets: Map<String, SetManifest>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SetManifest {
    kind: SetKind,
    source_set: Option<String>,
    templates: Vec<PathBuf>,
    includes: Vec<PathBuf>,
    data_files: Vec<PathBuf>,
    properties: Map<String, YamlValue>,
    header: Option<String>,
    template_suffix: Option<String>,
    layout: OutputLayout,
    output: Option<PathBuf>,
    variants: VariantsManifest,
}

// Variants are either just listed by name, or configured individually.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariantsManifest {
    Names(Vec<String>),
    Detailed(Map<String, Option<VariantManifest>>),
}

impl Default for VariantsManifest {
    fn default() -> Self {
        Self::Names(Vec::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct VariantManifest {
    data_files: Vec<PathBuf>,
    properties: Map<String, YamlValue>,
}
