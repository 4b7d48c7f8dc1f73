//! Expansion of a template set's templates into output files.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info};

use crate::fs::{ensure_parent_path_exists, ensure_path_exists};
use crate::params::{self, ResolvedParams};
use crate::{Error, OutputLayout, Renderer, TemplateSet, TemplateSources};

/// Prepended to a template identifier before it is rendered as a file name,
/// so the file name is never confused with the registered template of the
/// same name.
pub const FILE_NAME_DISAMBIGUATOR: &str = "###";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Where an output file came from.
#[derive(Debug, Clone)]
struct Origin {
    template: String,
    variant: Option<String>,
}

/// Execution context for generating the output of a single template set.
pub struct Generator<'a> {
    set: &'a TemplateSet,
    renderer: Renderer<'a>,
    templates: Vec<String>,
}

impl<'a> Generator<'a> {
    /// Discovers and compiles the templates of the given set.
    ///
    /// Templates under include directories are compiled too, so that they
    /// can be pulled into other templates, but they do not produce output.
    pub fn new(set: &'a TemplateSet) -> Result<Self, Error> {
        let sources = TemplateSources::new(set.sources(), set.includes());
        if sources.is_empty() {
            return Err(Error::NoSourceDirectories(set.name().to_string()));
        }
        if set.layout() == OutputLayout::PerVariant {
            // Each variant becomes one directory directly below the output root.
            if let Some(variant) = set.variants().find(|v| !is_plain_name(v.name())) {
                return Err(Error::InvalidVariantDirectory {
                    set: set.name().to_string(),
                    variant: variant.name().to_string(),
                });
            }
        }

        let templates = sources.template_identifiers()?;
        let includes = sources.include_identifiers()?;
        let mut renderer = Renderer::new();
        for identifier in templates.iter().chain(includes.iter()) {
            if renderer.has_template(identifier) {
                continue;
            }
            renderer.register(identifier, sources.resolve(identifier)?)?;
        }
        debug!(
            "Template set {} has {} template(s) and {} include(s)",
            set.name(),
            templates.len(),
            includes.len()
        );

        Ok(Self {
            set,
            renderer,
            templates: templates.into_iter().collect(),
        })
    }

    /// Renders every template once per resolved parameter dictionary.
    ///
    /// Stops at the first error. Files written before the error are left in
    /// place. On success, returns the paths of all written files.
    pub fn generate(&self) -> Result<Vec<PathBuf>, Error> {
        let resolved = params::resolve(self.set)?;
        ensure_path_exists(self.set.output())?;

        let mut seen = HashMap::new();
        let mut written = Vec::new();
        for template in &self.templates {
            for params in &resolved {
                written.push(self.generate_one(template, params, &mut seen)?);
            }
        }
        info!(
            "Generated {} file(s) for template set {} in {}",
            written.len(),
            self.set.name(),
            self.set.output().display()
        );
        Ok(written)
    }

    fn generate_one(
        &self,
        template: &str,
        params: &ResolvedParams,
        seen: &mut HashMap<PathBuf, Origin>,
    ) -> Result<PathBuf, Error> {
        let file_name = self.output_file_name(template, params)?;
        let rendered = self.renderer.render(template, &params.data)?;

        let output_path = self.output_root(params).join(&file_name);
        let origin = Origin {
            template: template.to_string(),
            variant: params.variant.clone(),
        };
        if let Some(previous) = seen.get(&output_path) {
            return Err(Error::DuplicateOutput {
                path: output_path,
                template: origin.template,
                variant: origin.variant,
                previous_template: previous.template.clone(),
                previous_variant: previous.variant.clone(),
            });
        }
        seen.insert(output_path.clone(), origin);

        ensure_parent_path_exists(&output_path)?;
        let content = match self.set.header() {
            Some(header) => format!("{}{}{}", header, LINE_ENDING, rendered),
            None => rendered,
        };
        fs::write(&output_path, content).map_err(|e| Error::io(&output_path, e))?;
        debug!(
            "Template {}{} generated {}",
            template,
            params
                .variant
                .as_ref()
                .map(|v| format!(" (variant {})", v))
                .unwrap_or_default(),
            output_path.display()
        );
        Ok(output_path)
    }

    // The file name of a template is itself a template, rendered against the
    // same data as the body.
    fn output_file_name(&self, template: &str, params: &ResolvedParams) -> Result<String, Error> {
        let source = format!("{}{}", FILE_NAME_DISAMBIGUATOR, template);
        let rendered = self
            .renderer
            .render_literal(template, &source, &params.data)?;
        let rendered = rendered
            .strip_prefix(FILE_NAME_DISAMBIGUATOR)
            .ok_or_else(|| Error::MissingDisambiguationPrefix(template.to_string()))?;

        let suffix = self.set.template_suffix();
        let file_name = if suffix.is_empty() {
            rendered
        } else {
            rendered.strip_suffix(suffix).unwrap_or(rendered)
        };
        if !is_contained_relative_path(Path::new(file_name)) {
            return Err(Error::OutputEscapesRoot(
                file_name.to_string(),
                template.to_string(),
            ));
        }
        Ok(file_name.to_string())
    }

    fn output_root(&self, params: &ResolvedParams) -> PathBuf {
        match (self.set.layout(), &params.variant) {
            (OutputLayout::PerVariant, Some(variant)) => self.set.output().join(variant),
            _ => self.set.output().to_path_buf(),
        }
    }
}

fn is_contained_relative_path(path: &Path) -> bool {
    let mut has_name = false;
    for component in path.components() {
        match component {
            Component::Normal(_) => has_name = true,
            Component::CurDir => {}
            _ => return false,
        }
    }
    has_name
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Generates all output files of the given template set.
pub fn generate(set: &TemplateSet) -> Result<Vec<PathBuf>, Error> {
    Generator::new(set)?.generate()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Properties, Variant};
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    fn boxes_set(dir: &TempDir) -> TemplateSet {
        let src = dir.path().join("java-templates");
        write(
            &src,
            "test/{{type}}Box.java.peb",
            "package test;\n\npublic class {{type}}Box { {{wrapper}} value; }\n",
        );
        TemplateSet::new("java", dir.path().join("out"))
            .with_source_dir(&src)
            .with_properties(Properties::default().with("wrapper", "final").unwrap())
            .with_variant(
                Variant::new("int")
                    .with_properties(Properties::default().with("type", "Int").unwrap()),
            )
            .unwrap()
            .with_variant(
                Variant::new("long")
                    .with_properties(Properties::default().with("type", "Long").unwrap()),
            )
            .unwrap()
    }

    #[test]
    fn file_names_expand_per_variant() {
        let dir = TempDir::new().unwrap();
        let set = boxes_set(&dir);
        let written = generate(&set).unwrap();

        let out = dir.path().join("out/test");
        assert_eq!(
            written,
            vec![out.join("IntBox.java"), out.join("LongBox.java")]
        );
        assert_eq!(
            read(&out.join("IntBox.java")),
            "package test;\n\npublic class IntBox { final value; }\n"
        );
        assert_eq!(
            read(&out.join("LongBox.java")),
            "package test;\n\npublic class LongBox { final value; }\n"
        );
    }

    #[test]
    fn header_is_written_before_the_body() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "build-info.properties.peb", "version={{version}}\n");
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_header("# generated, do not edit")
            .with_properties(Properties::default().with("version", "1.0.3").unwrap());

        generate(&set).unwrap();
        assert_eq!(
            read(&dir.path().join("out/build-info.properties")),
            format!("# generated, do not edit{}version=1.0.3\n", LINE_ENDING)
        );
    }

    #[test]
    fn files_without_the_suffix_keep_their_names() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "plain.txt", "{{ name }}");
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_properties(Properties::default().with("name", "x").unwrap());
        generate(&set).unwrap();
        assert_eq!(read(&dir.path().join("out/plain.txt")), "x");
    }

    #[test]
    fn custom_template_suffix() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "a.txt.hbs", "{{ name }}");
        write(&src, "b.txt.peb", "{{ name }}");
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_template_suffix(".hbs")
            .with_properties(Properties::default().with("name", "x").unwrap());
        generate(&set).unwrap();
        assert!(dir.path().join("out/a.txt").is_file());
        assert!(dir.path().join("out/b.txt.peb").is_file());
    }

    #[test]
    fn includes_are_used_but_not_emitted() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("resource-templates");
        let inc = dir.path().join("resource-macros");
        write(
            &src,
            "test.properties.peb",
            "value={{> macros}} {{> macros}} {{> macros}}\n",
        );
        write(&inc, "macros", "{{ value }}");
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_include_dir(&inc)
            .with_properties(Properties::default().with("value", "abc123").unwrap());

        let written = generate(&set).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(
            read(&dir.path().join("out/test.properties")),
            "value=abc123 abc123 abc123\n"
        );
        assert!(!dir.path().join("out/macros").exists());
    }

    #[test]
    fn duplicate_outputs_are_fatal_without_rollback() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "a.txt", "first");
        write(&src, "a.txt.peb", "second");
        let set = TemplateSet::new("resource", dir.path().join("out")).with_source_dir(&src);

        match generate(&set) {
            Err(Error::DuplicateOutput {
                path,
                template,
                previous_template,
                ..
            }) => {
                assert_eq!(path, dir.path().join("out/a.txt"));
                assert_eq!(template, "a.txt.peb");
                assert_eq!(previous_template, "a.txt");
            }
            other => panic!("expected a duplicate output error, got {:?}", other),
        }
        assert_eq!(read(&dir.path().join("out/a.txt")), "first");
    }

    #[test]
    fn identical_variants_collide_in_a_unified_layout() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "Same.java.peb", "class Same {}");
        let set = TemplateSet::new("java", dir.path().join("out"))
            .with_source_dir(&src)
            .with_variant(Variant::new("a"))
            .unwrap()
            .with_variant(Variant::new("b"))
            .unwrap();

        let err = generate(&set).unwrap_err();
        match &err {
            Error::DuplicateOutput {
                variant,
                previous_variant,
                ..
            } => {
                assert_eq!(variant.as_deref(), Some("b"));
                assert_eq!(previous_variant.as_deref(), Some("a"));
            }
            other => panic!("expected a duplicate output error, got {:?}", other),
        }
        assert!(err.to_string().contains("variant \"b\""));
    }

    #[test]
    fn per_variant_layout_separates_outputs() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "config.yml.peb", "name: {{ name }}\n");
        let data = dir.path().join("data.yaml");
        fs::write(&data, "name: base\nvariants:\n  dev:\n    name: dev\n  prod: {}\n").unwrap();
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_data_file(&data)
            .with_layout(OutputLayout::PerVariant)
            .with_variant(Variant::new("dev"))
            .unwrap()
            .with_variant(Variant::new("prod"))
            .unwrap();

        generate(&set).unwrap();
        assert_eq!(read(&dir.path().join("out/dev/config.yml")), "name: dev\n");
        assert_eq!(read(&dir.path().join("out/prod/config.yml")), "name: base\n");
    }

    #[test]
    fn per_variant_directories_stay_inside_the_output_root() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "a.txt.peb", "a");
        for name in &["../../escaped", "/abs", "nested/dir", ".."] {
            let set = TemplateSet::new("resource", dir.path().join("out/set"))
                .with_source_dir(&src)
                .with_layout(OutputLayout::PerVariant)
                .with_variant(Variant::new(name))
                .unwrap();
            match generate(&set) {
                Err(Error::InvalidVariantDirectory { variant, .. }) => assert_eq!(&variant, name),
                other => panic!("expected a variant directory error for {}, got {:?}", name, other),
            }
        }
        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("out").exists());

        // The same names are fine when variants share the output root.
        let set = TemplateSet::new("resource", dir.path().join("out/set"))
            .with_source_dir(&src)
            .with_variant(Variant::new("../../escaped"))
            .unwrap();
        assert_eq!(generate(&set).unwrap(), vec![dir.path().join("out/set/a.txt")]);
    }

    #[test]
    fn no_source_directories() {
        let dir = TempDir::new().unwrap();
        let set = TemplateSet::new("empty", dir.path().join("out"));
        match generate(&set) {
            Err(Error::NoSourceDirectories(name)) => assert_eq!(name, "empty"),
            other => panic!("expected a missing sources error, got {:?}", other),
        }
    }

    #[test]
    fn undefined_variables_abort_generation() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "a.txt.peb", "{{ nope }}");
        let set = TemplateSet::new("resource", dir.path().join("out")).with_source_dir(&src);
        assert!(matches!(
            generate(&set),
            Err(Error::TemplateRender(name, _)) if name == "a.txt.peb"
        ));
    }

    #[test]
    fn rendered_names_cannot_escape_the_output_root() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        write(&src, "{{ dir }}x.txt.peb", "x");
        let set = TemplateSet::new("resource", dir.path().join("out"))
            .with_source_dir(&src)
            .with_properties(Properties::default().with("dir", "../").unwrap());
        assert!(matches!(
            generate(&set),
            Err(Error::OutputEscapesRoot(name, _)) if name == "../x.txt"
        ));
        assert!(!dir.path().join("x.txt").exists());
    }

    #[test]
    fn generation_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let first = boxes_set(&dir);
        let second = TemplateSet::new("java", dir.path().join("again"))
            .with_source_dir(dir.path().join("java-templates"))
            .with_properties(first.properties().clone())
            .with_variant(first.variants().next().unwrap().clone())
            .unwrap()
            .with_variant(first.variants().nth(1).unwrap().clone())
            .unwrap();

        let a = generate(&first).unwrap();
        let b = generate(&second).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(
                x.strip_prefix(dir.path().join("out")).unwrap(),
                y.strip_prefix(dir.path().join("again")).unwrap()
            );
            assert_eq!(fs::read(x).unwrap(), fs::read(y).unwrap());
        }
    }
}
