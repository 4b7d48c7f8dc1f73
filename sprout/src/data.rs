//! Loading of template data from YAML files.

use std::fs;
use std::path::Path;

use log::debug;
use serde_yaml::Value as YamlValue;

use crate::value::mapping_to_dictionary;
use crate::{Dictionary, Error, Map, Value};

/// The reserved top-level key holding per-variant overrides.
pub const VARIANTS_KEY: &str = "variants";

/// The merged content of a group of data files, split into buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedData {
    /// Top-level (non-variant) data. `None` if no file contributed any.
    pub global: Option<Dictionary>,
    /// Per-variant overrides, keyed by variant name.
    pub variants: Map<String, Dictionary>,
}

impl LoadedData {
    /// Merges a parsed document's buckets into this one. Later documents
    /// overwrite top-level keys set by earlier ones.
    fn merge(&mut self, global: Dictionary, variants: Map<String, Dictionary>) {
        self.global.get_or_insert_with(Dictionary::new).extend(global);
        for (name, overrides) in variants {
            self.variants.entry(name).or_default().extend(overrides);
        }
    }
}

/// Load the given data files, in order.
///
/// Files that do not exist are skipped. If `allow_variants` is set, the
/// reserved `variants` key is split out of each document into per-variant
/// buckets; otherwise it is treated like any other key.
pub fn load<P: AsRef<Path>>(files: &[P], allow_variants: bool) -> Result<LoadedData, Error> {
    let mut loaded = LoadedData::default();
    for file in files {
        let file = file.as_ref();
        if !file.is_file() {
            debug!("Skipping missing data file: {}", file.display());
            continue;
        }
        let content = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
        let (global, variants) = parse_document(file, &content, allow_variants)?;
        debug!(
            "Loaded {} global key(s) and {} variant bucket(s) from {}",
            global.len(),
            variants.len(),
            file.display()
        );
        loaded.merge(global, variants);
    }
    Ok(loaded)
}

/// Parses a single data document into its global and per-variant buckets.
///
/// The `path` is only used for error reporting.
pub fn parse_document(
    path: &Path,
    content: &str,
    allow_variants: bool,
) -> Result<(Dictionary, Map<String, Dictionary>), Error> {
    let yaml = serde_yaml::from_str::<YamlValue>(content)
        .map_err(|e| Error::Yaml(path.to_path_buf(), e))?;
    let mut root = match yaml {
        YamlValue::Mapping(m) => m,
        _ => return Err(Error::RootNotMapping(path.to_path_buf())),
    };

    let mut variants = Map::new();
    if allow_variants {
        if let Some(section) = root.remove(&YamlValue::String(VARIANTS_KEY.to_string())) {
            let section = match Value::try_from(section)? {
                Value::Map(m) => m,
                // An empty `variants:` key declares no overrides.
                Value::Null => Dictionary::new(),
                _ => return Err(Error::VariantsNotMapping(path.to_path_buf())),
            };
            for (name, overrides) in section {
                let overrides = overrides.into_map().map_err(|other| {
                    Error::VariantNotMapping(path.to_path_buf(), name.clone(), other.type_name())
                })?;
                variants.insert(name, overrides);
            }
        }
    }

    Ok((mapping_to_dictionary(root)?, variants))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn splits_variants_from_global_data() {
        let (global, variants) = parse_document(
            Path::new("data.yaml"),
            "fruit: apple\nvariants:\n  A:\n    fruit: banana\n  B: {}\n",
            true,
        )
        .unwrap();
        assert_eq!(global.get("fruit"), Some(&Value::from("apple")));
        assert!(!global.contains_key(VARIANTS_KEY));
        assert_eq!(variants.len(), 2);
        assert_eq!(variants["A"].get("fruit"), Some(&Value::from("banana")));
        assert!(variants["B"].is_empty());
    }

    #[test]
    fn variants_key_is_plain_data_without_variants() {
        let (global, variants) = parse_document(
            Path::new("data.yaml"),
            "variants:\n  A:\n    fruit: banana\n",
            false,
        )
        .unwrap();
        assert!(variants.is_empty());
        assert!(global.contains_key(VARIANTS_KEY));
    }

    #[test]
    fn non_mapping_roots_are_rejected() {
        for content in &["- a\n- b\n", "just a string\n", "42\n"] {
            match parse_document(Path::new("bad.yaml"), content, false) {
                Err(Error::RootNotMapping(path)) => assert_eq!(path, PathBuf::from("bad.yaml")),
                other => panic!("expected root error for {:?}, got {:?}", content, other),
            }
        }
    }

    #[test]
    fn non_mapping_variants_section_is_rejected() {
        let result = parse_document(Path::new("data.yaml"), "variants: [A, B]\n", true);
        assert!(matches!(result, Err(Error::VariantsNotMapping(_))));
    }

    #[test]
    fn empty_variants_section_declares_no_variants() {
        let (global, variants) =
            parse_document(Path::new("data.yaml"), "fruit: apple\nvariants:\n", true).unwrap();
        assert!(variants.is_empty());
        assert!(!global.contains_key(VARIANTS_KEY));
        assert_eq!(global.get("fruit"), Some(&Value::from("apple")));
    }

    #[test]
    fn malformed_files_are_named_in_errors() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.yaml", "a: 1\n");
        let bad = write(&dir, "bad.yaml", "a: [1, 2\nb: 3\n");
        match load(&[good, bad.clone()], true) {
            Err(Error::Yaml(path, _)) => assert_eq!(path, bad),
            other => panic!("expected a YAML error, got {:?}", other),
        }
    }

    #[test]
    fn non_mapping_variant_value_names_the_variant() {
        let result = parse_document(Path::new("data.yaml"), "variants:\n  A: 42\n", true);
        match result {
            Err(Error::VariantNotMapping(_, name, kind)) => {
                assert_eq!(name, "A");
                assert_eq!(kind, "integer");
            }
            other => panic!("expected a variant shape error, got {:?}", other),
        }
    }

    #[test]
    fn later_files_overwrite_earlier_keys() {
        let dir = TempDir::new().unwrap();
        let first = write(
            &dir,
            "first.yaml",
            "a: 1\nb: 1\nnested: {x: 1, y: 1}\nvariants:\n  V:\n    c: 1\n",
        );
        let second = write(
            &dir,
            "second.yaml",
            "b: 2\nnested: {x: 2}\nvariants:\n  V:\n    d: 2\n",
        );
        let missing = dir.path().join("missing.yaml");

        let loaded = load(&[first, missing, second], true).unwrap();
        let global = loaded.global.unwrap();
        assert_eq!(global.get("a"), Some(&Value::Signed(1)));
        assert_eq!(global.get("b"), Some(&Value::Signed(2)));
        // No deep merging: the later mapping replaces the earlier one.
        let nested = global.get("nested").unwrap().as_map().unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested.get("x"), Some(&Value::Signed(2)));

        let v = &loaded.variants["V"];
        assert_eq!(v.get("c"), Some(&Value::Signed(1)));
        assert_eq!(v.get("d"), Some(&Value::Signed(2)));
    }

    #[test]
    fn no_files_means_no_global_bucket() {
        let dir = TempDir::new().unwrap();
        let loaded = load(&[dir.path().join("nope.yaml")], true).unwrap();
        assert_eq!(loaded, LoadedData::default());
    }
}
