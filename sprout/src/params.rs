//! Resolution of the layered data of a template set into one parameter
//! dictionary per variant.

use log::debug;

use crate::{data, Dictionary, Error, TemplateSet};

/// A fully merged parameter dictionary, tagged with the variant it was
/// produced for (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub variant: Option<String>,
    pub data: Dictionary,
}

/// Merges the data files and in-memory properties of the given template set
/// (and of its variants) into parameter dictionaries.
///
/// Without variants, a single dictionary is produced. With variants, one
/// dictionary per variant is produced, ordered by variant name, layered as
/// follows (lowest precedence first):
///
/// 1. data from the set's data files,
/// 2. the set's in-memory properties,
/// 3. the variant's section under `variants` in the set's data files,
/// 4. data from the variant's own data files,
/// 5. the variant's in-memory properties.
pub fn resolve(set: &TemplateSet) -> Result<Vec<ResolvedParams>, Error> {
    let mut loaded = data::load(set.data_files(), set.has_variants())?;

    let mut base = loaded.global.take().unwrap_or_default();
    set.properties().apply_to(&mut base);

    if !set.has_variants() {
        debug!(
            "Resolved {} parameter(s) for template set {}",
            base.len(),
            set.name()
        );
        return Ok(vec![ResolvedParams {
            variant: None,
            data: base,
        }]);
    }

    let mut resolved = Vec::new();
    for variant in set.variants() {
        let mut params = base.clone();
        if let Some(overrides) = loaded.variants.remove(variant.name()) {
            params.extend(overrides);
        }
        if let Some(from_files) = data::load(variant.data_files(), false)?.global {
            params.extend(from_files);
        }
        variant.properties().apply_to(&mut params);
        debug!(
            "Resolved {} parameter(s) for variant {} of template set {}",
            params.len(),
            variant.name(),
            set.name()
        );
        resolved.push(ResolvedParams {
            variant: Some(variant.name().to_string()),
            data: params,
        });
    }

    if !loaded.variants.is_empty() {
        return Err(Error::UnknownVariants {
            set: set.name().to_string(),
            names: loaded.variants.into_keys().collect(),
        });
    }
    Ok(resolved)
}
