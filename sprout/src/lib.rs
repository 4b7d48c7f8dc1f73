//! Sprout generates source and resource files from directories of templates,
//! once for every variant of a template set, using layered YAML data and
//! in-memory properties.
//!
//! This crate provides an API that allows for embedding Sprout into another
//! build tool. For Sprout's command line interface, see the `sprout-cli`
//! crate.

pub mod data;
mod error;
pub mod fs;
mod generator;
mod model;
pub mod params;
mod project;
mod source;
mod template;
mod value;

pub use error::Error;
pub use generator::{generate, Generator, FILE_NAME_DISAMBIGUATOR};
pub use model::{
    OutputLayout, Properties, SetKind, TemplateSet, Variant, DEFAULT_TEMPLATE_SUFFIX,
};
pub use params::ResolvedParams;
pub use project::{Project, DEFAULT_MANIFEST, DEFAULT_SOURCE_SET};
pub use source::TemplateSources;
pub use template::Renderer;
pub use value::{to_value, Dictionary, Map, Value};
