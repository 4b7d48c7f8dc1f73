//! Template evaluation.

use handlebars::{
    no_escape, Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError,
};
use log::trace;
use serde_json::Value as JsonValue;

use crate::{Dictionary, Error};

/// A configured [Handlebars](https://handlebarsjs.com/) registry.
///
/// Variables that are not defined in the data are render errors and output
/// is never HTML-escaped, since generated files are usually source code.
pub struct Renderer<'reg> {
    hb: Handlebars<'reg>,
}

impl<'reg> Default for Renderer<'reg> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'reg> Renderer<'reg> {
    /// Constructor.
    pub fn new() -> Self {
        let mut hb = Handlebars::new();
        hb.set_strict_mode(true);
        hb.register_escape_fn(no_escape);
        hb.register_helper("pad", Box::new(pad));
        hb.register_helper("upper", Box::new(upper));
        hb.register_helper("lower", Box::new(lower));
        hb.register_helper("capitalize", Box::new(capitalize));
        Self { hb }
    }

    /// Compiles the given template and registers it under the given
    /// identifier, so it can be rendered by name or included into other
    /// templates as a partial.
    pub fn register<N, T>(&mut self, identifier: N, template: T) -> Result<(), Error>
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        let identifier = identifier.as_ref();
        trace!("Registering template {}", identifier);
        self.hb
            .register_template_string(identifier, template.as_ref())
            .map_err(|e| Error::TemplateRegistration(identifier.to_string(), Box::new(e)))
    }

    pub fn has_template(&self, identifier: &str) -> bool {
        self.hb.has_template(identifier)
    }

    /// Renders a previously registered template.
    pub fn render(&self, identifier: &str, data: &Dictionary) -> Result<String, Error> {
        self.hb
            .render(identifier, data)
            .map_err(|e| Error::TemplateRender(identifier.to_string(), Box::new(e)))
    }

    /// Compiles and renders a one-off template that is not kept in the
    /// registry. `name` is only used for error reporting.
    pub fn render_literal(
        &self,
        name: &str,
        source: &str,
        data: &Dictionary,
    ) -> Result<String, Error> {
        self.hb
            .render_template(source, data)
            .map_err(|e| Error::TemplateRender(name.to_string(), Box::new(e)))
    }
}

fn param_string(h: &Helper, idx: usize) -> Result<String, RenderError> {
    let value = h.param(idx).map(|p| p.value()).ok_or_else(|| {
        RenderError::new(format!(
            "helper \"{}\" is missing parameter {}",
            h.name(),
            idx + 1
        ))
    })?;
    Ok(match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Pad a string with a given character or string until it meets the specified
/// length.
///
/// Usage:
///
/// ```handlebars
/// {{ pad "2" "0" 2 }}
/// ```
///
/// Produces `02`. Parameters are in the format
/// `{{ pad string paddingCharOrString desiredMinLength }}`
pub fn pad(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = param_string(h, 0)?;
    let padding = param_string(h, 1)?;
    let min_len = h
        .param(2)
        .and_then(|p| p.value().as_u64())
        .ok_or_else(|| RenderError::new("pad expects a non-negative length as its third parameter"))?
        as usize;
    if padding.is_empty() {
        return Err(RenderError::new("pad expects a non-empty padding string"));
    }

    let mut prefix = String::new();
    let mut len = value.chars().count();
    while len < min_len {
        for c in padding.chars() {
            if len >= min_len {
                break;
            }
            prefix.push(c);
            len += 1;
        }
    }
    out.write(&prefix)?;
    out.write(&value)?;
    Ok(())
}

/// Converts its parameter to upper case: `{{ upper type }}`.
pub fn upper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&param_string(h, 0)?.to_uppercase())?;
    Ok(())
}

/// Converts its parameter to lower case: `{{ lower type }}`.
pub fn lower(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&param_string(h, 0)?.to_lowercase())?;
    Ok(())
}

/// Upper-cases the first character of its parameter, which is handy when
/// deriving type names from data: `{{ capitalize type }}Box`.
pub fn capitalize(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = param_string(h, 0)?;
    let mut chars = value.chars();
    if let Some(first) = chars.next() {
        out.write(&first.to_uppercase().collect::<String>())?;
        out.write(chars.as_str())?;
    }
    Ok(())
}
