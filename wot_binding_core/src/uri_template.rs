//! RFC 6570 URI Template expansion of form hrefs.
//!
//! Variables come from a JSON object: strings, numbers and booleans are
//! scalars, arrays are lists and objects are associative arrays. Missing
//! and `null` variables are undefined and expand to nothing.

use iri_string::{
    spec::UriSpec,
    template::{
        simple_context::{SimpleContext, Value as TemplateValue},
        UriTemplateStr,
    },
};
use serde_json::{Map, Value};

use crate::error::TemplateError;

/// Expand `template` against `vars`.
///
/// # Errors
///
/// Returns a [`TemplateError`] if `template` is not a valid URI Template.
pub fn expand(template: &str, vars: &Map<String, Value>) -> Result<String, TemplateError> {
    let invalid = |e: iri_string::template::Error| TemplateError::Invalid {
        template: template.to_string(),
        reason: e.to_string(),
    };

    let parsed = UriTemplateStr::new(template).map_err(invalid)?;
    let context = context(vars);
    let expanded = parsed.expand::<UriSpec, _>(&context).map_err(invalid)?;
    Ok(expanded.to_string())
}

/// Expand a form `href`, falling back to the literal href if it is malformed.
#[must_use]
pub fn resolve_href(href: &str, vars: &Map<String, Value>) -> String {
    expand(href, vars).unwrap_or_else(|e| {
        tracing::warn!("cannot expand URI template: {e}");
        href.to_string()
    })
}

fn context(vars: &Map<String, Value>) -> SimpleContext {
    let mut context = SimpleContext::new();
    for (name, value) in vars {
        let value = match value {
            Value::Null => continue,
            Value::Array(items) => TemplateValue::List(items.iter().map(scalar).collect()),
            Value::Object(pairs) => TemplateValue::Assoc(
                pairs.iter().map(|(k, v)| (k.clone(), scalar(v))).collect(),
            ),
            other => TemplateValue::String(scalar(other)),
        };
        context.insert(name.as_str(), value);
    }
    context
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
