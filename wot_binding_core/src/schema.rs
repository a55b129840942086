//! Advisory JSON Schema validation.
//!
//! Validation never blocks delivery. A failing check produces one `warn`
//! listing every violated rule, and the payload is delivered unchanged.

use serde_json::Value;

use crate::codec::Payload;

/// The outcome of an advisory check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advisory {
    violations: Vec<String>,
}

impl Advisory {
    /// Whether no rule was violated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Every violated rule, in the order the validator reported them.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Always `true`: advisories never stop a message.
    #[must_use]
    pub const fn allows_delivery(&self) -> bool {
        true
    }
}

/// Validate `instance` against `schema`, collecting all violations.
///
/// Formats are not asserted and unknown keywords are ignored, so TD data
/// schemas (which carry `forms`, `observable`, `@type`, ...) can be used
/// directly. A schema that does not compile is logged and treated as absent.
#[must_use]
pub fn validate(schema: &Value, instance: &Value) -> Advisory {
    let validator = match jsonschema::options()
        .should_validate_formats(false)
        .build(schema)
    {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("ignoring schema that does not compile: {e}");
            return Advisory::default();
        }
    };

    let violations = validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{path}: {e}")
            }
        })
        .collect();

    Advisory { violations }
}

/// Run an advisory check on a payload and log any violations.
///
/// `context` names what was checked, e.g. `"output"` or `"uri variables"`.
#[must_use]
pub fn check(context: &str, schema: Option<&Value>, payload: &Payload) -> Advisory {
    let Some(schema) = schema else {
        return Advisory::default();
    };

    let Some(instance) = payload.schema_instance() else {
        tracing::trace!("{context} payload is raw bytes, skipping schema check");
        return Advisory::default();
    };

    let advisory = validate(schema, &instance);
    if !advisory.is_valid() {
        tracing::warn!(
            "{context} schema validation error: {}",
            advisory.violations().join(", ")
        );
    }
    advisory
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_instance_has_no_violations() {
        let advisory = validate(&json!({ "type": "string" }), &json!("on"));
        assert!(advisory.is_valid());
        assert!(advisory.allows_delivery());
    }

    #[test]
    fn all_violations_are_collected() {
        let schema = json!({
            "type": "object",
            "properties": {
                "brightness": { "type": "integer", "maximum": 100 },
                "duration": { "type": "integer", "minimum": 1 }
            },
            "required": ["brightness", "duration", "colour"]
        });
        let advisory = validate(&schema, &json!({ "brightness": 150, "duration": 0 }));

        assert_eq!(advisory.violations().len(), 3);
        assert!(advisory.allows_delivery());
    }

    #[test]
    fn td_property_objects_work_as_schemas() {
        let property = json!({
            "@type": "saref:OnOffState",
            "type": "string",
            "forms": [{ "href": "https://mylamp.example.com/status" }],
            "observable": false,
            "readOnly": false
        });
        assert!(validate(&property, &json!("on")).is_valid());
        assert!(!validate(&property, &json!(true)).is_valid());
    }

    #[test]
    fn formats_are_not_asserted() {
        let schema = json!({ "type": "string", "format": "date-time" });
        assert!(validate(&schema, &json!("yesterday")).is_valid());
    }

    #[test]
    fn check_skips_raw_payloads_and_missing_schemas() {
        let schema = json!({ "type": "string" });
        assert!(check("output", Some(&schema), &Payload::Raw(vec![0])).is_valid());
        assert!(check("output", None, &Payload::Json(json!(1))).is_valid());
        assert!(!check("output", Some(&schema), &Payload::Json(json!(1))).is_valid());
    }

    #[test]
    fn uncompilable_schema_is_treated_as_absent() {
        let advisory = validate(&json!({ "type": 12 }), &json!("x"));
        assert!(advisory.is_valid());
    }
}
