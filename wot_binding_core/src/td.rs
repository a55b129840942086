//! Thing Description model.
//!
//! A [`ThingDescription`] is parsed, normalised and validated once at load
//! time. Affordances are a closed [`Affordance`] variant, so bindings never
//! need to probe a raw document for optional keys.
//!
//! Normalisation follows what a TD consumer is expected to do before use:
//! forms without a `security` entry inherit the Thing-level default, and
//! forms without a `contentType` default to `application/json`.

use core::fmt;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{codec::APPLICATION_JSON, error::TdError, security::SecurityScheme};

/// The three kinds of interaction affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AffordanceKind {
    /// A readable, writable or observable value.
    Property,
    /// An invocable function.
    Action,
    /// A stream of notifications.
    Event,
}

impl fmt::Display for AffordanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Property => "property",
            Self::Action => "action",
            Self::Event => "event",
        })
    }
}

/// A single endpoint through which an affordance can be invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    /// Target URI, possibly a URI Template.
    pub href: String,

    /// Media type of request bodies (and of responses unless overridden).
    pub content_type: String,

    /// Name of the single security scheme that applies, if any.
    pub security: Option<String>,

    /// `htv:methodName` hint.
    pub http_method: Option<String>,

    /// `cov:methodName` hint.
    pub coap_method: Option<String>,

    /// `response.contentType` override.
    pub response_content_type: Option<String>,

    /// Declared operation types (`readproperty`, `invokeaction`, ...).
    pub op: Vec<String>,
}

impl Form {
    /// The media type a response on this form is expected to carry.
    #[must_use]
    pub fn response_content_type(&self) -> &str {
        self.response_content_type
            .as_deref()
            .unwrap_or(&self.content_type)
    }
}

/// A property affordance.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAffordance {
    /// Property name.
    pub name: String,
    /// Endpoints, in declaration order.
    pub forms: Vec<Form>,
    /// Schema for URI Template variables.
    pub uri_variables: Option<Value>,
    /// Whether the property can be observed.
    pub observable: bool,
    /// Whether the property is read-only.
    pub read_only: bool,
    /// Whether the property is write-only.
    pub write_only: bool,
    /// The property object itself, which doubles as its data schema.
    pub schema: Value,
}

/// An action affordance.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionAffordance {
    /// Action name.
    pub name: String,
    /// Endpoints, in declaration order.
    pub forms: Vec<Form>,
    /// Schema for URI Template variables.
    pub uri_variables: Option<Value>,
    /// Schema of the invocation input.
    pub input: Option<Value>,
    /// Schema of the invocation result.
    pub output: Option<Value>,
    /// Whether the action is safe.
    pub safe: bool,
    /// Whether the action is idempotent.
    pub idempotent: bool,
}

/// An event affordance.
#[derive(Debug, Clone, PartialEq)]
pub struct EventAffordance {
    /// Event name.
    pub name: String,
    /// Endpoints, in declaration order.
    pub forms: Vec<Form>,
    /// Schema for URI Template variables.
    pub uri_variables: Option<Value>,
    /// Schema of the event data.
    pub data: Option<Value>,
}

/// A validated interaction affordance.
#[derive(Debug, Clone, PartialEq)]
pub enum Affordance {
    /// See [`PropertyAffordance`].
    Property(PropertyAffordance),
    /// See [`ActionAffordance`].
    Action(ActionAffordance),
    /// See [`EventAffordance`].
    Event(EventAffordance),
}

impl Affordance {
    /// The affordance kind.
    #[must_use]
    pub const fn kind(&self) -> AffordanceKind {
        match self {
            Self::Property(_) => AffordanceKind::Property,
            Self::Action(_) => AffordanceKind::Action,
            Self::Event(_) => AffordanceKind::Event,
        }
    }

    /// The affordance name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Property(p) => &p.name,
            Self::Action(a) => &a.name,
            Self::Event(e) => &e.name,
        }
    }

    /// All forms, in declaration order.
    #[must_use]
    pub fn forms(&self) -> &[Form] {
        match self {
            Self::Property(p) => &p.forms,
            Self::Action(a) => &a.forms,
            Self::Event(e) => &e.forms,
        }
    }

    /// The form at a statically configured index.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::FormIndexOutOfRange`] if `index` is past the end.
    pub fn form(&self, index: usize) -> Result<&Form, TdError> {
        let forms = self.forms();
        forms.get(index).ok_or(TdError::FormIndexOutOfRange {
            index,
            len: forms.len(),
        })
    }

    /// Schema for URI Template variables, if declared.
    #[must_use]
    pub fn uri_variables(&self) -> Option<&Value> {
        match self {
            Self::Property(p) => p.uri_variables.as_ref(),
            Self::Action(a) => a.uri_variables.as_ref(),
            Self::Event(e) => e.uri_variables.as_ref(),
        }
    }

    /// Schema that outbound request bodies are checked against.
    #[must_use]
    pub fn input_schema(&self) -> Option<&Value> {
        match self {
            Self::Property(p) => Some(&p.schema),
            Self::Action(a) => a.input.as_ref(),
            Self::Event(_) => None,
        }
    }

    /// Schema that inbound payloads are checked against.
    #[must_use]
    pub fn output_schema(&self) -> Option<&Value> {
        match self {
            Self::Property(p) => Some(&p.schema),
            Self::Action(a) => a.output.as_ref(),
            Self::Event(e) => e.data.as_ref(),
        }
    }
}

/// An immutable, validated Thing Description.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingDescription {
    /// Thing identifier.
    pub id: Option<String>,
    /// Human-readable title.
    pub title: String,
    /// Declared security schemes by name.
    pub security_definitions: BTreeMap<String, SecurityScheme>,
    properties: BTreeMap<String, Affordance>,
    actions: BTreeMap<String, Affordance>,
    events: BTreeMap<String, Affordance>,
}

impl ThingDescription {
    /// Parse, normalise and validate a TD from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`TdError`] if the document is malformed or inconsistent.
    pub fn from_json(text: &str) -> Result<Self, TdError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Parse, normalise and validate a TD from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns a [`TdError`] if the document is malformed or inconsistent.
    pub fn from_value(value: Value) -> Result<Self, TdError> {
        let raw: RawThing = serde_json::from_value(value)?;

        let security_definitions: BTreeMap<String, SecurityScheme> = raw
            .security_definitions
            .into_iter()
            .map(|(name, def)| (name, SecurityScheme::from_name(&def.scheme)))
            .collect();
        let default_security = raw.security.and_then(OneOrMany::into_first);

        let ctx = NormaliseCtx {
            definitions: &security_definitions,
            default_security: default_security.as_deref(),
        };

        let mut properties = BTreeMap::new();
        for (name, value) in raw.properties {
            let raw: RawProperty = serde_json::from_value(value.clone())?;
            let forms = ctx.forms(AffordanceKind::Property, &name, raw.forms)?;
            properties.insert(
                name.clone(),
                Affordance::Property(PropertyAffordance {
                    name,
                    forms,
                    uri_variables: raw.uri_variables,
                    observable: raw.observable,
                    read_only: raw.read_only,
                    write_only: raw.write_only,
                    schema: value,
                }),
            );
        }

        let mut actions = BTreeMap::new();
        for (name, raw) in raw.actions {
            let forms = ctx.forms(AffordanceKind::Action, &name, raw.forms)?;
            actions.insert(
                name.clone(),
                Affordance::Action(ActionAffordance {
                    name,
                    forms,
                    uri_variables: raw.uri_variables,
                    input: raw.input,
                    output: raw.output,
                    safe: raw.safe,
                    idempotent: raw.idempotent,
                }),
            );
        }

        let mut events = BTreeMap::new();
        for (name, raw) in raw.events {
            let forms = ctx.forms(AffordanceKind::Event, &name, raw.forms)?;
            events.insert(
                name.clone(),
                Affordance::Event(EventAffordance {
                    name,
                    forms,
                    uri_variables: raw.uri_variables,
                    data: raw.data,
                }),
            );
        }

        Ok(Self {
            id: raw.id,
            title: raw.title,
            security_definitions,
            properties,
            actions,
            events,
        })
    }

    /// Look up an affordance by kind and name.
    ///
    /// # Errors
    ///
    /// Returns [`TdError::UnknownAffordance`] if there is no such affordance.
    pub fn affordance(&self, kind: AffordanceKind, name: &str) -> Result<&Affordance, TdError> {
        let map = match kind {
            AffordanceKind::Property => &self.properties,
            AffordanceKind::Action => &self.actions,
            AffordanceKind::Event => &self.events,
        };
        map.get(name).ok_or_else(|| TdError::UnknownAffordance {
            kind,
            name: name.to_string(),
        })
    }

    /// The security scheme a form refers to, if any.
    #[must_use]
    pub fn security_scheme(&self, form: &Form) -> Option<&SecurityScheme> {
        form.security
            .as_deref()
            .and_then(|name| self.security_definitions.get(name))
    }

    /// Iterate over all property affordances.
    pub fn properties(&self) -> impl Iterator<Item = &Affordance> {
        self.properties.values()
    }

    /// Iterate over all action affordances.
    pub fn actions(&self) -> impl Iterator<Item = &Affordance> {
        self.actions.values()
    }

    /// Iterate over all event affordances.
    pub fn events(&self) -> impl Iterator<Item = &Affordance> {
        self.events.values()
    }
}

struct NormaliseCtx<'a> {
    definitions: &'a BTreeMap<String, SecurityScheme>,
    default_security: Option<&'a str>,
}

impl NormaliseCtx<'_> {
    fn forms(
        &self,
        kind: AffordanceKind,
        name: &str,
        raw: Vec<RawForm>,
    ) -> Result<Vec<Form>, TdError> {
        if raw.is_empty() {
            return Err(TdError::NoForms {
                kind,
                name: name.to_string(),
            });
        }

        raw.into_iter()
            .enumerate()
            .map(|(index, form)| {
                let href = form.href.ok_or_else(|| TdError::MissingHref {
                    kind,
                    name: name.to_string(),
                    index,
                })?;

                let security = form
                    .security
                    .and_then(OneOrMany::into_first)
                    .or_else(|| self.default_security.map(str::to_string));

                if let Some(scheme) = &security {
                    if !self.definitions.contains_key(scheme) {
                        return Err(TdError::UndeclaredSecurity {
                            kind,
                            name: name.to_string(),
                            index,
                            scheme: scheme.clone(),
                        });
                    }
                }

                Ok(Form {
                    href,
                    content_type: form
                        .content_type
                        .unwrap_or_else(|| APPLICATION_JSON.to_string()),
                    security,
                    http_method: form.http_method,
                    coap_method: form.coap_method,
                    response_content_type: form.response.and_then(|r| r.content_type),
                    op: form.op.map(OneOrMany::into_vec).unwrap_or_default(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_first(self) -> Option<String> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.into_iter().next(),
        }
    }

    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawThing {
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    security_definitions: BTreeMap<String, RawSecurity>,
    security: Option<OneOrMany>,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    #[serde(default)]
    actions: BTreeMap<String, RawAction>,
    #[serde(default)]
    events: BTreeMap<String, RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawSecurity {
    scheme: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProperty {
    #[serde(default)]
    forms: Vec<RawForm>,
    uri_variables: Option<Value>,
    #[serde(default)]
    observable: bool,
    #[serde(default)]
    read_only: bool,
    #[serde(default)]
    write_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAction {
    #[serde(default)]
    forms: Vec<RawForm>,
    uri_variables: Option<Value>,
    input: Option<Value>,
    output: Option<Value>,
    #[serde(default)]
    safe: bool,
    #[serde(default)]
    idempotent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    #[serde(default)]
    forms: Vec<RawForm>,
    uri_variables: Option<Value>,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawForm {
    href: Option<String>,
    content_type: Option<String>,
    security: Option<OneOrMany>,
    #[serde(rename = "htv:methodName")]
    http_method: Option<String>,
    #[serde(rename = "cov:methodName")]
    coap_method: Option<String>,
    response: Option<RawResponse>,
    op: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    content_type: Option<String>,
}
