//! A fully prepared interaction, ready to hand to a binding.

use core::fmt;

use serde_json::{Map, Value};

use crate::{
    codec::Payload,
    security::Credential,
    td::{AffordanceKind, Form},
    uri_template,
};

/// The operation performed on an affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `readproperty`.
    ReadProperty,
    /// `writeproperty`.
    WriteProperty,
    /// `observeproperty`.
    ObserveProperty,
    /// `invokeaction`.
    InvokeAction,
    /// `subscribeevent`.
    SubscribeEvent,
}

impl Operation {
    /// Whether this is a single request/response exchange.
    #[must_use]
    pub const fn is_one_shot(self) -> bool {
        matches!(
            self,
            Self::ReadProperty | Self::WriteProperty | Self::InvokeAction
        )
    }

    /// Whether the operation sends a request body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::WriteProperty | Self::InvokeAction)
    }

    /// The affordance kind this operation applies to.
    #[must_use]
    pub const fn affordance_kind(self) -> AffordanceKind {
        match self {
            Self::ReadProperty | Self::WriteProperty | Self::ObserveProperty => {
                AffordanceKind::Property
            }
            Self::InvokeAction => AffordanceKind::Action,
            Self::SubscribeEvent => AffordanceKind::Event,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ReadProperty => "readproperty",
            Self::WriteProperty => "writeproperty",
            Self::ObserveProperty => "observeproperty",
            Self::InvokeAction => "invokeaction",
            Self::SubscribeEvent => "subscribeevent",
        })
    }
}

/// Everything a binding needs for one interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    /// What is being done.
    pub operation: Operation,
    /// The selected form.
    pub form: Form,
    /// URI Template variables.
    pub uri_variables: Map<String, Value>,
    /// Request body for writes and invocations.
    pub body: Option<Payload>,
    /// Credential for the form's security scheme.
    pub credential: Option<Credential>,
    /// Schema inbound payloads are checked against.
    pub output_schema: Option<Value>,
}

impl Interaction {
    /// A bare interaction with no variables, body, credential or schema.
    #[must_use]
    pub fn new(operation: Operation, form: Form) -> Self {
        Self {
            operation,
            form,
            uri_variables: Map::new(),
            body: None,
            credential: None,
            output_schema: None,
        }
    }

    /// The form's href with URI Template variables expanded.
    #[must_use]
    pub fn target(&self) -> String {
        uri_template::resolve_href(&self.form.href, &self.uri_variables)
    }
}
