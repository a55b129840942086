//! Error types.

use thiserror::Error;

use crate::td::AffordanceKind;

/// Problems found while loading a Thing Description.
///
/// These are reported once, at load time, rather than deep inside a binding.
#[derive(Debug, Error)]
pub enum TdError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("malformed thing description: {0}")]
    Malformed(#[from] serde_json::Error),

    /// An affordance declares no forms.
    #[error("{kind} '{name}' declares no forms")]
    NoForms {
        /// Kind of the offending affordance.
        kind: AffordanceKind,
        /// Name of the offending affordance.
        name: String,
    },

    /// A form has no `href`.
    #[error("{kind} '{name}' form #{index} has no href")]
    MissingHref {
        /// Kind of the offending affordance.
        kind: AffordanceKind,
        /// Name of the offending affordance.
        name: String,
        /// Position of the form.
        index: usize,
    },

    /// A form references a security scheme that is not declared.
    #[error("{kind} '{name}' form #{index} references undeclared security scheme '{scheme}'")]
    UndeclaredSecurity {
        /// Kind of the offending affordance.
        kind: AffordanceKind,
        /// Name of the offending affordance.
        name: String,
        /// Position of the form.
        index: usize,
        /// The missing scheme name.
        scheme: String,
    },

    /// No affordance with the requested name exists.
    #[error("no {kind} named '{name}'")]
    UnknownAffordance {
        /// Requested kind.
        kind: AffordanceKind,
        /// Requested name.
        name: String,
    },

    /// The configured form index is past the end of the form list.
    #[error("form index {index} out of range ({len} forms)")]
    FormIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of forms available.
        len: usize,
    },
}

/// A form href that is not a valid URI Template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template failed to parse or expand.
    #[error("invalid URI template '{template}': {reason}")]
    Invalid {
        /// The offending template.
        template: String,
        /// Why it was rejected.
        reason: String,
    },
}
