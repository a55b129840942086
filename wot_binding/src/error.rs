//! Error types.

use thiserror::Error;
use wot_binding_core::{error::TdError, interaction::Operation, td::AffordanceKind};

use crate::session_manager::SessionId;

/// Problem preparing an interaction. Nothing is sent when this is returned.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The affordance or form does not exist.
    #[error(transparent)]
    Td(#[from] TdError),

    /// The operation does not apply to this kind of affordance.
    #[error("{operation} does not apply to {kind} affordances")]
    OperationMismatch {
        /// Requested operation.
        operation: Operation,
        /// Kind of the addressed affordance.
        kind: AffordanceKind,
    },

    /// A subscription operation was passed where a one-shot one is needed.
    #[error("{0} is a subscription, not a one-shot operation")]
    NotOneShot(Operation),

    /// A one-shot operation was passed where a subscription is needed.
    #[error("{0} is a one-shot operation, not a subscription")]
    NotSubscription(Operation),
}

/// Problem managing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No live session has this id.
    #[error("unknown {0}")]
    Unknown(SessionId),
}
