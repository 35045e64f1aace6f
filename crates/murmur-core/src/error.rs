//! Errors reported by the hosted backend.
//!
//! Every data-access or realtime call either succeeds or fails with a
//! [`ServiceError`] carrying a reason. Constraint violations keep the
//! backend's SQLSTATE code so callers can recognise expected conflicts.

use thiserror::Error;

use crate::topic::{Relation, SubscriptionId};

/// SQLSTATE code for a unique-constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Error returned by a backend capability.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request did not reach the backend or the response was lost.
    #[error("network error: {0}")]
    Network(String),

    /// Point lookup found no row.
    #[error("{relation}: no row for {key}")]
    NotFound {
        /// Relation that was queried.
        relation: Relation,
        /// Key that was looked up.
        key: String,
    },

    /// A database constraint rejected the write.
    #[error("constraint violation {code}: {message}")]
    Constraint {
        /// SQLSTATE code.
        code: String,
        /// Backend message.
        message: String,
    },

    /// The backend refused the request (policy, validation).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The subscription is not live.
    #[error("subscription {0} is closed")]
    Closed(SubscriptionId),
}

impl ServiceError {
    /// Backend error code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Constraint { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns true for duplicate-key conflicts (code `23505`).
    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION)
    }

    /// Returns true if the same request may succeed later.
    ///
    /// Only network failures are transient. Constraint and policy failures
    /// will repeat for the same input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
