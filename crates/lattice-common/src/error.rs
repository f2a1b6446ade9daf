//! Error types for provider-side reconciliation
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant names the target resource (security group, bucket) and,
//! for provider failures, the operation that failed.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for reconciliation operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed desired configuration, rejected before any provider call
    #[error("validation error for {target}: {message}")]
    Validation {
        /// Resource whose configuration is invalid
        target: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "ingress[0].ipBlock.cidr")
        field: Option<String>,
    },

    /// A provider call failed
    #[error("provider error [{operation}] for {target}: {message}")]
    Provider {
        /// Resource the call was made against
        target: String,
        /// Provider operation (e.g., "AuthorizeSecurityGroup", "InitiateBucketWorm")
        operation: String,
        /// Message reported by the provider
        message: String,
        /// Whether the next reconciliation pass may succeed
        retryable: bool,
    },

    /// The provider returned a value the core cannot represent
    #[error("unexpected provider state for {target}: {message}")]
    UnexpectedState {
        /// Resource whose state could not be interpreted
        target: String,
        /// Description of the unexpected value
        message: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    ///
    /// For simple validation errors without target context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            target: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with target context
    pub fn validation_for(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            target: target.into(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with target context and field path
    pub fn validation_for_field(
        target: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            target: target.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a transient provider error (rate limit, network)
    pub fn provider_for(
        target: impl Into<String>,
        operation: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Provider {
            target: target.into(),
            operation: operation.into(),
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a non-retryable provider error
    ///
    /// Used when the provider forbids the requested transition, e.g. shrinking
    /// a locked retention policy.
    pub fn provider_permanent(
        target: impl Into<String>,
        operation: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Provider {
            target: target.into(),
            operation: operation.into(),
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create an unexpected-state error
    pub fn unexpected_state(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UnexpectedState {
            target: target.into(),
            message: msg.into(),
        }
    }

    /// Attach a target to an error created without one
    ///
    /// Errors raised deep in parsing helpers don't know which resource they
    /// belong to; callers fill it in on the way out. An existing target is kept.
    pub fn with_target(self, new_target: &str) -> Self {
        match self {
            Error::Validation {
                target,
                message,
                field,
            } if target == UNKNOWN_CONTEXT => Error::Validation {
                target: new_target.to_string(),
                message,
                field,
            },
            other => other,
        }
    }

    /// Check if this error is retryable
    ///
    /// Validation errors are not retryable (require config fix).
    /// Provider errors carry their own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Validation { .. } => false,
            Error::Provider { retryable, .. } => *retryable,
            Error::UnexpectedState { .. } => true,
        }
    }

    /// Get the target resource this error is associated with
    pub fn target(&self) -> &str {
        match self {
            Error::Validation { target, .. } => target,
            Error::Provider { target, .. } => target,
            Error::UnexpectedState { target, .. } => target,
        }
    }

    /// Get the provider operation if this is a provider error
    pub fn operation(&self) -> Option<&str> {
        match self {
            Error::Provider { operation, .. } => Some(operation),
            _ => None,
        }
    }
}
