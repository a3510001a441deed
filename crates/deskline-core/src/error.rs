// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskline coordination engine.
//!
//! Lost claim races, capacity rejections, and duplicate share grants are
//! expected outcomes and are reported through tagged result enums
//! (`ClaimOutcome`, `ShareOutcome`, ...). The variants here cover
//! everything that is a definite failure for the caller.

use thiserror::Error;

use crate::types::ConversationStatus;

/// The primary error type used across collaborator traits and core operations.
#[derive(Debug, Error)]
pub enum DesklineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    ///
    /// Treated as transient: idempotent operations may be retried with backoff.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The referenced conversation, message, or blob does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conditional write lost against a concurrent writer.
    #[error("precondition failed for conversation {id}")]
    PreconditionFailed { id: String },

    /// The agent is neither owner nor grantee of an active conversation.
    #[error("agent {agent} may not write to conversation {conversation}")]
    AccessDenied { agent: String, conversation: String },

    /// The operation is reserved to the conversation's current owner.
    #[error("agent {agent} does not own conversation {conversation}")]
    NotOwner { agent: String, conversation: String },

    /// The conversation is closed; no further appends or edits are accepted.
    #[error("conversation {id} is closed")]
    ConversationClosed { id: String },

    /// A status change outside the allowed lifecycle was requested.
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },

    /// Caller-supplied input failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DesklineError {
    /// Wraps any storage-layer error.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Shorthand for a missing conversation.
    pub fn conversation_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: "conversation",
            id: id.to_string(),
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only transport-level failures qualify. Authorization and lifecycle
    /// errors will fail identically on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Timeout { .. })
    }

    /// Text suitable for showing to the agent.
    pub fn user_message(&self) -> String {
        match self {
            Self::AccessDenied { .. } => {
                "You do not have access to this conversation.".to_string()
            }
            Self::NotOwner { .. } => {
                "Only the agent handling this conversation can do that.".to_string()
            }
            Self::ConversationClosed { .. } => "This conversation has already been closed.".to_string(),
            Self::NotFound { entity, .. } => format!("The {entity} no longer exists."),
            Self::InvalidTransition { from, to } => {
                format!("A conversation cannot move from {from} to {to}.")
            }
            Self::Validation(msg) => msg.clone(),
            Self::PreconditionFailed { .. } => {
                "This conversation changed in the meantime. Refresh and try again.".to_string()
            }
            Self::Storage { .. } | Self::Timeout { .. } | Self::Config(_) | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}
