// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskline support desk.
//!
//! This crate provides the domain types, the error taxonomy, and the
//! collaborator traits (document store, change feed, blob store) that the
//! coordination engine is written against. Storage backends implement the
//! traits defined here.

pub mod error;
pub mod feed;
pub mod traits;
pub mod types;
pub mod update;

// Re-export key items at crate root for ergonomic imports.
pub use error::DesklineError;
pub use feed::{ChangeHub, Subscription};
pub use types::{
    AdapterType, AgentContext, AgentId, BlobRef, ClosingFeedback, Conversation, ConversationId,
    ConversationStatus, HealthStatus, IntakeFields, LastMessageSummary, MediaKind, Message,
    MessageId, MessagePayload, NewMessage, Notice, Sender,
};
pub use update::{ConversationPatch, ConversationQuery, Precondition, UpdateOutcome};

pub use traits::{Adapter, BlobDeletion, BlobStore, ChangeFeed, ConversationStore};
