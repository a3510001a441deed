// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the coordination engine is written against.
//!
//! All adapters extend the [`Adapter`] base trait and use `#[async_trait]`
//! so they can be held as trait objects.

pub mod adapter;
pub mod blob;
pub mod store;

pub use adapter::Adapter;
pub use blob::{BlobDeletion, BlobStore};
pub use store::{ChangeFeed, ConversationStore};
