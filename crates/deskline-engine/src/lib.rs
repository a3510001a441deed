// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle and claim coordination.
//!
//! The [`Desk`] is the single entry point the presentation layer talks to.
//! Every operation takes an explicit [`AgentContext`](deskline_core::AgentContext)
//! and is written against the collaborator traits from `deskline-core`, so
//! the same engine runs over SQLite, the in-memory store, or test doubles.
//!
//! Expected coordination outcomes (lost races, capacity limits, duplicate
//! grants, repeated closes) come back as tagged enums. Errors are reserved
//! for definite failures.

pub mod claim;
pub mod desk;
pub mod lifecycle;
pub mod log;
pub mod media;
pub mod retry;
pub mod view;
mod welcome;

pub use claim::{ClaimOutcome, ShareOutcome};
pub use desk::{Desk, DeskSettings, DocumentStore};
pub use lifecycle::CloseOutcome;
pub use media::PurgeReport;
pub use retry::{RetryPolicy, retry_idempotent};
pub use view::{QueueView, QueueViewWatcher, ViewFilter};
