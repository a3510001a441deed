// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Deskline integration tests.
//!
//! Provides mock collaborators and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockBlobStore`] - Blob store with recorded deletions and injectable failures
//! - [`TestHarness`] - A [`Desk`](deskline_engine::Desk) over an in-memory or temp SQLite store

pub mod harness;
pub mod mock_blob;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_blob::MockBlobStore;
