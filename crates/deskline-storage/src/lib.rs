// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence backends for Deskline.
//!
//! Provides a WAL-mode SQLite document store with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`, an in-memory store
//! with the same semantics, and a filesystem blob store for media.

pub mod adapter;
pub mod blob;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use blob::FsBlobStore;
pub use database::Database;
pub use memory::MemoryStore;
