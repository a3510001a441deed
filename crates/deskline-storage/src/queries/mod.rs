// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for conversation documents and message logs.

pub mod conversations;
pub mod messages;
