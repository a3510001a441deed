// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Deskline support desk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Deskline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DesklineConfig {
    /// Desk identity and admission settings.
    #[serde(default)]
    pub desk: DeskConfig,

    /// Document store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Media blob store settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Backoff policy for idempotent operations.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Texts of system-authored log entries and summaries.
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Desk identity and admission control.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskConfig {
    /// Display name of the desk.
    #[serde(default = "default_desk_name")]
    pub name: String,

    /// Maximum number of concurrently active conversations one agent may own.
    #[serde(default = "default_max_active_per_agent")]
    pub max_active_per_agent: usize,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            name: default_desk_name(),
            max_active_per_agent: default_max_active_per_agent(),
            log_level: default_log_level(),
        }
    }
}

fn default_desk_name() -> String {
    "deskline".to_string()
}

fn default_max_active_per_agent() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskline").join("deskline.db"))
        .unwrap_or_else(|| "deskline.db".into())
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Filesystem blob store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory under which media blob references resolve.
    #[serde(default = "default_media_root")]
    pub root_dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root_dir: default_media_root(),
        }
    }
}

fn default_media_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("deskline").join("media"))
        .unwrap_or_else(|| "media".into())
        .display()
        .to_string()
}

/// Exponential backoff for retryable failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt, doubled on each further attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on a single delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2000
}

/// Texts used for system-authored log entries and conversation summaries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// Greeting line of the welcome message. `{name}` is replaced by the customer name.
    #[serde(default = "default_welcome_greeting")]
    pub welcome_greeting: String,

    /// Summary shown in the active list right after a claim.
    #[serde(default = "default_claim_summary")]
    pub claim_summary: String,

    /// Warning sent before closure so customers keep their media.
    #[serde(default = "default_closing_warning_text")]
    pub closing_warning_text: String,

    /// Final log entry appended on closure.
    #[serde(default = "default_closing_text")]
    pub closing_text: String,

    /// Summary for image and video attachments.
    #[serde(default = "default_media_summary")]
    pub media_summary: String,

    /// Summary for audio attachments.
    #[serde(default = "default_audio_summary")]
    pub audio_summary: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome_greeting: default_welcome_greeting(),
            claim_summary: default_claim_summary(),
            closing_warning_text: default_closing_warning_text(),
            closing_text: default_closing_text(),
            media_summary: default_media_summary(),
            audio_summary: default_audio_summary(),
        }
    }
}

fn default_welcome_greeting() -> String {
    "Hi {name}, your support session is starting.".to_string()
}

fn default_claim_summary() -> String {
    "Support session started (details sent)".to_string()
}

fn default_closing_warning_text() -> String {
    "This session will be closed soon. Please make sure you have downloaded any media you need to your device.".to_string()
}

fn default_closing_text() -> String {
    "Session closed by our agent.".to_string()
}

fn default_media_summary() -> String {
    "Media sent by support".to_string()
}

fn default_audio_summary() -> String {
    "Audio sent by support".to_string()
}
