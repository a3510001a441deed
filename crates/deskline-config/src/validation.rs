// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::DesklineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &DesklineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.desk.max_active_per_agent == 0 {
        fail("desk.max_active_per_agent must be at least 1".to_string());
    }

    let level = config.desk.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "desk.log_level `{}` must be one of {}",
            config.desk.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.media.root_dir.trim().is_empty() {
        fail("media.root_dir must not be empty".to_string());
    }

    if config.retry.max_attempts == 0 {
        fail("retry.max_attempts must be at least 1".to_string());
    }

    if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
        fail(format!(
            "retry.initial_backoff_ms ({}) must not exceed retry.max_backoff_ms ({})",
            config.retry.initial_backoff_ms, config.retry.max_backoff_ms
        ));
    }

    if config.messages.closing_text.trim().is_empty() {
        fail("messages.closing_text must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
