// SPDX-FileCopyrightText: 2026 Deskline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./deskline.toml` > `~/.config/deskline/deskline.toml` >
//! `/etc/deskline/deskline.toml`, all overridden by `DESKLINE_*` variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DesklineConfig;

/// Config sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &["desk", "storage", "media", "retry", "messages"];

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/deskline/deskline.toml";

/// Local (working directory) config file name.
pub const LOCAL_CONFIG_FILE: &str = "deskline.toml";

/// Per-user config file, when the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("deskline").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/deskline/deskline.toml`
/// 3. `~/.config/deskline/deskline.toml`
/// 4. `./deskline.toml`
/// 5. `DESKLINE_*` environment variables
pub fn load_config() -> Result<DesklineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DesklineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DesklineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DesklineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DesklineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DesklineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Maps `DESKLINE_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `DESKLINE_DESK_MAX_ACTIVE_PER_AGENT` maps to `desk.max_active_per_agent`.
fn env_provider() -> Env {
    Env::prefixed("DESKLINE_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
