//! Blog configuration.
//!
//! The blog reads a small, pre-populated configuration: how titles are split
//! into series and part names, how many photo markers a post map may show,
//! and which order the content provider lists posts in. Site and owner
//! details are only read by the feed projection.
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! subtitle_separator = ":"          # "Series: Part" title delimiter
//! max_photo_markers_on_map = 100    # Cap on photo coordinates per post map
//! provider_post_sort = "newest-first"  # or "oldest-first"
//!
//! [site]
//! domain = "example.com"
//! title = "Example Photo Blog"
//! subtitle = "Pictures and stories"
//! description = "Trips, mostly on two wheels"
//! url = "https://www.example.com"
//! post_alias = "Story"
//!
//! [owner]
//! name = "Jane Doe"
//! email = "jane@example.com"
//! urls = ["https://example.org/jane"]
//! ```
//!
//! User files are sparse: they are merged over the stock defaults (see
//! [`merge_toml`]) and unknown keys are rejected to catch typos early.
//!
//! Data providers are not part of this file. They are bound once at startup
//! through [`Providers`](crate::provider::Providers).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Separator between the series and part slugs of a compound post key.
///
/// Distinct from [`BlogConfig::subtitle_separator`], which splits the
/// displayed title.
pub const SERIES_KEY_SEPARATOR: char = '/';

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Order in which the content provider lists posts.
///
/// The blog always stores posts newest-first. Oldest-first providers have
/// their posts inserted at the head of the sequence instead of the tail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostSort {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Blog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    /// Characters between a post title and its subtitle, e.g. `"Series: Part"`.
    pub subtitle_separator: String,
    /// Maximum number of photo coordinates included in a post's map summary.
    pub max_photo_markers_on_map: usize,
    /// How the post provider orders the posts it supplies.
    pub provider_post_sort: PostSort,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<SiteConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerConfig>,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            subtitle_separator: ":".to_string(),
            max_photo_markers_on_map: 100,
            provider_post_sort: PostSort::NewestFirst,
            site: None,
            owner: None,
        }
    }
}

impl BlogConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subtitle_separator.trim().is_empty() {
            return Err(ConfigError::Validation(
                "subtitle_separator must not be empty".into(),
            ));
        }
        if self.subtitle_separator.contains(SERIES_KEY_SEPARATOR) {
            return Err(ConfigError::Validation(format!(
                "subtitle_separator must not contain '{SERIES_KEY_SEPARATOR}'"
            )));
        }
        if self.site.as_ref().is_some_and(|s| s.url.trim().is_empty()) {
            return Err(ConfigError::Validation("site.url must not be empty".into()));
        }
        Ok(())
    }

    /// Site and owner details, required by the feed projection.
    pub fn ensure_site(&self) -> Result<(&SiteConfig, &OwnerConfig), ConfigError> {
        match (&self.site, &self.owner) {
            (Some(site), Some(owner)) => Ok((site, owner)),
            _ => Err(ConfigError::Validation(
                "site and owner must be configured".into(),
            )),
        }
    }
}

/// Image reference used for logos and the owner portrait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Public site details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub domain: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    /// Base URL without trailing slash, e.g. `https://www.example.com`.
    pub url: String,
    /// Generic name for a post, used in category subtitles like "27 stories".
    pub post_alias: String,
    pub logo: ImageConfig,
    pub company_logo: ImageConfig,
}

/// Blog owner, credited as feed author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OwnerConfig {
    pub name: String,
    pub email: String,
    pub image: ImageConfig,
    pub urls: Vec<String>,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BlogConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BlogConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BlogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, falling back to stock defaults when the
/// file is absent.
pub fn load_config(path: &Path) -> Result<BlogConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Blog Configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Characters between a post title and its subtitle. Posts titled
# "Brother Ride: Day 10" and "Brother Ride: Day 11" become parts of the
# "brother-ride" series. Must not contain "/".
subtitle_separator = ":"

# Maximum number of photo coordinates included in a post's map summary.
max_photo_markers_on_map = 100

# Order in which the content provider lists posts: "newest-first" or
# "oldest-first". The blog always presents posts newest-first.
provider_post_sort = "newest-first"

# ---------------------------------------------------------------------------
# Site and owner (only needed for feeds)
# ---------------------------------------------------------------------------
# [site]
# domain = "example.com"
# title = "Example Photo Blog"
# subtitle = "Pictures and stories"
# description = "Trips, mostly on two wheels"
# url = "https://www.example.com"
# post_alias = "Story"
#
# [owner]
# name = "Jane Doe"
# email = "jane@example.com"
# urls = ["https://example.org/jane"]
"##
}
