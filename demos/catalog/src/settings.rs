//! Catalog settings.
//!
//! Loaded from `catalog.toml` when present, with `VIEWTREE_*` environment
//! overrides applied on top. Without a file the defaults are used.

use std::path::Path;

use viewtree::core::settings_loader::{apply_env_overrides, from_toml_file_with_env};
use viewtree::core::Settings;

/// The title shown on the index page when `extra.catalog_title` is unset.
pub const DEFAULT_TITLE: &str = "Catalog";

/// Loads the catalog settings from `path`, falling back to defaults if the
/// file does not exist.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if path.exists() {
        tracing::info!(path = %path.display(), "loading settings");
        return Ok(from_toml_file_with_env(path)?);
    }
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Returns the catalog title configured under `extra.catalog_title`.
pub fn catalog_title(settings: &Settings) -> String {
    settings
        .extra("catalog_title")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}
