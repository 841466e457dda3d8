//! Settings for a viewtree application.
//!
//! [`Settings`] holds the handful of knobs the tree, the routing layer and the
//! server read at startup. Every field has a sensible default, so an empty
//! configuration file is valid. Settings are passed around explicitly; there
//! is no process-wide instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The complete set of application settings.
///
/// # Examples
///
/// ```
/// use viewtree_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.max_redirect_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled. Selects pretty log output and verbose
    /// error pages.
    pub debug: bool,
    /// The tracing filter directive (e.g. `"info"` or `"viewtree_tree=debug"`).
    pub log_level: String,
    /// The `host:port` the development server binds to.
    pub bind_address: String,
    /// How many redirect hops are followed before giving up.
    pub max_redirect_depth: usize,
    /// Absolute origin used when rendering sitemap locations.
    pub site_url: String,
    /// Application-specific settings.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            bind_address: "127.0.0.1:8000".to_string(),
            max_redirect_depth: 32,
            site_url: "http://localhost:8000".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns an application-specific setting, if present.
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key)
    }

    /// Returns `site_url` without a trailing slash.
    pub fn site_origin(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bind_address, "127.0.0.1:8000");
        assert_eq!(settings.max_redirect_depth, 32);
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn test_site_origin_trims_slash() {
        let settings = Settings {
            site_url: "https://example.com/".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.site_origin(), "https://example.com");
    }

    #[test]
    fn test_extra_lookup() {
        let mut settings = Settings::default();
        settings
            .extra
            .insert("catalog".to_string(), serde_json::json!("books"));
        assert_eq!(settings.extra("catalog"), Some(&serde_json::json!("books")));
        assert!(settings.extra("missing").is_none());
    }

    #[test]
    fn test_serde_round_trip_keeps_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"debug": false}"#).unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.max_redirect_depth, 32);
    }
}
