//! Tree-wide configuration.

use viewtree_core::Settings;

/// Configuration shared by every node of one definition tree.
///
/// Captured at index declaration and handed down to each descendant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// How many redirect hops a single resolution may follow before failing
    /// with [`RedirectLoop`](viewtree_core::ViewTreeError::RedirectLoop).
    pub max_redirect_depth: usize,
    /// Include error details in responses produced for unhandled failures.
    pub debug: bool,
}

impl TreeConfig {
    /// Builds the tree configuration from application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_redirect_depth: settings.max_redirect_depth,
            debug: settings.debug,
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_settings() {
        let config = TreeConfig::default();
        assert_eq!(config.max_redirect_depth, 32);
        assert!(config.debug);
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            max_redirect_depth: 4,
            debug: false,
            ..Settings::default()
        };
        let config = TreeConfig::from_settings(&settings);
        assert_eq!(config.max_redirect_depth, 4);
        assert!(!config.debug);
    }
}
