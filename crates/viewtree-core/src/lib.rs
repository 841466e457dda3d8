//! # viewtree-core
//!
//! Core types shared by every viewtree crate. This crate has no HTTP or
//! routing dependencies and provides the foundation for the rest of the
//! workspace.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`settings`] - Runtime configuration with sensible defaults
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{ConversionError, ConversionErrorKind, ViewTreeError, ViewTreeResult};
pub use settings::Settings;
