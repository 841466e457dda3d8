//! # viewtree
//!
//! Hierarchical, introspectable URL view trees for Rust web applications.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `viewtree` to get everything, or depend on individual
//! crates for finer-grained control.

/// Core types, settings, logging, and error types.
pub use viewtree_core as core;

/// HTTP layer: Request, Response, URL routing, and the server.
pub use viewtree_http as http;

/// The view tree: definition nodes, request nodes, redirects, sitemaps.
#[cfg(feature = "tree")]
pub use viewtree_tree as tree;

/// Testing utilities.
#[cfg(feature = "testing")]
pub use viewtree_test as test;

// Third-party re-exports
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tower_http;
pub use tracing;
pub use tracing_subscriber;

/// Convenience prelude that imports the most commonly used types.
pub mod prelude {
    pub use viewtree_core::{ConversionError, ConversionErrorKind, Settings, ViewTreeError, ViewTreeResult};
    pub use viewtree_http::server::App;
    pub use viewtree_http::{HttpRequest, HttpResponse, HttpResponseRedirect, RouteOptions, URLConf};

    #[cfg(feature = "tree")]
    pub use viewtree_tree::prelude::*;
}
