//! # viewtree-tree
//!
//! Hierarchical, introspectable URL view trees.
//!
//! An application declares its URL space once at startup as a tree of
//! [`DefinitionNode`]s: an index, static children with fixed names, and at
//! most one dynamic child per node whose segment is decoded by a
//! [`Converter`]. Each declaration registers its derived path pattern with the
//! routing layer. Per request, the matched definition is instantiated as a
//! [`RequestNode`] bound to the request's raw values, which can be walked up
//! (ancestors, breadcrumbs) and down (children, sitemaps), and turned back
//! into URLs.
//!
//! ## Modules
//!
//! - [`value`] - type-erased parameter values and ordered parameter maps
//! - [`converter`] - converters and iterables for dynamic segments
//! - [`definition`] - the startup-time definition tree
//! - [`registration`] - declaring nodes and registering their routes
//! - [`params`] - parameter resolution and failure handlers
//! - [`node`] - the per-request tree
//! - [`redirect`] - redirect nodes and target resolution
//! - [`context`] - the view context passed to handlers
//! - [`decorators`] - composable handler wrappers
//! - [`pattern`] - path pattern derivation
//! - [`sitemap`] - breadcrumbs and sitemaps
//!
//! # Examples
//!
//! ```
//! use viewtree_http::{HttpResponse, URLConf};
//! use viewtree_tree::prelude::*;
//!
//! let mut urls = URLConf::new();
//! let index = declare_index(&mut urls, Index::new(view_fn(|_ctx| async {
//!     HttpResponse::ok("home")
//! })))
//! .unwrap();
//! let users = index
//!     .declare_static_child(&mut urls, StaticChild::new("users", view_fn(|_ctx| async {
//!         HttpResponse::ok("users")
//!     })))
//!     .unwrap();
//! let user = users
//!     .declare_dynamic_child(
//!         &mut urls,
//!         DynamicChild::new("user_id", view_fn(|_ctx| async { HttpResponse::ok("user") }))
//!             .converter(Converter::parse::<i64>())
//!             .iterable(Iterable::values([1_i64, 2, 3])),
//!     )
//!     .unwrap();
//!
//! assert_eq!(user.pattern(), "/users/<user_id>");
//! assert_eq!(urls.len(), 3);
//! ```

pub mod config;
pub mod context;
pub mod converter;
pub mod decorators;
pub mod definition;
pub mod node;
pub mod params;
pub mod pattern;
pub mod redirect;
pub mod registration;
pub mod sitemap;
pub mod value;

pub use config::TreeConfig;
pub use context::{view_fn, ViewContext, ViewFn};
pub use converter::{Converter, Iterable, ParamArg, ParamArgs};
pub use decorators::{compose, decorator, Decorator};
pub use definition::DefinitionNode;
pub use node::RequestNode;
pub use params::FailureHandler;
pub use redirect::{redirect_fn, RedirectFn, TargetPart};
pub use registration::{declare_index, DynamicChild, Index, RedirectChild, StaticChild};
pub use sitemap::{breadcrumbs, render_sitemap_xml, sitemap, Crumb, Sitemap, SitemapEntry};
pub use value::{ParamMap, ParamValue, RawValues, TypedValues, UrlPart};

/// Everything needed to declare and walk a view tree.
pub mod prelude {
    pub use crate::context::{view_fn, ViewContext, ViewFn};
    pub use crate::converter::{Converter, Iterable, ParamArgs};
    pub use crate::decorators::{decorator, Decorator};
    pub use crate::definition::DefinitionNode;
    pub use crate::node::RequestNode;
    pub use crate::redirect::{redirect_fn, TargetPart};
    pub use crate::registration::{declare_index, DynamicChild, Index, RedirectChild, StaticChild};
    pub use crate::sitemap::{breadcrumbs, sitemap};
    pub use crate::value::{ParamValue, RawValues, TypedValues, UrlPart};
    pub use crate::TreeConfig;
}
