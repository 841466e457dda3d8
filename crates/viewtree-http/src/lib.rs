//! # viewtree-http
//!
//! The routing layer viewtree builds on: request and response types, path
//! patterns with typed placeholders, a route table with forward and reverse
//! resolution, and the axum server glue.
//!
//! ## Modules
//!
//! - [`request`] - [`HttpRequest`] and its builder
//! - [`response`] - [`HttpResponse`] and redirect helpers
//! - [`urls`] - patterns, converters, the route table and reverse lookups
//! - [`server`] - [`App`](server::App), the axum integration

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod request;
pub mod response;
pub mod server;
pub mod urls;

pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{
    build_redirect_response, HttpResponse, HttpResponsePermanentRedirect, HttpResponseRedirect,
    JsonResponse,
};
pub use urls::conf::{ResolverMatch, RouteOptions, URLConf};

/// A boxed, sendable future resolving to a response.
pub type BoxFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A route handler: an async function from request to response, shareable
/// across threads.
pub type RouteHandler = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;
