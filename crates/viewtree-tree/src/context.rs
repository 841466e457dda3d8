//! The context handed to view handlers.
//!
//! Instead of a request-global slot holding "the current node", each handler
//! receives a [`ViewContext`] owning both the request and the [`RequestNode`]
//! the request was routed to.

use std::future::Future;
use std::sync::Arc;

use viewtree_core::{ViewTreeError, ViewTreeResult};
use viewtree_http::{BoxFuture, HttpRequest, HttpResponse, URLConf};

use crate::node::RequestNode;
use crate::value::ParamValue;

/// A view handler: an async function from context to response.
pub type ViewFn = Arc<dyn Fn(ViewContext) -> BoxFuture + Send + Sync>;

/// Wraps an async closure as a [`ViewFn`].
///
/// # Examples
///
/// ```
/// use viewtree_http::HttpResponse;
/// use viewtree_tree::view_fn;
///
/// let view = view_fn(|ctx| async move {
///     HttpResponse::ok(format!("you are at {}", ctx.node()))
/// });
/// ```
pub fn view_fn<F, Fut>(f: F) -> ViewFn
where
    F: Fn(ViewContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |ctx: ViewContext| -> BoxFuture { Box::pin(f(ctx)) })
}

/// A request together with the node it was routed to.
#[derive(Debug)]
pub struct ViewContext {
    request: HttpRequest,
    node: RequestNode,
}

impl ViewContext {
    /// Creates a context.
    pub const fn new(request: HttpRequest, node: RequestNode) -> Self {
        Self { request, node }
    }

    /// Returns the request.
    pub const fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Returns the request mutably, for decorators that annotate it.
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    /// Returns the node the request was routed to.
    pub const fn node(&self) -> &RequestNode {
        &self.node
    }

    /// Splits the context into its request and node.
    pub fn into_parts(self) -> (HttpRequest, RequestNode) {
        (self.request, self.node)
    }

    /// Returns the typed value of the parameter `name`.
    pub fn param(&self, name: &str) -> ViewTreeResult<&ParamValue> {
        self.node.param(name)
    }

    /// Returns the route table the request was resolved against.
    pub fn urls(&self) -> ViewTreeResult<&URLConf> {
        self.request
            .urlconf()
            .map(AsRef::as_ref)
            .ok_or_else(|| ViewTreeError::ImproperlyConfigured("request carries no route table".into()))
    }

    /// Returns the URL of `node` in the request's route table.
    pub fn url_for(&self, node: &RequestNode) -> ViewTreeResult<String> {
        node.url(self.urls()?)
    }
}
