//! Declaring the tree.
//!
//! Each declaration validates the tree shape, derives the node's path
//! pattern and endpoint name, composes its handler with the inherited
//! decorator chain, registers the route with the [`URLConf`] and only then
//! attaches the node to its parent. A failed declaration leaves both the tree
//! and the route table unchanged, apart from a redirect's first route when its
//! second one fails.
//!
//! # Examples
//!
//! ```
//! use viewtree_core::ConversionErrorKind;
//! use viewtree_http::{HttpResponse, URLConf};
//! use viewtree_tree::prelude::*;
//!
//! let mut urls = URLConf::new();
//! let index = declare_index(&mut urls, Index::new(view_fn(|_ctx| async {
//!     HttpResponse::ok("home")
//! })))
//! .unwrap();
//! let books = index
//!     .declare_static_child(&mut urls, StaticChild::new("books", view_fn(|_ctx| async {
//!         HttpResponse::ok("books")
//!     })))
//!     .unwrap();
//! books
//!     .declare_dynamic_child(
//!         &mut urls,
//!         DynamicChild::new("book_id", view_fn(|ctx| async move {
//!             HttpResponse::ok(format!("book {}", ctx.node()))
//!         }))
//!         .converter(Converter::parse::<u32>()),
//!     )
//!     .unwrap();
//! books
//!     .declare_failure_handler([ConversionErrorKind::Invalid], |_err, raw| {
//!         HttpResponse::not_found(format!("no book {raw}"))
//!     })
//!     .unwrap();
//! index
//!     .declare_redirect(
//!         &mut urls,
//!         RedirectChild::new("latest", redirect_fn(|_raw| Ok(vec!["books".into(), "3".into()]))),
//!     )
//!     .unwrap();
//! assert!(urls.find("latest:subtree").is_some());
//! ```

use std::sync::{Arc, RwLock};

use viewtree_core::{ConversionError, ConversionErrorKind, ViewTreeError, ViewTreeResult};
use viewtree_http::urls::converters::{PathConverter, PathSegmentConverter};
use viewtree_http::urls::pattern::is_identifier;
use viewtree_http::{build_redirect_response, BoxFuture, HttpRequest, HttpResponse, RouteHandler, RouteOptions, URLConf};

use crate::config::TreeConfig;
use crate::context::{ViewContext, ViewFn};
use crate::converter::{Converter, Iterable};
use crate::decorators::{compose, Decorator};
use crate::definition::{Children, DefinitionNode, RedirectSpec, Segment};
use crate::node::RequestNode;
use crate::params::FailureHandler;
use crate::pattern::{self, REDIRECT_SUBTREE_VAR};
use crate::redirect::RedirectFn;
use crate::value::RawValues;

/// Declaration of the tree root, served at `/`.
pub struct Index {
    view: ViewFn,
    decorators: Vec<Decorator>,
    options: RouteOptions,
    endpoint: Option<String>,
    config: TreeConfig,
}

impl Index {
    /// Declares the root with its view.
    pub fn new(view: ViewFn) -> Self {
        Self {
            view,
            decorators: Vec::new(),
            options: RouteOptions::default(),
            endpoint: None,
            config: TreeConfig::default(),
        }
    }

    /// Adds a decorator applied to the whole tree.
    #[must_use]
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Sets the route options.
    #[must_use]
    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the endpoint name (default `index`).
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the tree-wide configuration.
    #[must_use]
    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }
}

/// Declaration of a static child.
pub struct StaticChild {
    name: String,
    display: Option<String>,
    view: ViewFn,
    decorators: Vec<Decorator>,
    options: RouteOptions,
    endpoint: Option<String>,
}

impl StaticChild {
    /// Declares a child at the literal segment `name`.
    pub fn new(name: impl Into<String>, view: ViewFn) -> Self {
        Self {
            name: name.into(),
            display: None,
            view,
            decorators: Vec::new(),
            options: RouteOptions::default(),
            endpoint: None,
        }
    }

    /// Sets the display string (defaults to the name).
    #[must_use]
    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Adds a decorator applied to this node and its descendants.
    #[must_use]
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Sets the route options.
    #[must_use]
    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the endpoint name.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

enum VarSpec {
    Named(String),
    Inferred(Vec<String>),
}

/// Declaration of a dynamic child.
pub struct DynamicChild {
    var: VarSpec,
    converter: Converter,
    iterable: Option<Iterable>,
    view: ViewFn,
    decorators: Vec<Decorator>,
    options: RouteOptions,
    endpoint: Option<String>,
}

impl DynamicChild {
    /// Declares a child binding one segment to the parameter `var_name`.
    pub fn new(var_name: impl Into<String>, view: ViewFn) -> Self {
        Self::with_var(VarSpec::Named(var_name.into()), view)
    }

    /// Declares a child whose parameter is the one name in `handler_params`
    /// not already bound by an ancestor.
    pub fn inferred<I, S>(handler_params: I, view: ViewFn) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_var(
            VarSpec::Inferred(handler_params.into_iter().map(Into::into).collect()),
            view,
        )
    }

    fn with_var(var: VarSpec, view: ViewFn) -> Self {
        Self {
            var,
            converter: Converter::identity(),
            iterable: None,
            view,
            decorators: Vec::new(),
            options: RouteOptions::default(),
            endpoint: None,
        }
    }

    /// Sets the converter (defaults to [`Converter::identity`]).
    #[must_use]
    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = converter;
        self
    }

    /// Sets the iterable used to enumerate children.
    #[must_use]
    pub fn iterable(mut self, iterable: Iterable) -> Self {
        self.iterable = Some(iterable);
        self
    }

    /// Adds a decorator applied to this node and its descendants.
    #[must_use]
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Sets the route options.
    #[must_use]
    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the endpoint name.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Declaration of a redirect node.
pub struct RedirectChild {
    name: String,
    display: Option<String>,
    target: RedirectFn,
    permanent: bool,
    decorators: Vec<Decorator>,
    options: RouteOptions,
    endpoint: Option<String>,
}

impl RedirectChild {
    /// Declares a redirect at the literal segment `name`.
    pub fn new(name: impl Into<String>, target: RedirectFn) -> Self {
        Self {
            name: name.into(),
            display: None,
            target,
            permanent: false,
            decorators: Vec::new(),
            options: RouteOptions::default(),
            endpoint: None,
        }
    }

    /// Sets the display string (defaults to the name).
    #[must_use]
    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Answers with 301 instead of 302.
    #[must_use]
    pub const fn permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    /// Adds a decorator applied to this node.
    #[must_use]
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Sets the route options of both routes.
    #[must_use]
    pub fn options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    /// Overrides the endpoint name.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Declares the tree root and registers it at `/`.
///
/// Nodes refer to their parents weakly; the route table's handlers keep
/// every declared node alive for as long as the table exists.
pub fn declare_index(urls: &mut URLConf, index: Index) -> ViewTreeResult<Arc<DefinitionNode>> {
    let config = Arc::new(index.config);
    let node = Arc::new(DefinitionNode {
        parent: None,
        segment: Segment::Index,
        endpoint: index.endpoint.unwrap_or_else(|| "index".to_string()),
        handler: compose(&index.decorators, resolving(index.view, config.debug)),
        redirect: None,
        decorators: index.decorators,
        options: index.options,
        children: RwLock::new(Children::Leaf),
        failure_handlers: RwLock::new(Vec::new()),
        config,
    });
    register(urls, &node, node.pattern(), node.endpoint().to_string())?;
    Ok(node)
}

impl DefinitionNode {
    /// Declares a static child and registers its route.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::DuplicateName`] if a sibling already uses the
    /// name, [`ViewTreeError::ShapeConflict`] if this node owns a dynamic
    /// child or is a redirect node, and [`ViewTreeError::ImproperlyConfigured`] for an invalid name
    /// or a route the table rejects.
    pub fn declare_static_child(
        self: &Arc<Self>,
        urls: &mut URLConf,
        child: StaticChild,
    ) -> ViewTreeResult<Arc<Self>> {
        self.check_static_slot(&child.name)?;
        let endpoint = child.endpoint.unwrap_or_else(|| self.child_endpoint(&child.name));
        let decorators = self.inherit(child.decorators);
        let handler = compose(&decorators, resolving(child.view, self.config.debug));
        let node = self.new_child(
            Segment::Static {
                name: child.name,
                display: child.display,
            },
            endpoint,
            handler,
            None,
            decorators,
            child.options,
        );
        register(urls, &node, node.pattern(), node.endpoint().to_string())?;
        self.attach_static(&node);
        Ok(node)
    }

    /// Declares the dynamic child and registers its route.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::AmbiguousParameter`] if the parameter name is
    /// already bound by an ancestor or cannot be inferred uniquely,
    /// [`ViewTreeError::ShapeConflict`] if this node already has children or
    /// is a redirect node, and [`ViewTreeError::ImproperlyConfigured`] if the
    /// parameter name is not an identifier, the converter depends on an
    /// unknown parameter or the route table rejects the route.
    pub fn declare_dynamic_child(
        self: &Arc<Self>,
        urls: &mut URLConf,
        child: DynamicChild,
    ) -> ViewTreeResult<Arc<Self>> {
        let known = self.variable_names();
        let var_name = match child.var {
            VarSpec::Named(name) => name,
            VarSpec::Inferred(params) => infer_var_name(&params, &known)?,
        };
        self.check_not_redirect(&var_name)?;
        if !is_identifier(&var_name) {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "invalid parameter name '{var_name}' below '{}'",
                self.pattern()
            )));
        }
        if known.contains(&var_name) || var_name == REDIRECT_SUBTREE_VAR {
            return Err(ViewTreeError::AmbiguousParameter(format!(
                "parameter '{var_name}' is already bound on the path to '{}'",
                self.pattern()
            )));
        }
        match &*self.read_children() {
            Children::Leaf => {}
            Children::Static(_) => {
                return Err(ViewTreeError::ShapeConflict(format!(
                    "'{}' has static children and cannot take dynamic child '{var_name}'",
                    self.pattern()
                )));
            }
            Children::Dynamic(existing) => {
                return Err(ViewTreeError::ShapeConflict(format!(
                    "'{}' already has dynamic child '{}'",
                    self.pattern(),
                    existing.var_name().unwrap_or_default()
                )));
            }
        }
        if let Some(unknown) = child
            .converter
            .depends_on()
            .iter()
            .find(|name| **name != var_name && !known.contains(name))
        {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "converter for '{var_name}' depends on unknown parameter '{unknown}'"
            )));
        }

        let endpoint = child.endpoint.unwrap_or_else(|| self.child_endpoint(&var_name));
        let decorators = self.inherit(child.decorators);
        let handler = compose(&decorators, resolving(child.view, self.config.debug));
        let node = self.new_child(
            Segment::Dynamic {
                var_name,
                converter: child.converter,
                iterable: child.iterable,
            },
            endpoint,
            handler,
            None,
            decorators,
            child.options,
        );
        register(urls, &node, node.pattern(), node.endpoint().to_string())?;
        *self.write_children() = Children::Dynamic(Arc::clone(&node));
        Ok(node)
    }

    /// Declares a redirect node and registers its two routes: the node's own
    /// pattern and a catch-all below it.
    ///
    /// # Errors
    ///
    /// Same as [`declare_static_child`](Self::declare_static_child).
    pub fn declare_redirect(
        self: &Arc<Self>,
        urls: &mut URLConf,
        child: RedirectChild,
    ) -> ViewTreeResult<Arc<Self>> {
        self.check_static_slot(&child.name)?;
        let endpoint = child.endpoint.unwrap_or_else(|| self.child_endpoint(&child.name));
        let decorators = self.inherit(child.decorators);
        let handler = compose(
            &decorators,
            resolving(redirect_view(self.config.debug), self.config.debug),
        );
        let node = self.new_child(
            Segment::Static {
                name: child.name,
                display: child.display,
            },
            endpoint,
            handler,
            Some(RedirectSpec {
                target: child.target,
                permanent: child.permanent,
            }),
            decorators,
            child.options,
        );
        register(urls, &node, node.pattern(), node.endpoint().to_string())?;
        register(
            urls,
            &node,
            pattern::subtree_pattern(&node),
            pattern::subtree_endpoint(node.endpoint()),
        )?;
        self.attach_static(&node);
        Ok(node)
    }

    /// Adds a failure handler for this node's dynamic child.
    ///
    /// Handlers are consulted in declaration order; the first whose kinds
    /// include the converter error's kind produces the response.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::ImproperlyConfigured`] if this node has no
    /// dynamic child.
    pub fn declare_failure_handler<I, F>(&self, kinds: I, handler: F) -> ViewTreeResult<()>
    where
        I: IntoIterator<Item = ConversionErrorKind>,
        F: Fn(&ConversionError, &str) -> HttpResponse + Send + Sync + 'static,
    {
        let child = self.dynamic_child().ok_or_else(|| {
            ViewTreeError::ImproperlyConfigured(format!(
                "'{}' has no dynamic child to handle failures for",
                self.pattern()
            ))
        })?;
        let handler = FailureHandler::new(kinds, handler);
        tracing::debug!(
            pattern = %child.pattern(),
            kinds = ?handler.kinds(),
            "declared failure handler"
        );
        child
            .failure_handlers
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(handler);
        Ok(())
    }

    /// Children of a redirect node would be shadowed by its subtree route.
    fn check_not_redirect(&self, child: &str) -> ViewTreeResult<()> {
        if self.is_redirect() {
            return Err(ViewTreeError::ShapeConflict(format!(
                "redirect node '{}' cannot take child '{child}'",
                self.pattern()
            )));
        }
        Ok(())
    }

    fn check_static_slot(&self, name: &str) -> ViewTreeResult<()> {
        self.check_not_redirect(name)?;
        if !pattern::is_valid_static_name(name) {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "invalid static segment name '{name}'"
            )));
        }
        match &*self.read_children() {
            Children::Leaf => Ok(()),
            Children::Dynamic(existing) => Err(ViewTreeError::ShapeConflict(format!(
                "'{}' has dynamic child '{}' and cannot take static child '{name}'",
                self.pattern(),
                existing.var_name().unwrap_or_default()
            ))),
            Children::Static(children) => {
                if children.iter().any(|c| c.name() == Some(name)) {
                    Err(ViewTreeError::DuplicateName {
                        parent: self.pattern(),
                        name: name.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn attach_static(&self, node: &Arc<Self>) {
        let mut children = self.write_children();
        match &mut *children {
            Children::Static(list) => list.push(Arc::clone(node)),
            Children::Leaf | Children::Dynamic(_) => *children = Children::Static(vec![Arc::clone(node)]),
        }
    }

    /// Default endpoint of a child: the names and parameters on the path
    /// to it, joined with `.`.
    fn child_endpoint(self: &Arc<Self>, segment: &str) -> String {
        let mut path: Vec<&str> = Vec::new();
        let lineage = self.lineage();
        for node in &lineage {
            match &node.segment {
                Segment::Index => {}
                Segment::Static { name, .. } => path.push(name),
                Segment::Dynamic { var_name, .. } => path.push(var_name),
            }
        }
        path.push(segment);
        path.join(".")
    }

    fn inherit(&self, own: Vec<Decorator>) -> Vec<Decorator> {
        let mut decorators = self.decorators.clone();
        decorators.extend(own);
        decorators
    }

    fn new_child(
        self: &Arc<Self>,
        segment: Segment,
        endpoint: String,
        handler: ViewFn,
        redirect: Option<RedirectSpec>,
        decorators: Vec<Decorator>,
        options: RouteOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::downgrade(self)),
            segment,
            endpoint,
            handler,
            redirect,
            decorators,
            options,
            children: RwLock::new(Children::Leaf),
            failure_handlers: RwLock::new(Vec::new()),
            config: Arc::clone(&self.config),
        })
    }
}

fn infer_var_name(params: &[String], known: &[String]) -> ViewTreeResult<String> {
    let mut fresh: Vec<&String> = Vec::new();
    for param in params {
        if !known.contains(param) && !fresh.contains(&param) {
            fresh.push(param);
        }
    }
    match fresh.as_slice() {
        [one] => Ok((*one).clone()),
        [] => Err(ViewTreeError::AmbiguousParameter(format!(
            "handler parameters {params:?} add nothing to the bound parameters {known:?}"
        ))),
        _ => Err(ViewTreeError::AmbiguousParameter(format!(
            "handler parameters {fresh:?} are all unbound; expected exactly one"
        ))),
    }
}

fn register(
    urls: &mut URLConf,
    node: &Arc<DefinitionNode>,
    route: String,
    endpoint: String,
) -> ViewTreeResult<()> {
    urls.register_route(&route, &endpoint, route_handler(node), node.options().clone())
}

/// The callable handed to the routing layer: binds the request's raw values
/// to `definition` and runs its decorated handler.
fn route_handler(definition: &Arc<DefinitionNode>) -> RouteHandler {
    let definition = Arc::clone(definition);
    Arc::new(move |request: HttpRequest| -> BoxFuture {
        let raw = raw_values(&definition, &request);
        let node = RequestNode::new(Arc::clone(&definition), raw);
        let handler = Arc::clone(definition.handler());
        handler(ViewContext::new(request, node))
    })
}

fn raw_values(definition: &DefinitionNode, request: &HttpRequest) -> RawValues {
    let Some(resolver_match) = request.resolver_match() else {
        return RawValues::new();
    };
    definition
        .variable_names()
        .into_iter()
        .filter_map(|name| {
            let value = resolver_match.kwargs.get(&name)?.clone();
            Some((name, value))
        })
        .collect()
}

/// Resolves the node's parameters before running `view`. An intercepted
/// failure answers with the handler's fallback; an unhandled one with the
/// error's status.
fn resolving(view: ViewFn, debug: bool) -> ViewFn {
    Arc::new(move |ctx: ViewContext| -> BoxFuture {
        let view = Arc::clone(&view);
        Box::pin(async move {
            let outcome = ctx.node().resolve().map(|_| ());
            match outcome {
                Ok(()) => view(ctx).await,
                Err(ViewTreeError::ParameterIntercepted { .. }) => ctx
                    .node()
                    .take_init_failure()
                    .unwrap_or_else(|| HttpResponse::server_error("Internal Server Error")),
                Err(e) => HttpResponse::from_error(&e, debug),
            }
        })
    })
}

fn redirect_view(debug: bool) -> ViewFn {
    Arc::new(move |ctx: ViewContext| -> BoxFuture {
        Box::pin(async move {
            let permanent = ctx.node().definition().redirect().is_some_and(|r| r.permanent);
            match redirect_location(&ctx) {
                Ok(url) => build_redirect_response(&url, permanent),
                Err(e) => {
                    tracing::error!(
                        endpoint = ctx.node().definition().endpoint(),
                        error = %e,
                        "redirect resolution failed"
                    );
                    HttpResponse::from_error(&e, debug)
                }
            }
        })
    })
}

fn redirect_location(ctx: &ViewContext) -> ViewTreeResult<String> {
    let target = ctx.node().resolve_redirect()?;
    let url = ctx.url_for(&target)?;
    let rest = ctx
        .request()
        .resolver_match()
        .and_then(|m| m.kwargs.get(REDIRECT_SUBTREE_VAR));
    Ok(match rest {
        Some(rest) => join_subtree(&url, rest),
        None => url,
    })
}

fn join_subtree(url: &str, rest: &str) -> String {
    format!(
        "{}/{}",
        url.trim_end_matches('/'),
        PathSegmentConverter.to_url(rest)
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;
    use viewtree_http::server::App;

    use super::*;
    use crate::context::view_fn;
    use crate::decorators::{decorator, login_required};
    use crate::redirect::redirect_fn;

    fn ok() -> ViewFn {
        view_fn(|_ctx| async { HttpResponse::ok("ok") })
    }

    fn echo() -> ViewFn {
        view_fn(|ctx| async move { HttpResponse::ok(ctx.node().to_string()) })
    }

    async fn get(urls: &Arc<URLConf>, path: &str) -> HttpResponse {
        let request = HttpRequest::builder().method(Method::GET).path(path).build();
        App::dispatch(Arc::clone(urls), request, false).await
    }

    fn body(response: &HttpResponse) -> String {
        String::from_utf8(response.content_bytes()).unwrap()
    }

    #[test]
    fn test_duplicate_static_name() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        let err = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::DuplicateName { ref name, .. } if name == "users"));
        assert!(err.is_configuration_error());
        assert_eq!(index.static_children().len(), 1);
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_shape_conflicts() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        users
            .declare_dynamic_child(&mut urls, DynamicChild::new("user_id", ok()))
            .unwrap();

        let err = users
            .declare_static_child(&mut urls, StaticChild::new("new", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));
        let err = users
            .declare_dynamic_child(&mut urls, DynamicChild::new("other_id", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));
        let err = users
            .declare_redirect(&mut urls, RedirectChild::new("me", redirect_fn(|_raw| Ok(Vec::new()))))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));

        let err = index
            .declare_dynamic_child(&mut urls, DynamicChild::new("slug", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));
    }

    #[tokio::test]
    async fn test_redirect_nodes_take_no_children() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        index
            .declare_static_child(&mut urls, StaticChild::new("c", ok()))
            .unwrap();
        let r = index
            .declare_redirect(&mut urls, RedirectChild::new("r", redirect_fn(|_raw| Ok(vec!["c".into()]))))
            .unwrap();
        let routes = urls.len();

        let err = r
            .declare_static_child(&mut urls, StaticChild::new("x", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));
        let err = r
            .declare_dynamic_child(&mut urls, DynamicChild::new("x_id", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));
        let err = r
            .declare_redirect(&mut urls, RedirectChild::new("y", redirect_fn(|_raw| Ok(Vec::new()))))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ShapeConflict(_)));

        assert!(r.static_children().is_empty());
        assert!(r.dynamic_child().is_none());
        assert_eq!(urls.len(), routes);

        // the path below the redirect still forwards to the target's subtree
        let urls = Arc::new(urls);
        let response = get(&urls, "/r/x").await;
        assert_eq!(response.status(), 302);
        assert_eq!(response.location(), Some("/c/x"));
    }

    #[test]
    fn test_parameter_names_must_be_identifiers() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        for name in ["int:id", "", "1st", "a-b", "<id>"] {
            let err = index
                .declare_dynamic_child(&mut urls, DynamicChild::new(name, ok()))
                .unwrap_err();
            assert!(matches!(err, ViewTreeError::ImproperlyConfigured(_)), "{name}");
        }
        let err = index
            .declare_dynamic_child(&mut urls, DynamicChild::inferred(["int:id"], ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ImproperlyConfigured(_)));
        assert!(index.dynamic_child().is_none());
        assert_eq!(urls.len(), 1);

        let id = index
            .declare_dynamic_child(&mut urls, DynamicChild::new("_id2", ok()))
            .unwrap();
        assert_eq!(id.pattern(), "/<_id2>");
    }

    #[test]
    fn test_parameter_name_rules() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        let user = users
            .declare_dynamic_child(&mut urls, DynamicChild::inferred(["user_id"], ok()))
            .unwrap();
        assert_eq!(user.var_name(), Some("user_id"));

        let posts = user
            .declare_static_child(&mut urls, StaticChild::new("posts", ok()))
            .unwrap();
        let err = posts
            .declare_dynamic_child(&mut urls, DynamicChild::new("user_id", ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::AmbiguousParameter(_)));
        let err = posts
            .declare_dynamic_child(&mut urls, DynamicChild::inferred(["user_id"], ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::AmbiguousParameter(_)));
        let err = posts
            .declare_dynamic_child(&mut urls, DynamicChild::inferred(["user_id", "a", "b"], ok()))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::AmbiguousParameter(_)));

        let post = posts
            .declare_dynamic_child(&mut urls, DynamicChild::inferred(["user_id", "post_id"], ok()))
            .unwrap();
        assert_eq!(post.var_name(), Some("post_id"));
        assert_eq!(post.endpoint(), "users.user_id.posts.post_id");
    }

    #[test]
    fn test_dependent_converter_must_name_known_parameters() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let converter = Converter::dependent(["missing"], |_args: &crate::ParamArgs| {
            Ok(crate::ParamValue::new(0_i32))
        });
        let err = index
            .declare_dynamic_child(&mut urls, DynamicChild::new("slug", ok()).converter(converter))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ImproperlyConfigured(_)));
        assert!(index.dynamic_child().is_none());
    }

    #[test]
    fn test_invalid_names_and_endpoints() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        assert!(index
            .declare_static_child(&mut urls, StaticChild::new("a/b", ok()))
            .is_err());
        index
            .declare_static_child(&mut urls, StaticChild::new("about", ok()).endpoint("about_page"))
            .unwrap();
        assert!(urls.find("about_page").is_some());
        let err = index
            .declare_static_child(&mut urls, StaticChild::new("team", ok()).endpoint("about_page"))
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ImproperlyConfigured(_)));
        assert!(index.child("team").is_none());
    }

    #[test]
    fn test_failure_handler_requires_dynamic_child() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let err = index
            .declare_failure_handler([ConversionErrorKind::Invalid], |_e, _raw| {
                HttpResponse::not_found("")
            })
            .unwrap_err();
        assert!(matches!(err, ViewTreeError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_join_subtree() {
        assert_eq!(join_subtree("/books/3", "a/b"), "/books/3/a/b");
        assert_eq!(join_subtree("/", "x y"), "/x%20y");
    }

    #[tokio::test]
    async fn test_dispatch_resolves_parameters() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        users
            .declare_dynamic_child(
                &mut urls,
                DynamicChild::new("user_id", view_fn(|ctx| async move {
                    let id = *ctx.param("user_id").and_then(|v| v.get::<i64>()).unwrap();
                    HttpResponse::ok(format!("user {}", id * 2))
                }))
                .converter(Converter::parse::<i64>()),
            )
            .unwrap();
        let urls = Arc::new(urls);

        let response = get(&urls, "/users/21").await;
        assert_eq!(response.status(), 200);
        assert_eq!(body(&response), "user 42");

        // unhandled conversion failures surface as server errors
        assert_eq!(get(&urls, "/users/abc").await.status(), 500);
    }

    #[tokio::test]
    async fn test_failure_handler_fallback() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        index
            .declare_dynamic_child(
                &mut urls,
                DynamicChild::new("n", echo()).converter(Converter::parse::<u8>()),
            )
            .unwrap();
        index
            .declare_failure_handler([ConversionErrorKind::NotFound], |_e, _raw| {
                HttpResponse::bad_request("wrong handler")
            })
            .unwrap();
        index
            .declare_failure_handler([ConversionErrorKind::Invalid], |_e, raw| {
                HttpResponse::not_found(format!("no {raw}"))
            })
            .unwrap();
        let urls = Arc::new(urls);

        assert_eq!(body(&get(&urls, "/7").await), "7");
        let response = get(&urls, "/abc").await;
        assert_eq!(response.status(), 404);
        assert_eq!(body(&response), "no abc");
    }

    #[tokio::test]
    async fn test_decorators_are_inherited_and_wrap_resolution() {
        let conversions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&conversions);
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let private = index
            .declare_static_child(
                &mut urls,
                StaticChild::new("private", ok()).decorator(login_required()),
            )
            .unwrap();
        private
            .declare_dynamic_child(
                &mut urls,
                DynamicChild::new("doc", echo()).converter(Converter::from_fn(move |raw| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(crate::ParamValue::new(raw.to_string()))
                })),
            )
            .unwrap();
        let child = private.dynamic_child().unwrap();
        assert_eq!(child.decorators().len(), 1);
        let urls = Arc::new(urls);

        assert_eq!(get(&urls, "/private/x").await.status(), 403);
        assert_eq!(conversions.load(Ordering::SeqCst), 0);
        assert_eq!(get(&urls, "/").await.status(), 200);

        let request = HttpRequest::builder()
            .path("/private/x")
            .meta("USER_AUTHENTICATED", "true")
            .build();
        let response = App::dispatch(Arc::clone(&urls), request, false).await;
        assert_eq!(body(&response), "x");
        assert_eq!(conversions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decorator_order_ancestors_outermost() {
        let trail = Arc::new(std::sync::Mutex::new(String::new()));
        let mark = |label: char, trail: Arc<std::sync::Mutex<String>>| {
            decorator(move |view: ViewFn| -> ViewFn {
                let trail = Arc::clone(&trail);
                Arc::new(move |ctx: ViewContext| -> BoxFuture {
                    trail.lock().unwrap().push(label);
                    view(ctx)
                })
            })
        };
        let mut urls = URLConf::new();
        let index = declare_index(
            &mut urls,
            Index::new(ok()).decorator(mark('a', Arc::clone(&trail))),
        )
        .unwrap();
        index
            .declare_static_child(
                &mut urls,
                StaticChild::new("x", ok()).decorator(mark('b', Arc::clone(&trail))),
            )
            .unwrap();
        let urls = Arc::new(urls);
        get(&urls, "/x").await;
        assert_eq!(*trail.lock().unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_redirect_routes() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let books = index
            .declare_static_child(&mut urls, StaticChild::new("books", ok()))
            .unwrap();
        let book = books
            .declare_dynamic_child(&mut urls, DynamicChild::new("book_id", echo()))
            .unwrap();
        book.declare_static_child(&mut urls, StaticChild::new("notes", ok()))
            .unwrap();
        index
            .declare_redirect(
                &mut urls,
                RedirectChild::new("latest", redirect_fn(|_raw| Ok(vec!["books".into(), "3".into()]))),
            )
            .unwrap();
        index
            .declare_redirect(
                &mut urls,
                RedirectChild::new("old", redirect_fn(|_raw| Ok(vec!["books".into()]))).permanent(true),
            )
            .unwrap();
        let urls = Arc::new(urls);

        let response = get(&urls, "/latest").await;
        assert_eq!(response.status(), 302);
        assert_eq!(response.location(), Some("/books/3"));

        let response = get(&urls, "/latest/notes").await;
        assert_eq!(response.location(), Some("/books/3/notes"));

        let response = get(&urls, "/old").await;
        assert_eq!(response.status(), 301);
        assert_eq!(response.location(), Some("/books"));
    }
}
