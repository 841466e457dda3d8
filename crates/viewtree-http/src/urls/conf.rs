//! The route table.
//!
//! [`URLConf`] stores registered patterns in registration order, resolves an
//! incoming `(method, path)` to a [`ResolverMatch`] and generates URLs for
//! named endpoints. It is built once at startup and then shared read-only
//! behind an `Arc`.

use std::collections::HashMap;
use std::fmt;

use http::Method;

use viewtree_core::{ViewTreeError, ViewTreeResult};

use super::pattern::{self, URLPattern};
use super::reverse;
use crate::RouteHandler;

/// Per-route configuration forwarded verbatim by route declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteOptions {
    /// Methods the route accepts. `None` accepts every method.
    pub methods: Option<Vec<Method>>,
    /// Arbitrary application data attached to the route.
    pub extra: HashMap<String, serde_json::Value>,
}

impl RouteOptions {
    /// Restricts the route to the given methods.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    /// Attaches an application-defined value.
    #[must_use]
    pub fn extra(mut self, key: &str, value: serde_json::Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Returns `true` if the route accepts the method. `HEAD` is accepted
    /// wherever `GET` is.
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.as_ref().map_or(true, |allowed| {
            allowed.contains(method) || (*method == Method::HEAD && allowed.contains(&Method::GET))
        })
    }
}

/// A registered route: a pattern plus its options.
#[derive(Debug)]
pub struct Route {
    pattern: URLPattern,
    options: RouteOptions,
}

impl Route {
    /// Returns the route's pattern.
    pub const fn pattern(&self) -> &URLPattern {
        &self.pattern
    }

    /// Returns the route's options.
    pub const fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Returns the endpoint name.
    pub fn endpoint(&self) -> &str {
        self.pattern.name().unwrap_or_default()
    }
}

/// The result of successfully resolving a request to a route.
#[derive(Clone)]
pub struct ResolverMatch {
    /// The handler function to call.
    pub func: RouteHandler,
    /// Decoded keyword arguments extracted from the path.
    pub kwargs: HashMap<String, String>,
    /// The endpoint name of the matched route.
    pub url_name: Option<String>,
    /// The matched route string.
    pub route: String,
}

impl fmt::Debug for ResolverMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverMatch")
            .field("kwargs", &self.kwargs)
            .field("url_name", &self.url_name)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

/// The application's route table.
#[derive(Default)]
pub struct URLConf {
    routes: Vec<Route>,
}

impl fmt::Debug for URLConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("URLConf")
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl URLConf {
    /// Creates an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route under a unique endpoint name.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::ImproperlyConfigured`] if the endpoint name is
    /// already taken or the route cannot be compiled.
    pub fn register_route(
        &mut self,
        route: &str,
        endpoint: &str,
        handler: RouteHandler,
        options: RouteOptions,
    ) -> ViewTreeResult<()> {
        if self.find(endpoint).is_some() {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "Endpoint '{endpoint}' is already registered"
            )));
        }

        let pattern = pattern::path(route, handler, Some(endpoint))?;
        tracing::debug!(route, endpoint, methods = ?options.methods, "registered route");
        self.routes.push(Route { pattern, options });
        Ok(())
    }

    /// Returns the registered routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Looks up a route by endpoint name.
    pub fn find(&self, endpoint: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.pattern.name() == Some(endpoint))
    }

    /// Resolves a request to the first route whose pattern matches the path
    /// and whose options accept the method.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::MethodNotAllowed`] if the path only matches
    /// routes that exclude the method, and [`ViewTreeError::NotFound`] if it
    /// matches nothing.
    pub fn resolve(&self, method: &Method, path: &str) -> ViewTreeResult<ResolverMatch> {
        let mut method_mismatch = false;

        for route in &self.routes {
            let Some(kwargs) = route.pattern.full_match(path) else {
                continue;
            };
            if !route.options.allows(method) {
                method_mismatch = true;
                continue;
            }
            return Ok(ResolverMatch {
                func: route.pattern.callback().clone(),
                kwargs,
                url_name: route.pattern.name().map(String::from),
                route: route.pattern.route().to_string(),
            });
        }

        if method_mismatch {
            Err(ViewTreeError::MethodNotAllowed(format!("{method} {path}")))
        } else {
            Err(ViewTreeError::NotFound(format!("No URL pattern matches '{path}'")))
        }
    }

    /// Generates the URL for a named endpoint from raw parameter values.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::NoReverseMatch`] if the endpoint is unknown or
    /// a placeholder has no value.
    pub fn reverse(&self, endpoint: &str, kwargs: &HashMap<String, String>) -> ViewTreeResult<String> {
        let route = self
            .find(endpoint)
            .ok_or_else(|| ViewTreeError::NoReverseMatch(format!("Reverse for '{endpoint}' not found")))?;
        reverse::substitute(route.pattern(), kwargs)
    }
}
