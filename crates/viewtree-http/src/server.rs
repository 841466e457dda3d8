//! HTTP server integration.
//!
//! [`App`] combines a [`URLConf`] and [`Settings`] into an axum router. Every
//! request is tagged with a fresh request id, resolved against the route
//! table and dispatched to the matched handler with the match and the shared
//! route table attached.
//!
//! # Examples
//!
//! ```no_run
//! use viewtree_core::Settings;
//! use viewtree_http::server::App;
//! use viewtree_http::urls::conf::{RouteOptions, URLConf};
//! use viewtree_http::{HttpRequest, HttpResponse};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = Arc::new(|_req: HttpRequest| -> viewtree_http::BoxFuture {
//!     Box::pin(async { HttpResponse::ok("Hello!") })
//! });
//!
//! let mut conf = URLConf::new();
//! conf.register_route("/", "index", handler, RouteOptions::default())?;
//!
//! let app = App::new(Settings::default()).urls(conf);
//! // app.run().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::routing::any;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use viewtree_core::logging::request_span;
use viewtree_core::{Settings, ViewTreeError};

use crate::urls::conf::URLConf;
use crate::{HttpRequest, HttpResponse};

/// The application: a route table plus settings, runnable as an HTTP server.
pub struct App {
    url_conf: Arc<URLConf>,
    settings: Settings,
}

impl App {
    /// Creates a new `App` with an empty route table.
    pub fn new(settings: Settings) -> Self {
        Self {
            url_conf: Arc::new(URLConf::new()),
            settings,
        }
    }

    /// Sets the route table.
    #[must_use]
    pub fn urls(mut self, url_conf: URLConf) -> Self {
        self.url_conf = Arc::new(url_conf);
        self
    }

    /// Returns the application settings.
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the shared route table.
    pub const fn url_conf(&self) -> &Arc<URLConf> {
        &self.url_conf
    }

    /// Dispatches one request through the route table.
    ///
    /// Routing failures map onto their status codes: no match is a 404, a
    /// method excluded by every matching route is a 405.
    pub async fn dispatch(url_conf: Arc<URLConf>, mut request: HttpRequest, debug: bool) -> HttpResponse {
        match url_conf.resolve(request.method(), request.path()) {
            Ok(resolver_match) => {
                tracing::debug!(
                    endpoint = resolver_match.url_name.as_deref().unwrap_or_default(),
                    route = %resolver_match.route,
                    "matched route"
                );
                let handler = resolver_match.func.clone();
                request.set_resolver_match(resolver_match);
                request.set_urlconf(url_conf);
                handler(request).await
            }
            Err(e @ ViewTreeError::MethodNotAllowed(_)) => {
                tracing::debug!(error = %e, "method not allowed");
                let allowed = allowed_methods(&url_conf, request.path());
                let allowed: Vec<&str> = allowed.iter().map(String::as_str).collect();
                HttpResponse::not_allowed(&allowed)
            }
            Err(e) => {
                tracing::debug!(error = %e, "no route");
                HttpResponse::from_error(&e, debug)
            }
        }
    }

    /// Converts the application into an axum router.
    pub fn into_axum_router(self) -> axum::Router {
        let url_conf = self.url_conf;
        let debug = self.settings.debug;

        let handler = move |req: Request<Body>| {
            let url_conf = url_conf.clone();

            async move {
                let (parts, body) = req.into_parts();
                let body_bytes = axum::body::to_bytes(body, usize::MAX)
                    .await
                    .unwrap_or_default()
                    .to_vec();

                let request = HttpRequest::from_axum(parts, body_bytes);
                let request_id = uuid::Uuid::new_v4().to_string();
                let span = request_span(&request_id, request.method().as_str(), request.path());

                Self::dispatch(url_conf, request, debug)
                    .instrument(span)
                    .await
                    .into_response()
            }
        };

        axum::Router::new()
            .route("/{*path}", any(handler.clone()))
            .route("/", any(handler))
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the application on `settings.bind_address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a runtime error.
    pub async fn run(self) -> Result<(), ViewTreeError> {
        let addr = self.settings.bind_address.clone();
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            ViewTreeError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;

        tracing::info!("Starting server at http://{addr}/");

        axum::serve(listener, router)
            .await
            .map_err(|e| ViewTreeError::InternalServerError(format!("Server error: {e}")))?;

        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.url_conf.len())
            .field("debug", &self.settings.debug)
            .finish()
    }
}

/// Collects the methods accepted by the routes matching `path`.
fn allowed_methods(url_conf: &URLConf, path: &str) -> Vec<String> {
    let mut allowed: Vec<String> = Vec::new();
    for route in url_conf.routes() {
        if route.pattern().full_match(path).is_none() {
            continue;
        }
        for method in route.options().methods.iter().flatten() {
            if !allowed.iter().any(|m| m == method.as_str()) {
                allowed.push(method.to_string());
            }
        }
    }
    allowed
}
