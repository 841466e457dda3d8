//! Handler decorators.
//!
//! A [`Decorator`] transforms a [`ViewFn`] into another one. Decorators
//! declared on a node apply to that node and to every node below it; the
//! chain is composed outer-to-inner with ancestors' decorators outermost.
//!
//! # Examples
//!
//! ```
//! use viewtree_http::HttpResponse;
//! use viewtree_tree::decorators::{compose, require_get};
//! use viewtree_tree::view_fn;
//!
//! let view = view_fn(|_ctx| async { HttpResponse::ok("Hello!") });
//! let get_only = compose(&[require_get()], view);
//! ```

use std::sync::Arc;

use http::Method;
use viewtree_http::{BoxFuture, HttpResponse, HttpResponseRedirect};

use crate::context::{ViewContext, ViewFn};

/// A handler-transforming function.
pub type Decorator = Arc<dyn Fn(ViewFn) -> ViewFn + Send + Sync>;

/// Wraps a closure as a [`Decorator`].
pub fn decorator<F>(f: F) -> Decorator
where
    F: Fn(ViewFn) -> ViewFn + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Applies `decorators` to `view`, the first decorator outermost.
pub fn compose(decorators: &[Decorator], view: ViewFn) -> ViewFn {
    decorators.iter().rev().fold(view, |inner, d| d(inner))
}

/// Rejects requests whose method is not listed with a 405 response.
pub fn require_http_methods(methods: &[Method]) -> Decorator {
    let allowed: Arc<Vec<Method>> = Arc::new(methods.to_vec());
    decorator(move |view: ViewFn| -> ViewFn {
        let allowed = Arc::clone(&allowed);
        Arc::new(move |ctx: ViewContext| -> BoxFuture {
            let allowed = Arc::clone(&allowed);
            let view = Arc::clone(&view);
            Box::pin(async move {
                if allowed.contains(ctx.request().method()) {
                    view(ctx).await
                } else {
                    let names: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                    HttpResponse::not_allowed(&names)
                }
            })
        })
    })
}

/// Only allows GET and HEAD requests.
pub fn require_get() -> Decorator {
    require_http_methods(&[Method::GET, Method::HEAD])
}

/// Only allows POST requests.
pub fn require_post() -> Decorator {
    require_http_methods(&[Method::POST])
}

fn is_authenticated(ctx: &ViewContext) -> bool {
    ctx.request()
        .meta()
        .get("USER_AUTHENTICATED")
        .is_some_and(|v| v == "true")
}

/// Requires the request's `USER_AUTHENTICATED` META flag, answering 403
/// otherwise.
///
/// The check runs before parameter conversion, so converters of a protected
/// subtree never see anonymous requests.
pub fn login_required() -> Decorator {
    decorator(|view: ViewFn| -> ViewFn {
        Arc::new(move |ctx: ViewContext| -> BoxFuture {
            let view = Arc::clone(&view);
            Box::pin(async move {
                if is_authenticated(&ctx) {
                    view(ctx).await
                } else {
                    HttpResponse::forbidden("Login required")
                }
            })
        })
    })
}

/// Like [`login_required`] but redirects anonymous requests to `login_url`
/// with a `next` query parameter pointing back at the requested path.
pub fn login_required_redirect(login_url: &str) -> Decorator {
    let login_url: Arc<str> = Arc::from(login_url);
    decorator(move |view: ViewFn| -> ViewFn {
        let login_url = Arc::clone(&login_url);
        Arc::new(move |ctx: ViewContext| -> BoxFuture {
            let view = Arc::clone(&view);
            let login_url = Arc::clone(&login_url);
            Box::pin(async move {
                if is_authenticated(&ctx) {
                    view(ctx).await
                } else {
                    let next = ctx.request().get_full_path();
                    HttpResponseRedirect::new(&format!("{login_url}?next={next}"))
                }
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use viewtree_http::{HttpRequest, URLConf};

    use super::*;
    use crate::context::view_fn;
    use crate::registration::{declare_index, Index};
    use crate::node::RequestNode;
    use crate::value::RawValues;

    fn context(method: Method, authenticated: bool) -> ViewContext {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(view_fn(|_ctx| async {
            HttpResponse::ok("ok")
        })))
        .unwrap();
        let mut builder = HttpRequest::builder().method(method).path("/");
        if authenticated {
            builder = builder.meta("USER_AUTHENTICATED", "true");
        }
        ViewContext::new(builder.build(), RequestNode::new(index, RawValues::new()))
    }

    fn ok_view() -> ViewFn {
        view_fn(|_ctx| async { HttpResponse::ok("ok") })
    }

    #[tokio::test]
    async fn test_require_get() {
        let view = compose(&[require_get()], ok_view());
        assert_eq!(view(context(Method::GET, false)).await.status(), 200);
        assert_eq!(view(context(Method::HEAD, false)).await.status(), 200);
        let resp = view(context(Method::POST, false)).await;
        assert_eq!(resp.status(), 405);
        assert!(resp.headers().get("allow").is_some());
    }

    #[tokio::test]
    async fn test_require_post() {
        let view = compose(&[require_post()], ok_view());
        assert_eq!(view(context(Method::POST, false)).await.status(), 200);
        assert_eq!(view(context(Method::GET, false)).await.status(), 405);
    }

    #[tokio::test]
    async fn test_login_required() {
        let view = compose(&[login_required()], ok_view());
        assert_eq!(view(context(Method::GET, true)).await.status(), 200);
        assert_eq!(view(context(Method::GET, false)).await.status(), 403);
    }

    #[tokio::test]
    async fn test_login_required_redirect() {
        let view = compose(&[login_required_redirect("/login")], ok_view());
        let resp = view(context(Method::GET, false)).await;
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.location(), Some("/login?next=/"));
    }

    #[tokio::test]
    async fn test_compose_order_outer_first() {
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let tag = |label: &'static str, log: Arc<Mutex<Vec<&'static str>>>| -> Decorator {
            decorator(move |view: ViewFn| -> ViewFn {
                let log = Arc::clone(&log);
                Arc::new(move |ctx: ViewContext| -> BoxFuture {
                    log.lock().unwrap().push(label);
                    view(ctx)
                })
            })
        };
        let view = compose(
            &[tag("outer", Arc::clone(&log)), tag("inner", Arc::clone(&log))],
            ok_view(),
        );
        view(context(Method::GET, false)).await;
        assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
    }
}
