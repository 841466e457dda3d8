//! Reverse URL resolution.
//!
//! Generates URLs from named endpoints by substituting raw parameter values
//! into the endpoint's route. Values are percent-encoded by the placeholder's
//! converter, so a value round-trips through [`URLConf::resolve`] unchanged.

use std::collections::HashMap;

use viewtree_core::{ViewTreeError, ViewTreeResult};

use super::conf::URLConf;
use super::pattern::{RouteToken, URLPattern};

/// Generates the URL for a named endpoint.
///
/// Values for names that do not appear in the route are ignored.
///
/// # Errors
///
/// Returns [`ViewTreeError::NoReverseMatch`] if the endpoint is unknown or a
/// placeholder has no value.
///
/// # Examples
///
/// ```
/// use viewtree_http::urls::conf::{RouteOptions, URLConf};
/// use viewtree_http::urls::reverse::reverse;
/// use viewtree_http::{HttpRequest, HttpResponse};
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// let handler = Arc::new(|_req: HttpRequest| -> viewtree_http::BoxFuture {
///     Box::pin(async { HttpResponse::ok("ok") })
/// });
///
/// let mut conf = URLConf::new();
/// conf.register_route("/tags/<tag>", "tags.tag", handler, RouteOptions::default()).unwrap();
///
/// let mut kwargs = HashMap::new();
/// kwargs.insert("tag".to_string(), "rust lang".to_string());
/// assert_eq!(reverse("tags.tag", &kwargs, &conf).unwrap(), "/tags/rust%20lang");
/// ```
pub fn reverse(
    endpoint: &str,
    kwargs: &HashMap<String, String>,
    urlconf: &URLConf,
) -> ViewTreeResult<String> {
    urlconf.reverse(endpoint, kwargs)
}

/// Substitutes raw values into a pattern's placeholders.
pub(crate) fn substitute(
    pattern: &URLPattern,
    kwargs: &HashMap<String, String>,
) -> ViewTreeResult<String> {
    let mut url = String::new();

    for token in pattern.tokens() {
        match token {
            RouteToken::Literal(text) => url.push_str(text),
            RouteToken::Placeholder { name, converter } => {
                let value = kwargs.get(name).ok_or_else(|| {
                    ViewTreeError::NoReverseMatch(format!(
                        "No value provided for parameter '{name}' of '{}'",
                        pattern.name().unwrap_or(pattern.route())
                    ))
                })?;
                url.push_str(&converter.to_url(value));
            }
        }
    }

    if !url.starts_with('/') {
        url.insert(0, '/');
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::Method;

    use super::*;
    use crate::urls::conf::RouteOptions;
    use crate::RouteHandler;

    fn dummy_handler() -> RouteHandler {
        Arc::new(|_req: crate::HttpRequest| -> crate::BoxFuture {
            Box::pin(async { crate::HttpResponse::ok("ok") })
        })
    }

    fn conf() -> URLConf {
        let mut conf = URLConf::new();
        for (route, name) in [
            ("/", "index"),
            ("/users/<user_id>", "users.user_id"),
            ("/users/<user_id>/posts/<post_id>", "users.user_id.posts.post_id"),
            ("/latest/<path:rest>", "latest:subtree"),
        ] {
            conf.register_route(route, name, dummy_handler(), RouteOptions::default())
                .unwrap();
        }
        conf
    }

    fn kwargs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_reverse_simple() {
        let conf = conf();
        assert_eq!(reverse("index", &HashMap::new(), &conf).unwrap(), "/");
        assert_eq!(
            reverse("users.user_id", &kwargs(&[("user_id", "alice")]), &conf).unwrap(),
            "/users/alice"
        );
    }

    #[test]
    fn test_reverse_multiple_params() {
        let url = reverse(
            "users.user_id.posts.post_id",
            &kwargs(&[("user_id", "bob"), ("post_id", "12")]),
            &conf(),
        )
        .unwrap();
        assert_eq!(url, "/users/bob/posts/12");
    }

    #[test]
    fn test_reverse_encodes_values() {
        let conf = conf();
        assert_eq!(
            reverse("users.user_id", &kwargs(&[("user_id", "a/b c")]), &conf).unwrap(),
            "/users/a%2Fb%20c"
        );
        assert_eq!(
            reverse("latest:subtree", &kwargs(&[("rest", "a/b c")]), &conf).unwrap(),
            "/latest/a/b%20c"
        );
    }

    #[test]
    fn test_reverse_round_trips_through_resolve() {
        let conf = conf();
        let raw = "slash/and space";
        let url = reverse("users.user_id", &kwargs(&[("user_id", raw)]), &conf).unwrap();
        let m = conf.resolve(&Method::GET, &url).unwrap();
        assert_eq!(m.kwargs["user_id"], raw);
    }

    #[test]
    fn test_reverse_missing_value() {
        let err = reverse("users.user_id", &HashMap::new(), &conf()).unwrap_err();
        assert!(matches!(err, ViewTreeError::NoReverseMatch(_)));
    }

    #[test]
    fn test_reverse_unknown_endpoint() {
        let err = reverse("nope", &HashMap::new(), &conf()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_reverse_ignores_extra_values() {
        let url = reverse("index", &kwargs(&[("unused", "x")]), &conf()).unwrap();
        assert_eq!(url, "/");
    }
}
