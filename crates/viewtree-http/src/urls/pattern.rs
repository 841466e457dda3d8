//! URL path pattern parsing and matching.
//!
//! [`path`] compiles a route such as `/users/<user_id>` into a
//! [`URLPattern`]: an anchored regex plus the ordered list of literal and
//! placeholder tokens, so the same pattern serves both matching and reverse
//! URL generation.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use percent_encoding::percent_decode_str;
use regex::Regex;

use viewtree_core::{ViewTreeError, ViewTreeResult};

use super::converters::{self, PathConverter};
use crate::RouteHandler;

/// One piece of a parsed route.
#[derive(Debug)]
pub enum RouteToken {
    /// Literal text, matched verbatim.
    Literal(String),
    /// A `<type:name>` placeholder.
    Placeholder {
        /// The parameter name.
        name: String,
        /// The converter selected by the placeholder's type.
        converter: Box<dyn PathConverter>,
    },
}

/// A single URL pattern that matches a path and invokes a handler.
pub struct URLPattern {
    route: String,
    regex: Regex,
    name: Option<String>,
    tokens: Vec<RouteToken>,
    callback: RouteHandler,
}

impl fmt::Debug for URLPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("URLPattern")
            .field("route", &self.route)
            .field("regex", &self.regex.as_str())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl URLPattern {
    /// Returns the original route string.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the compiled regex.
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Returns the endpoint name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the parsed route tokens in order.
    pub fn tokens(&self) -> &[RouteToken] {
        &self.tokens
    }

    /// Returns the placeholder names in order of appearance.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                RouteToken::Placeholder { name, .. } => Some(name.as_str()),
                RouteToken::Literal(_) => None,
            })
            .collect()
    }

    /// Returns the handler.
    pub fn callback(&self) -> &RouteHandler {
        &self.callback
    }

    /// Matches the whole path against this pattern.
    ///
    /// Captured values are percent-decoded and validated by their converter.
    /// Returns `None` if the path does not match or a value fails validation.
    pub fn full_match(&self, path: &str) -> Option<HashMap<String, String>> {
        let captures = self.regex.captures(path)?;
        let mut kwargs = HashMap::new();

        for token in &self.tokens {
            if let RouteToken::Placeholder { name, converter } = token {
                let raw = captures.name(name)?.as_str();
                let decoded = percent_decode_str(raw).decode_utf8().ok()?;
                if !converter.validate(&decoded) {
                    return None;
                }
                kwargs.insert(name.clone(), decoded.into_owned());
            }
        }

        Some(kwargs)
    }
}

/// Parses the `<type:name>` portion of a placeholder, returning `(type_name, param_name)`.
/// Defaults to `"str"` if no colon is present.
fn parse_type_and_name(inner: &str) -> (&str, &str) {
    inner
        .find(':')
        .map_or(("str", inner), |pos| (&inner[..pos], &inner[pos + 1..]))
}

/// Returns `true` if `name` can be used as a placeholder parameter name.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Splits a route into tokens.
///
/// # Errors
///
/// Returns an error for unclosed brackets, unknown converter types, invalid or
/// repeated parameter names.
fn tokenize(route: &str) -> ViewTreeResult<Vec<RouteToken>> {
    let mut tokens = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut remaining = route;

    while !remaining.is_empty() {
        let Some(start) = remaining.find('<') else {
            tokens.push(RouteToken::Literal(remaining.to_string()));
            break;
        };
        if start > 0 {
            tokens.push(RouteToken::Literal(remaining[..start].to_string()));
        }

        let end = remaining[start..].find('>').ok_or_else(|| {
            ViewTreeError::ImproperlyConfigured(format!("Unclosed angle bracket in route: {route}"))
        })? + start;

        let (type_name, param_name) = parse_type_and_name(&remaining[start + 1..end]);
        if !is_identifier(param_name) {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "Invalid parameter name '{param_name}' in route: {route}"
            )));
        }
        if seen.contains(&param_name) {
            return Err(ViewTreeError::ImproperlyConfigured(format!(
                "Parameter '{param_name}' appears twice in route: {route}"
            )));
        }
        seen.push(param_name);

        tokens.push(RouteToken::Placeholder {
            name: param_name.to_string(),
            converter: converters::get_converter(type_name)?,
        });
        remaining = &remaining[end + 1..];
    }

    Ok(tokens)
}

/// Creates a URL pattern from a route with `<type:name>` placeholders.
///
/// Supported types are `str` (the default), `int`, `slug`, `uuid` and `path`.
///
/// # Examples
///
/// ```
/// use viewtree_http::urls::pattern::path;
/// use viewtree_http::{HttpRequest, HttpResponse};
/// use std::sync::Arc;
///
/// let handler = Arc::new(|_req: HttpRequest| -> viewtree_http::BoxFuture {
///     Box::pin(async { HttpResponse::ok("Hello") })
/// });
///
/// let pattern = path("/users/<user_id>", handler, Some("users.user_id")).unwrap();
/// let kwargs = pattern.full_match("/users/7").unwrap();
/// assert_eq!(kwargs["user_id"], "7");
/// ```
///
/// # Errors
///
/// Returns an error if the route contains unknown converter types or invalid syntax.
pub fn path(route: &str, callback: RouteHandler, name: Option<&str>) -> ViewTreeResult<URLPattern> {
    let tokens = tokenize(route)?;

    let mut regex_str = String::from("^");
    for token in &tokens {
        match token {
            RouteToken::Literal(text) => regex_str.push_str(&regex::escape(text)),
            RouteToken::Placeholder { name, converter } => {
                write!(regex_str, "(?P<{name}>{})", converter.regex()).ok();
            }
        }
    }
    regex_str.push('$');

    let regex = Regex::new(&regex_str)
        .map_err(|e| ViewTreeError::ImproperlyConfigured(format!("Invalid pattern regex: {e}")))?;

    Ok(URLPattern {
        route: route.to_string(),
        regex,
        name: name.map(String::from),
        tokens,
        callback,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn dummy_handler() -> RouteHandler {
        Arc::new(|_req: crate::HttpRequest| -> crate::BoxFuture {
            Box::pin(async { crate::HttpResponse::ok("ok") })
        })
    }

    #[test]
    fn test_path_root() {
        let p = path("/", dummy_handler(), Some("index")).unwrap();
        assert_eq!(p.name(), Some("index"));
        assert!(p.full_match("/").is_some());
        assert!(p.full_match("/users").is_none());
    }

    #[test]
    fn test_path_static() {
        let p = path("/users", dummy_handler(), None).unwrap();
        assert!(p.full_match("/users").is_some());
        assert!(p.full_match("/users/").is_none());
        assert!(p.full_match("/other").is_none());
    }

    #[test]
    fn test_path_default_str_converter() {
        let p = path("/users/<user_id>", dummy_handler(), None).unwrap();
        let kwargs = p.full_match("/users/alice").unwrap();
        assert_eq!(kwargs.get("user_id").unwrap(), "alice");
        assert!(p.full_match("/users/a/b").is_none());
    }

    #[test]
    fn test_path_decodes_values() {
        let p = path("/tags/<tag>", dummy_handler(), None).unwrap();
        assert_eq!(p.full_match("/tags/rust%20lang").unwrap()["tag"], "rust lang");
    }

    #[test]
    fn test_path_param_captures_rest() {
        let p = path("/latest/<path:rest>", dummy_handler(), None).unwrap();
        assert_eq!(p.full_match("/latest/a/b/c").unwrap()["rest"], "a/b/c");
    }

    #[test]
    fn test_path_multiple_params() {
        let p = path("/users/<user_id>/posts/<post_id>", dummy_handler(), None).unwrap();
        let kwargs = p.full_match("/users/bob/posts/12").unwrap();
        assert_eq!(kwargs["user_id"], "bob");
        assert_eq!(kwargs["post_id"], "12");
        assert_eq!(p.parameter_names(), vec!["user_id", "post_id"]);
    }

    #[test]
    fn test_path_literal_is_escaped() {
        let p = path("/v1.0/items", dummy_handler(), None).unwrap();
        assert!(p.full_match("/v1.0/items").is_some());
        assert!(p.full_match("/v1x0/items").is_none());
    }

    #[test]
    fn test_path_errors() {
        assert!(path("/a/<custom:x>", dummy_handler(), None).is_err());
        assert!(path("/a/<x", dummy_handler(), None).is_err());
        assert!(path("/a/<int:x>", dummy_handler(), None).is_err());
        assert!(path("/a/<x-y>", dummy_handler(), None).is_err());
        assert!(path("/a/<x>/<x>", dummy_handler(), None).is_err());
    }

    #[test]
    fn test_path_debug() {
        let p = path("/test", dummy_handler(), Some("test")).unwrap();
        assert!(format!("{p:?}").contains("/test"));
    }
}
