//! Core error types for viewtree.
//!
//! This module provides [`ViewTreeError`], the single error enum used across the
//! workspace, and [`ConversionError`], the error a parameter converter returns
//! when a raw path segment cannot be decoded.
//!
//! Errors fall into four families:
//!
//! - **Configuration** errors are raised while the definition tree is being
//!   declared. They are fatal to startup.
//! - **Parameter** errors are raised per request while decoding a dynamic
//!   segment. They are recoverable when a matching failure handler exists.
//! - **Traversal** errors are raised when navigating to a child that was never
//!   declared.
//! - **Routing** errors come from the host routing layer (no match, wrong
//!   method, failed reverse lookup).

use std::fmt;

use thiserror::Error;

/// The category of a [`ConversionError`].
///
/// Failure handlers declare the set of kinds they intercept; a handler is
/// consulted only when the raised error's kind is in its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionErrorKind {
    /// The raw value is malformed (e.g. `"abc"` for an integer parameter).
    Invalid,
    /// The raw value is well-formed but does not name an existing object.
    NotFound,
    /// The raw value names an object the request may not access.
    PermissionDenied,
    /// Any other converter failure.
    Other,
}

impl ConversionErrorKind {
    /// Returns a short, lowercase name for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ConversionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a parameter converter.
///
/// # Examples
///
/// ```
/// use viewtree_core::error::{ConversionError, ConversionErrorKind};
///
/// let err = ConversionError::invalid("expected digits, got \"abc\"");
/// assert_eq!(err.kind, ConversionErrorKind::Invalid);
/// assert_eq!(err.to_string(), "invalid: expected digits, got \"abc\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// The category used to select a failure handler.
    pub kind: ConversionErrorKind,
    /// A human-readable description of the failure.
    pub message: String,
}

impl ConversionError {
    /// Creates a conversion error of the given kind.
    pub fn new(kind: ConversionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an [`Invalid`](ConversionErrorKind::Invalid) error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::Invalid, message)
    }

    /// Creates a [`NotFound`](ConversionErrorKind::NotFound) error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::NotFound, message)
    }

    /// Creates a [`PermissionDenied`](ConversionErrorKind::PermissionDenied) error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::PermissionDenied, message)
    }

    /// Creates an [`Other`](ConversionErrorKind::Other) error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ConversionErrorKind::Other, message)
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ConversionError {}

/// The primary error type for viewtree.
#[derive(Error, Debug)]
pub enum ViewTreeError {
    // ── Configuration ────────────────────────────────────────────────

    /// A sibling with the same static name already exists.
    #[error("Duplicate child name '{name}' under '{parent}'")]
    DuplicateName {
        /// The path pattern of the parent node.
        parent: String,
        /// The rejected child name.
        name: String,
    },

    /// A node cannot mix static and dynamic children, or own two dynamic children.
    #[error("Shape conflict: {0}")]
    ShapeConflict(String),

    /// The new dynamic parameter name could not be determined uniquely.
    #[error("Ambiguous parameter: {0}")]
    AmbiguousParameter(String),

    /// The tree or routing table is improperly configured.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A settings file or value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Parameters ───────────────────────────────────────────────────

    /// A converter failed and no failure handler intercepted the error.
    #[error("Failed to convert parameter '{param}': {source}")]
    Conversion {
        /// The dynamic parameter being resolved.
        param: String,
        /// The converter's error.
        #[source]
        source: ConversionError,
    },

    /// A converter failed and a failure handler produced a fallback response.
    #[error("Conversion of parameter '{param}' was intercepted by a failure handler")]
    ParameterIntercepted {
        /// The dynamic parameter being resolved.
        param: String,
    },

    /// A dynamic child has no iterable and its converter cannot enumerate values.
    #[error("Children of parameter '{0}' cannot be enumerated")]
    NotIterable(String),

    /// A typed value was requested as the wrong Rust type.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested type.
        expected: &'static str,
        /// The stored type.
        found: &'static str,
    },

    // ── Traversal ────────────────────────────────────────────────────

    /// No (or more than one) declared child matches the given key.
    #[error("No child '{key}' under '{parent}'")]
    NoSuchChild {
        /// The path pattern of the node being descended from.
        parent: String,
        /// The requested child key.
        key: String,
    },

    // ── Redirects ────────────────────────────────────────────────────

    /// Redirect resolution exceeded the configured depth.
    #[error("Redirect chain starting at '{endpoint}' exceeded {depth} hops")]
    RedirectLoop {
        /// The endpoint of the redirect node that started the chain.
        endpoint: String,
        /// The configured maximum depth.
        depth: usize,
    },

    // ── Routing ──────────────────────────────────────────────────────

    /// No route matches the requested path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A route matches the path but not the request method.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// Reverse URL generation failed.
    #[error("No reverse match: {0}")]
    NoReverseMatch(String),

    // ── Generic ──────────────────────────────────────────────────────

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ViewTreeError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `NotFound` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::DuplicateName { .. }
            | Self::ShapeConflict(_)
            | Self::AmbiguousParameter(_)
            | Self::ImproperlyConfigured(_)
            | Self::ConfigurationError(_)
            | Self::Conversion { .. }
            | Self::ParameterIntercepted { .. }
            | Self::NotIterable(_)
            | Self::TypeMismatch { .. }
            | Self::NoSuchChild { .. }
            | Self::RedirectLoop { .. }
            | Self::NoReverseMatch(_)
            | Self::InternalServerError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for the errors raised while declaring the tree.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. }
                | Self::ShapeConflict(_)
                | Self::AmbiguousParameter(_)
                | Self::ImproperlyConfigured(_)
                | Self::ConfigurationError(_)
        )
    }
}

/// A convenience type alias for `Result<T, ViewTreeError>`.
pub type ViewTreeResult<T> = Result<T, ViewTreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_display() {
        let err = ConversionError::not_found("no user 42");
        assert_eq!(err.to_string(), "not found: no user 42");
    }

    #[test]
    fn test_conversion_error_constructors() {
        assert_eq!(ConversionError::invalid("x").kind, ConversionErrorKind::Invalid);
        assert_eq!(ConversionError::not_found("x").kind, ConversionErrorKind::NotFound);
        assert_eq!(
            ConversionError::permission_denied("x").kind,
            ConversionErrorKind::PermissionDenied
        );
        assert_eq!(ConversionError::other("x").kind, ConversionErrorKind::Other);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ViewTreeError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ViewTreeError::MethodNotAllowed("x".into()).status_code(), 405);
        assert_eq!(
            ViewTreeError::Conversion {
                param: "id".into(),
                source: ConversionError::invalid("x"),
            }
            .status_code(),
            500
        );
        assert_eq!(
            ViewTreeError::NoSuchChild {
                parent: "/".into(),
                key: "x".into(),
            }
            .status_code(),
            500
        );
        assert_eq!(ViewTreeError::NoReverseMatch("x".into()).status_code(), 500);
    }

    #[test]
    fn test_configuration_errors() {
        assert!(ViewTreeError::ShapeConflict("x".into()).is_configuration_error());
        assert!(ViewTreeError::AmbiguousParameter("x".into()).is_configuration_error());
        assert!(ViewTreeError::DuplicateName {
            parent: "/".into(),
            name: "a".into(),
        }
        .is_configuration_error());
        assert!(!ViewTreeError::NotFound("x".into()).is_configuration_error());
        assert!(!ViewTreeError::NotIterable("x".into()).is_configuration_error());
    }

    #[test]
    fn test_conversion_source_is_exposed() {
        use std::error::Error as _;

        let err = ViewTreeError::Conversion {
            param: "user_id".into(),
            source: ConversionError::invalid("abc"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ViewTreeError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("file missing"));
    }
}
