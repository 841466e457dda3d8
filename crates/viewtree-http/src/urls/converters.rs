//! Path converters for URL pattern matching.
//!
//! A converter decides what a `<type:name>` placeholder matches and how a raw
//! value is encoded back into a URL. Converters here only validate; turning a
//! raw segment into an application type is the view tree's job.
//!
//! # Built-in converters
//!
//! | Name   | Regex   |
//! |--------|---------|
//! | `str`  | `[^/]+` |
//! | `path` | `.+`    |
//!
//! Tree patterns only ever use these two: `str` for a node's own segment and
//! `path` for the remainder below a redirect node.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use viewtree_core::{ViewTreeError, ViewTreeResult};

/// Characters escaped in a single path segment: everything except RFC 3986
/// unreserved characters.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Like [`SEGMENT`] but keeps `/` so multi-segment values stay readable.
const PATH: &AsciiSet = &SEGMENT.remove(b'/');

/// Matches URL path segments and encodes raw values for reverse lookups.
pub trait PathConverter: Send + Sync + fmt::Debug {
    /// Returns the converter's registry name (e.g. `"str"`).
    fn name(&self) -> &'static str;

    /// Returns the regex that matches valid (still percent-encoded) values.
    fn regex(&self) -> &'static str;

    /// Returns `true` if a decoded value is acceptable.
    fn validate(&self, value: &str) -> bool {
        !value.is_empty()
    }

    /// Percent-encodes a raw value for insertion into a URL.
    fn to_url(&self, value: &str) -> String {
        utf8_percent_encode(value, SEGMENT).to_string()
    }
}

/// Converter for string path segments (no slashes). The default.
#[derive(Debug, Clone, Copy)]
pub struct StrConverter;

impl PathConverter for StrConverter {
    fn name(&self) -> &'static str {
        "str"
    }

    fn regex(&self) -> &'static str {
        "[^/]+"
    }
}

/// Converter for the remainder of a path, slashes included.
#[derive(Debug, Clone, Copy)]
pub struct PathSegmentConverter;

impl PathConverter for PathSegmentConverter {
    fn name(&self) -> &'static str {
        "path"
    }

    fn regex(&self) -> &'static str {
        ".+"
    }

    fn to_url(&self, value: &str) -> String {
        utf8_percent_encode(value, PATH).to_string()
    }
}

/// Creates a boxed path converter for the given type name.
///
/// # Errors
///
/// Returns [`ViewTreeError::ImproperlyConfigured`] if the type name is not recognized.
pub fn get_converter(type_name: &str) -> ViewTreeResult<Box<dyn PathConverter>> {
    match type_name {
        "str" => Ok(Box::new(StrConverter)),
        "path" => Ok(Box::new(PathSegmentConverter)),
        _ => Err(ViewTreeError::ImproperlyConfigured(format!(
            "Unknown path converter type: {type_name}"
        ))),
    }
}
