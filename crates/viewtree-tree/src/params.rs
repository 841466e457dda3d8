//! Parameter resolution.
//!
//! Turns the raw values of a request into typed values by running each
//! dynamic segment's converter from the root down, so that a converter can
//! depend on the already-typed values of its ancestors. A failing converter
//! either hands the request to a matching [`FailureHandler`] or aborts
//! resolution with [`ViewTreeError::Conversion`].

use std::fmt;
use std::sync::Arc;

use viewtree_core::{ConversionError, ConversionErrorKind, ViewTreeError, ViewTreeResult};
use viewtree_http::HttpResponse;

use crate::definition::DefinitionNode;
use crate::value::{RawValues, TypedValues};

type FailureFn = Arc<dyn Fn(&ConversionError, &str) -> HttpResponse + Send + Sync>;

/// Produces a fallback response when a parameter cannot be converted.
///
/// The handler receives the converter's error and the raw value that failed.
#[derive(Clone)]
pub struct FailureHandler {
    kinds: Vec<ConversionErrorKind>,
    handler: FailureFn,
}

impl FailureHandler {
    /// Creates a handler for the given error kinds.
    pub fn new<I, F>(kinds: I, handler: F) -> Self
    where
        I: IntoIterator<Item = ConversionErrorKind>,
        F: Fn(&ConversionError, &str) -> HttpResponse + Send + Sync + 'static,
    {
        Self {
            kinds: kinds.into_iter().collect(),
            handler: Arc::new(handler),
        }
    }

    /// Returns the error kinds this handler intercepts.
    pub fn kinds(&self) -> &[ConversionErrorKind] {
        &self.kinds
    }

    /// Returns `true` if the handler intercepts errors of `kind`.
    pub fn matches(&self, kind: ConversionErrorKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Runs the handler.
    pub fn handle(&self, error: &ConversionError, raw: &str) -> HttpResponse {
        (self.handler)(error, raw)
    }
}

impl fmt::Debug for FailureHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureHandler")
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

/// The outcome of resolving a node's parameters.
#[derive(Debug)]
pub enum Resolution {
    /// Every parameter converted.
    Resolved(TypedValues),
    /// A failure handler intercepted the conversion of `param`.
    Intercepted {
        /// The parameter whose converter failed.
        param: String,
        /// The converter's error.
        error: ConversionError,
        /// The handler's fallback response.
        response: HttpResponse,
    },
}

/// Resolves the typed values of every parameter along `definition`'s path.
///
/// Values already present in `seed` are reused without calling their
/// converter. Resolution stops at the first failure.
///
/// # Errors
///
/// Returns [`ViewTreeError::Conversion`] when a converter fails and no
/// failure handler declared for that parameter matches the error's kind.
pub fn resolve_params(
    definition: &Arc<DefinitionNode>,
    raw: &RawValues,
    seed: &TypedValues,
) -> ViewTreeResult<Resolution> {
    let mut typed = TypedValues::new();

    for owner in definition.parameters() {
        let Some(name) = owner.var_name() else {
            continue;
        };
        if let Some(value) = seed.get(name) {
            typed.insert(name, value.clone());
            continue;
        }
        let Some(converter) = owner.converter() else {
            continue;
        };

        match converter.convert(name, raw, &typed) {
            Ok(value) => {
                typed.insert(name, value);
            }
            Err(error) => {
                let raw_value = raw.get(name).map_or("", String::as_str);
                let handlers = owner.failure_handlers();
                if let Some(handler) = handlers.iter().find(|h| h.matches(error.kind)) {
                    tracing::warn!(
                        param = name,
                        raw = raw_value,
                        kind = %error.kind,
                        "parameter conversion intercepted by failure handler"
                    );
                    let response = handler.handle(&error, raw_value);
                    return Ok(Resolution::Intercepted {
                        param: name.to_string(),
                        error,
                        response,
                    });
                }
                tracing::error!(
                    param = name,
                    raw = raw_value,
                    error = %error,
                    "parameter conversion failed"
                );
                return Err(ViewTreeError::Conversion {
                    param: name.to_string(),
                    source: error,
                });
            }
        }
    }

    Ok(Resolution::Resolved(typed))
}
