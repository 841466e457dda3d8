//! The request tree.
//!
//! A [`RequestNode`] binds a [`DefinitionNode`] to concrete raw values. The
//! node a request was routed to is created by the route handler; every other
//! node (parents, children, redirect targets) is derived from it on demand
//! and lives only as long as the caller keeps it.
//!
//! Typed values are resolved lazily and at most once per node. Derived nodes
//! inherit the typed values already known, so walking the tree does not
//! re-run converters for shared ancestors.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use viewtree_core::{ConversionError, ViewTreeError, ViewTreeResult};
use viewtree_http::{HttpResponse, URLConf};

use crate::converter::{not_iterable, ParamArgs};
use crate::definition::{Children, DefinitionNode, Segment};
use crate::params::{resolve_params, Resolution};
use crate::value::{ParamValue, RawValues, TypedValues};

#[derive(Clone)]
enum Outcome {
    Resolved(TypedValues),
    Intercepted { param: String },
    Failed { param: String, error: ConversionError },
}

/// A definition node bound to the raw values of one request.
pub struct RequestNode {
    definition: Arc<DefinitionNode>,
    raw: RawValues,
    seed: TypedValues,
    outcome: OnceLock<Outcome>,
    init_failure: Mutex<Option<HttpResponse>>,
}

impl RequestNode {
    /// Binds `definition` to `raw`. Typed values are resolved on first use.
    pub fn new(definition: Arc<DefinitionNode>, raw: RawValues) -> Self {
        Self::bind(definition, raw, TypedValues::new())
    }

    /// Binds `definition` to `raw`, reusing already-typed values from `seed`.
    pub(crate) fn bind(definition: Arc<DefinitionNode>, raw: RawValues, seed: TypedValues) -> Self {
        Self {
            definition,
            raw,
            seed,
            outcome: OnceLock::new(),
            init_failure: Mutex::new(None),
        }
    }

    /// Returns the definition this node instantiates.
    pub const fn definition(&self) -> &Arc<DefinitionNode> {
        &self.definition
    }

    /// Returns the raw values of every parameter on the path.
    pub const fn raw_values(&self) -> &RawValues {
        &self.raw
    }

    /// Returns the raw value of this node's own parameter.
    pub fn raw_var(&self) -> Option<&str> {
        let name = self.definition.var_name()?;
        self.raw.get(name).map(String::as_str)
    }

    /// Returns `true` if this node is a redirect node.
    pub fn is_redirect(&self) -> bool {
        self.definition.is_redirect()
    }

    fn outcome(&self) -> &Outcome {
        self.outcome.get_or_init(|| {
            match resolve_params(&self.definition, &self.raw, &self.seed) {
                Ok(Resolution::Resolved(typed)) => Outcome::Resolved(typed),
                Ok(Resolution::Intercepted { param, response, .. }) => {
                    *self
                        .init_failure
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(response);
                    Outcome::Intercepted { param }
                }
                Err(ViewTreeError::Conversion { param, source }) => Outcome::Failed {
                    param,
                    error: source,
                },
                Err(other) => Outcome::Failed {
                    param: String::new(),
                    error: ConversionError::other(other.to_string()),
                },
            }
        })
    }

    /// Resolves the typed values of every parameter on the path.
    ///
    /// Runs the converters on first call and caches the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::ParameterIntercepted`] when a failure handler
    /// produced a fallback (see [`take_init_failure`](Self::take_init_failure)),
    /// and [`ViewTreeError::Conversion`] when a converter failed unhandled.
    pub fn typed_values(&self) -> ViewTreeResult<&TypedValues> {
        match self.outcome() {
            Outcome::Resolved(typed) => Ok(typed),
            Outcome::Intercepted { param } => Err(ViewTreeError::ParameterIntercepted {
                param: param.clone(),
            }),
            Outcome::Failed { param, error } => Err(ViewTreeError::Conversion {
                param: param.clone(),
                source: error.clone(),
            }),
        }
    }

    /// Alias of [`typed_values`](Self::typed_values), named for call sites
    /// that only care whether resolution succeeds.
    pub fn resolve(&self) -> ViewTreeResult<&TypedValues> {
        self.typed_values()
    }

    /// Takes the fallback response produced by a failure handler, if any.
    pub fn take_init_failure(&self) -> Option<HttpResponse> {
        self.outcome();
        self.init_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Returns the typed value of the parameter `name`.
    pub fn param(&self, name: &str) -> ViewTreeResult<&ParamValue> {
        self.typed_values()?.get(name).ok_or_else(|| {
            ViewTreeError::ImproperlyConfigured(format!(
                "'{}' has no parameter '{name}'",
                self.definition.pattern()
            ))
        })
    }

    /// Returns the typed value of this node's own parameter.
    pub fn var(&self) -> ViewTreeResult<&ParamValue> {
        let name = self.definition.var_name().ok_or_else(|| {
            ViewTreeError::ImproperlyConfigured(format!(
                "'{}' is not a dynamic node",
                self.definition.pattern()
            ))
        })?;
        self.param(name)
    }

    /// The typed values known without running converters: resolved ones if
    /// resolution already succeeded, else the inherited seed.
    fn known_typed(&self) -> TypedValues {
        match self.outcome.get() {
            Some(Outcome::Resolved(typed)) => typed.clone(),
            _ => self.seed.clone(),
        }
    }

    /// Returns the parent node; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let parent = self.definition.parent()?;
        let (raw, typed) = match self.definition.var_name() {
            Some(name) => (self.raw.without(name), self.known_typed().without(name)),
            None => (self.raw.clone(), self.known_typed()),
        };
        Some(Self::bind(parent, raw, typed))
    }

    /// Returns the ancestors of this node, root first.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            ancestors.push(node);
        }
        ancestors.reverse();
        ancestors
    }

    /// Returns the children of this node.
    ///
    /// Static children share this node's values. A dynamic child yields one
    /// node per value of its iterable, or of its converter when no iterable
    /// was declared.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::NotIterable`] when the dynamic child cannot
    /// be enumerated, or the iterable's own error.
    pub fn children(&self) -> ViewTreeResult<Vec<Self>> {
        let typed = self.known_typed();
        let dynamic = match &*self.definition.read_children() {
            Children::Leaf => return Ok(Vec::new()),
            Children::Static(children) => {
                return Ok(children
                    .iter()
                    .map(|c| Self::bind(Arc::clone(c), self.raw.clone(), typed.clone()))
                    .collect());
            }
            Children::Dynamic(child) => Arc::clone(child),
        };

        let values = self.enumerate(&dynamic, &typed)?;
        let Some(var_name) = dynamic.var_name() else {
            return Ok(Vec::new());
        };
        Ok(values
            .into_iter()
            .map(|value| {
                let raw = self.raw.with(var_name, value.url_part().to_string());
                let seeded = typed.with(var_name, value);
                Self::bind(Arc::clone(&dynamic), raw, seeded)
            })
            .collect())
    }

    fn enumerate(&self, child: &DefinitionNode, typed: &TypedValues) -> ViewTreeResult<Vec<ParamValue>> {
        let var_name = child.var_name().unwrap_or_default();
        if let Some(iterable) = child.iterable() {
            // Dependent iterables want typed ancestors; fall back to what is known.
            let typed = self.typed_values().map_or_else(|_| typed.clone(), Clone::clone);
            let names = self.definition.variable_names();
            let args = ParamArgs::bind(names.iter().map(String::as_str), &self.raw, &typed);
            return iterable.enumerate(&args);
        }
        child
            .converter()
            .and_then(crate::converter::Converter::enumerate)
            .ok_or_else(|| not_iterable(var_name))
    }

    /// Returns the child for `key`.
    ///
    /// Below a static node `key` names a static child. Below a dynamic-shaped
    /// node `key` becomes the new parameter's raw value; it is converted
    /// lazily.
    ///
    /// # Errors
    ///
    /// Returns [`ViewTreeError::NoSuchChild`] if no single static child is
    /// named `key`, or the node has no children.
    pub fn descend(&self, key: &str) -> ViewTreeResult<Self> {
        let no_such_child = || ViewTreeError::NoSuchChild {
            parent: self.definition.pattern(),
            key: key.to_string(),
        };
        let children = self.definition.read_children();
        match &*children {
            Children::Leaf => Err(no_such_child()),
            Children::Static(list) => {
                let mut matching = list.iter().filter(|c| c.name() == Some(key));
                match (matching.next(), matching.next()) {
                    (Some(child), None) => Ok(Self::bind(
                        Arc::clone(child),
                        self.raw.clone(),
                        self.known_typed(),
                    )),
                    _ => Err(no_such_child()),
                }
            }
            Children::Dynamic(child) => {
                let var_name = child.var_name().unwrap_or_default();
                let raw = self.raw.with(var_name, key.to_string());
                let typed = self.known_typed().without(var_name);
                Ok(Self::bind(Arc::clone(child), raw, typed))
            }
        }
    }

    /// Returns the child for an already-typed value.
    ///
    /// Below a dynamic-shaped node the value is bound as is, with its URL part
    /// as the raw value. Below a static node its URL part names the child.
    pub fn descend_value(&self, value: ParamValue) -> ViewTreeResult<Self> {
        let Some(child) = self.definition.dynamic_child() else {
            return self.descend(value.url_part());
        };
        let var_name = child.var_name().unwrap_or_default().to_string();
        let raw = self.raw.with(var_name.as_str(), value.url_part().to_string());
        let typed = self.known_typed().with(var_name, value);
        Ok(Self::bind(child, raw, typed))
    }

    /// Returns this node's URL from the route table.
    pub fn url(&self, urls: &URLConf) -> ViewTreeResult<String> {
        urls.reverse(self.definition.endpoint(), &self.raw.to_hash_map())
    }

    /// Returns the path segments identifying this node: static names and
    /// raw values. Empty for the root.
    pub fn key(&self) -> Vec<String> {
        let mut key = self.parent().map_or_else(Vec::new, |p| p.key());
        match &self.definition.segment {
            Segment::Index => {}
            Segment::Static { name, .. } => key.push(name.clone()),
            Segment::Dynamic { .. } => key.push(self.raw_var().unwrap_or_default().to_string()),
        }
        key
    }
}

impl fmt::Display for RequestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.definition.segment {
            Segment::Index => f.write_str("/"),
            Segment::Static { name, display } => f.write_str(display.as_deref().unwrap_or(name.as_str())),
            Segment::Dynamic { .. } => match self.var() {
                Ok(value) => write!(f, "{value}"),
                Err(_) => f.write_str(self.raw_var().unwrap_or_default()),
            },
        }
    }
}

impl fmt::Debug for RequestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestNode")
            .field("pattern", &self.definition.pattern())
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl Clone for RequestNode {
    fn clone(&self) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            raw: self.raw.clone(),
            seed: self.seed.clone(),
            outcome: self.outcome.clone(),
            init_failure: Mutex::new(
                self.init_failure
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone(),
            ),
        }
    }
}

/// Nodes are equal when they instantiate the same definition with the same
/// raw values.
impl PartialEq for RequestNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition) && self.raw == other.raw
    }
}

impl Eq for RequestNode {}
