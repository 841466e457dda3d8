//! Redirect resolution.
//!
//! A redirect node's target function returns a list of [`TargetPart`]s that
//! are applied one by one, starting from the redirect node's parent: keys
//! and values descend, nodes and definitions are adopted. If the node reached
//! at the end is itself a redirect node, it is resolved in turn.

use std::fmt;
use std::sync::Arc;

use viewtree_core::{ViewTreeError, ViewTreeResult};

use crate::definition::DefinitionNode;
use crate::node::RequestNode;
use crate::value::{ParamValue, RawValues};

/// Computes a redirect target from the redirect node's raw values.
pub type RedirectFn = Arc<dyn Fn(&RawValues) -> ViewTreeResult<Vec<TargetPart>> + Send + Sync>;

/// Wraps a closure as a [`RedirectFn`].
///
/// # Examples
///
/// ```
/// use viewtree_tree::{redirect_fn, TargetPart};
///
/// // `/latest` → `/books/3`
/// let target = redirect_fn(|_raw| Ok(vec![TargetPart::from("books"), TargetPart::from("3")]));
/// ```
pub fn redirect_fn<F>(f: F) -> RedirectFn
where
    F: Fn(&RawValues) -> ViewTreeResult<Vec<TargetPart>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One step of a redirect target.
#[derive(Clone)]
pub enum TargetPart {
    /// Descend by static name or raw dynamic value.
    Key(String),
    /// Descend by an already-typed dynamic value.
    Value(ParamValue),
    /// Jump to a concrete request node.
    Node(RequestNode),
    /// Jump to a definition, bound to the values known at this point.
    Definition(Arc<DefinitionNode>),
}

impl fmt::Debug for TargetPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::Definition(def) => f.debug_tuple("Definition").field(&def.pattern()).finish(),
        }
    }
}

impl From<&str> for TargetPart {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for TargetPart {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<ParamValue> for TargetPart {
    fn from(value: ParamValue) -> Self {
        Self::Value(value)
    }
}

impl From<RequestNode> for TargetPart {
    fn from(node: RequestNode) -> Self {
        Self::Node(node)
    }
}

impl From<Arc<DefinitionNode>> for TargetPart {
    fn from(def: Arc<DefinitionNode>) -> Self {
        Self::Definition(def)
    }
}

impl RequestNode {
    /// Resolves this node's redirect target to a non-redirect node.
    ///
    /// A node that is not a redirect node resolves to itself.
    ///
    /// # Errors
    ///
    /// Propagates errors from the target function and from descending;
    /// returns [`ViewTreeError::RedirectLoop`] after more hops than the tree's
    /// `max_redirect_depth`.
    pub fn resolve_redirect(&self) -> ViewTreeResult<Self> {
        let origin = self.definition().endpoint().to_string();
        let target = resolve_at(self, 0, &origin)?;
        tracing::debug!(
            from = %origin,
            to = %target.definition().endpoint(),
            raw = ?target.raw_values(),
            "resolved redirect"
        );
        Ok(target)
    }
}

fn resolve_at(node: &RequestNode, depth: usize, origin: &str) -> ViewTreeResult<RequestNode> {
    let Some(redirect) = node.definition().redirect() else {
        return Ok(node.clone());
    };
    let max = node.definition().config().max_redirect_depth;
    if depth >= max {
        return Err(ViewTreeError::RedirectLoop {
            endpoint: origin.to_string(),
            depth: max,
        });
    }

    let parts = (redirect.target)(node.raw_values())?;
    let mut target = node.parent().unwrap_or_else(|| node.clone());
    for part in parts {
        target = step(&target, part, depth, origin)?;
    }
    resolve_at(&target, depth + 1, origin)
}

fn step(current: &RequestNode, part: TargetPart, depth: usize, origin: &str) -> ViewTreeResult<RequestNode> {
    match part {
        TargetPart::Key(key) => current.descend(&key),
        TargetPart::Value(value) => current.descend_value(value),
        TargetPart::Node(node) => resolve_at(&node, depth + 1, origin),
        TargetPart::Definition(def) => {
            let names = def.variable_names();
            let node = RequestNode::bind(
                Arc::clone(&def),
                current.raw_values().retain_names(&names),
                current.typed_values().map_or_else(|_| Default::default(), |t| t.retain_names(&names)),
            );
            resolve_at(&node, depth + 1, origin)
        }
    }
}
