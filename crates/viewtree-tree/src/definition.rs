//! The definition tree.
//!
//! One [`DefinitionNode`] exists per declared endpoint. The tree is built
//! during startup through the declarations in [`registration`](crate::registration)
//! and is read-only afterwards; children and failure-handler lists sit behind
//! `RwLock`s only so that declarations can add to them through shared `Arc`s.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use viewtree_http::RouteOptions;

use crate::config::TreeConfig;
use crate::context::ViewFn;
use crate::converter::{Converter, Iterable};
use crate::decorators::Decorator;
use crate::params::FailureHandler;
use crate::pattern;
use crate::redirect::RedirectFn;

/// What a node contributes to the URL path.
pub(crate) enum Segment {
    Index,
    Static {
        name: String,
        display: Option<String>,
    },
    Dynamic {
        var_name: String,
        converter: Converter,
        iterable: Option<Iterable>,
    },
}

/// A node's children: none yet, named static children in declaration order,
/// or a single dynamic child.
pub(crate) enum Children {
    Leaf,
    Static(Vec<Arc<DefinitionNode>>),
    Dynamic(Arc<DefinitionNode>),
}

/// Marks a node as a redirect node.
#[derive(Clone)]
pub(crate) struct RedirectSpec {
    pub(crate) target: RedirectFn,
    pub(crate) permanent: bool,
}

/// A declared endpoint in the definition tree.
pub struct DefinitionNode {
    pub(crate) parent: Option<Weak<DefinitionNode>>,
    pub(crate) segment: Segment,
    pub(crate) endpoint: String,
    pub(crate) handler: ViewFn,
    pub(crate) redirect: Option<RedirectSpec>,
    pub(crate) decorators: Vec<Decorator>,
    pub(crate) options: RouteOptions,
    pub(crate) children: RwLock<Children>,
    pub(crate) failure_handlers: RwLock<Vec<FailureHandler>>,
    pub(crate) config: Arc<TreeConfig>,
}

impl DefinitionNode {
    /// Returns `true` for the tree root.
    pub const fn is_index(&self) -> bool {
        matches!(self.segment, Segment::Index)
    }

    /// Returns `true` for the index and static children.
    pub const fn is_static(&self) -> bool {
        !self.is_dynamic()
    }

    /// Returns `true` for a dynamic child.
    pub const fn is_dynamic(&self) -> bool {
        matches!(self.segment, Segment::Dynamic { .. })
    }

    /// Returns `true` if requests to this node are answered with a redirect.
    pub const fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }

    /// Returns `true` unless the node owns a dynamic child.
    pub fn children_are_static(&self) -> bool {
        !matches!(*self.read_children(), Children::Dynamic(_))
    }

    /// Returns the parent node; `None` for the root.
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Returns the definition ancestors, nearest first.
    pub fn ancestors(&self) -> Vec<Arc<Self>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            ancestors.push(node);
        }
        ancestors
    }

    /// Returns the path from the root to this node, both included.
    pub fn lineage(self: &Arc<Self>) -> Vec<Arc<Self>> {
        let mut lineage = self.ancestors();
        lineage.reverse();
        lineage.push(Arc::clone(self));
        lineage
    }

    /// Returns the dynamic nodes on the path to this node, root first.
    pub fn parameters(self: &Arc<Self>) -> Vec<Arc<Self>> {
        self.lineage().into_iter().filter(|n| n.is_dynamic()).collect()
    }

    /// Returns the parameter names bound on the path to this node, root first.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ancestors()
            .iter()
            .rev()
            .filter_map(|n| n.var_name().map(String::from))
            .collect();
        if let Some(name) = self.var_name() {
            names.push(name.to_string());
        }
        names
    }

    /// Returns the path segments identifying this node: static names and
    /// `<var_name>` for dynamic segments. Empty for the root.
    pub fn key(&self) -> Vec<String> {
        let mut key = self.parent().map_or_else(Vec::new, |p| p.key());
        match &self.segment {
            Segment::Index => {}
            Segment::Static { name, .. } => key.push(name.clone()),
            Segment::Dynamic { var_name, .. } => key.push(format!("<{var_name}>")),
        }
        key
    }

    /// Returns the static name, if this is a static child.
    pub fn name(&self) -> Option<&str> {
        match &self.segment {
            Segment::Static { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    /// Returns the display string of a static child, defaulting to its name.
    pub fn display_string(&self) -> Option<&str> {
        match &self.segment {
            Segment::Static { name, display } => Some(display.as_deref().unwrap_or(name.as_str())),
            _ => None,
        }
    }

    /// Returns the parameter name, if this is a dynamic child.
    pub fn var_name(&self) -> Option<&str> {
        match &self.segment {
            Segment::Dynamic { var_name, .. } => Some(var_name.as_str()),
            _ => None,
        }
    }

    /// Returns the converter, if this is a dynamic child.
    pub const fn converter(&self) -> Option<&Converter> {
        match &self.segment {
            Segment::Dynamic { converter, .. } => Some(converter),
            _ => None,
        }
    }

    /// Returns the declared iterable, if any.
    pub const fn iterable(&self) -> Option<&Iterable> {
        match &self.segment {
            Segment::Dynamic { iterable, .. } => iterable.as_ref(),
            _ => None,
        }
    }

    /// Returns the static children in declaration order.
    pub fn static_children(&self) -> Vec<Arc<Self>> {
        match &*self.read_children() {
            Children::Static(children) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns the dynamic child, if declared.
    pub fn dynamic_child(&self) -> Option<Arc<Self>> {
        match &*self.read_children() {
            Children::Dynamic(child) => Some(Arc::clone(child)),
            _ => None,
        }
    }

    /// Returns the static children named `name`.
    pub fn children_named(&self, name: &str) -> Vec<Arc<Self>> {
        self.static_children()
            .into_iter()
            .filter(|c| c.name() == Some(name))
            .collect()
    }

    /// Returns the static child named `name`.
    pub fn child(&self, name: &str) -> Option<Arc<Self>> {
        self.children_named(name).into_iter().next()
    }

    /// Returns the path pattern registered for this node.
    pub fn pattern(&self) -> String {
        pattern::path_pattern(self)
    }

    /// Returns the route endpoint name.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the decorated handler.
    pub const fn handler(&self) -> &ViewFn {
        &self.handler
    }

    /// Returns the decorators applied to this node, ancestors' first.
    pub fn decorators(&self) -> &[Decorator] {
        &self.decorators
    }

    /// Returns the options the node's routes were registered with.
    pub const fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Returns the failure handlers consulted when this node's converter fails.
    pub fn failure_handlers(&self) -> Vec<FailureHandler> {
        self.failure_handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the tree configuration.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub(crate) const fn redirect(&self) -> Option<&RedirectSpec> {
        self.redirect.as_ref()
    }

    pub(crate) fn read_children(&self) -> std::sync::RwLockReadGuard<'_, Children> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_children(&self) -> std::sync::RwLockWriteGuard<'_, Children> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DefinitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefinitionNode")
            .field("pattern", &self.pattern())
            .field("endpoint", &self.endpoint)
            .field("redirect", &self.is_redirect())
            .field("decorators", &self.decorators.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use viewtree_http::{HttpResponse, URLConf};

    use crate::context::view_fn;
    use crate::registration::{declare_index, DynamicChild, Index, StaticChild};

    fn ok() -> crate::ViewFn {
        view_fn(|_ctx| async { HttpResponse::ok("ok") })
    }

    #[test]
    fn test_structure_queries() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()).display("All users"))
            .unwrap();
        let user = users
            .declare_dynamic_child(&mut urls, DynamicChild::new("user_id", ok()))
            .unwrap();
        let posts = user
            .declare_static_child(&mut urls, StaticChild::new("posts", ok()))
            .unwrap();

        assert!(index.is_index());
        assert!(index.parent().is_none());
        assert!(users.is_static());
        assert!(user.is_dynamic());
        assert!(!users.children_are_static());
        assert!(index.children_are_static());

        assert_eq!(users.display_string(), Some("All users"));
        assert_eq!(posts.display_string(), Some("posts"));
        assert_eq!(user.var_name(), Some("user_id"));
        assert_eq!(posts.variable_names(), vec!["user_id".to_string()]);
        assert_eq!(posts.key(), vec!["users", "<user_id>", "posts"]);
        assert!(index.key().is_empty());

        let ancestors = posts.ancestors();
        assert_eq!(ancestors.len(), 3);
        assert!(std::sync::Arc::ptr_eq(&ancestors[0], &user));
        assert!(std::sync::Arc::ptr_eq(&ancestors[2], &index));

        let lineage = posts.lineage();
        assert!(std::sync::Arc::ptr_eq(&lineage[0], &index));
        assert_eq!(lineage.len(), 4);
        assert_eq!(posts.parameters().len(), 1);

        assert!(std::sync::Arc::ptr_eq(&index.child("users").unwrap(), &users));
        assert!(index.child("nope").is_none());
        assert!(std::sync::Arc::ptr_eq(&users.dynamic_child().unwrap(), &user));
        assert!(users.static_children().is_empty());
    }

    #[test]
    fn test_endpoints_follow_key() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        let user = users
            .declare_dynamic_child(&mut urls, DynamicChild::new("user_id", ok()))
            .unwrap();
        assert_eq!(index.endpoint(), "index");
        assert_eq!(users.endpoint(), "users");
        assert_eq!(user.endpoint(), "users.user_id");
        assert!(format!("{user:?}").contains("/users/<user_id>"));
    }
}
