//! Path pattern derivation.
//!
//! A node's pattern is a pure function of its position in the tree: the index
//! is `/`, a static child appends `/name` and a dynamic child appends
//! `/<var_name>` to its parent's pattern. Children of the index start from an
//! empty prefix so the result never contains `//`.

use crate::definition::{DefinitionNode, Segment};

/// Parameter name capturing the unmatched remainder below a redirect node.
pub const REDIRECT_SUBTREE_VAR: &str = "view_tree_redirect_subtree";

/// Returns the path pattern for `node`.
pub fn path_pattern(node: &DefinitionNode) -> String {
    let prefix = match node.parent() {
        Some(parent) if !parent.is_index() => path_pattern(&parent),
        _ => String::new(),
    };
    match &node.segment {
        Segment::Index => "/".to_string(),
        Segment::Static { name, .. } => format!("{prefix}/{name}"),
        Segment::Dynamic { var_name, .. } => format!("{prefix}/<{var_name}>"),
    }
}

/// Returns the pattern matching everything below a redirect node.
pub fn subtree_pattern(node: &DefinitionNode) -> String {
    format!("{}/<path:{REDIRECT_SUBTREE_VAR}>", path_pattern(node))
}

/// Returns the endpoint name of the subtree route of a redirect node.
pub fn subtree_endpoint(endpoint: &str) -> String {
    format!("{endpoint}:subtree")
}

/// Rejects static names that would change the shape of a pattern.
pub(crate) fn is_valid_static_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '<', '>'])
}

#[cfg(test)]
mod tests {
    use viewtree_http::{HttpResponse, URLConf};

    use super::*;
    use crate::context::view_fn;
    use crate::redirect::redirect_fn;
    use crate::registration::{declare_index, DynamicChild, Index, RedirectChild, StaticChild};

    fn ok() -> crate::ViewFn {
        view_fn(|_ctx| async { HttpResponse::ok("ok") })
    }

    #[test]
    fn test_patterns() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let users = index
            .declare_static_child(&mut urls, StaticChild::new("users", ok()))
            .unwrap();
        let user = users
            .declare_dynamic_child(&mut urls, DynamicChild::new("user_id", ok()))
            .unwrap();
        let posts = user
            .declare_static_child(&mut urls, StaticChild::new("posts", ok()))
            .unwrap();
        let post = posts
            .declare_dynamic_child(&mut urls, DynamicChild::new("post_id", ok()))
            .unwrap();

        assert_eq!(path_pattern(&index), "/");
        assert_eq!(path_pattern(&users), "/users");
        assert_eq!(path_pattern(&user), "/users/<user_id>");
        assert_eq!(path_pattern(&posts), "/users/<user_id>/posts");
        assert_eq!(path_pattern(&post), "/users/<user_id>/posts/<post_id>");
    }

    #[test]
    fn test_dynamic_child_of_index() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let slug = index
            .declare_dynamic_child(&mut urls, DynamicChild::new("slug", ok()))
            .unwrap();
        assert_eq!(path_pattern(&slug), "/<slug>");
    }

    #[test]
    fn test_subtree_pattern() {
        let mut urls = URLConf::new();
        let index = declare_index(&mut urls, Index::new(ok())).unwrap();
        let latest = index
            .declare_redirect(
                &mut urls,
                RedirectChild::new("latest", redirect_fn(|_raw| Ok(Vec::new()))),
            )
            .unwrap();
        assert_eq!(
            subtree_pattern(&latest),
            "/latest/<path:view_tree_redirect_subtree>"
        );
        assert_eq!(subtree_endpoint(latest.endpoint()), "latest:subtree");
    }

    #[test]
    fn test_static_name_validation() {
        assert!(is_valid_static_name("users"));
        assert!(!is_valid_static_name(""));
        assert!(!is_valid_static_name("a/b"));
        assert!(!is_valid_static_name("<x>"));
    }
}
