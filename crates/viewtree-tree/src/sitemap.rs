//! Breadcrumbs and sitemaps.
//!
//! Both walk the request tree: breadcrumbs go up from a node to the root,
//! sitemaps go down from a node through every enumerable child. Sitemaps
//! render to XML following the [sitemaps.org protocol](https://www.sitemaps.org/protocol.html).

use std::fmt::Write;

use serde::Serialize;
use viewtree_core::{ViewTreeError, ViewTreeResult};
use viewtree_http::URLConf;

use crate::node::RequestNode;

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    /// The node's display form.
    pub title: String,
    /// The node's URL.
    pub url: String,
}

/// Returns the breadcrumb trail to `node`, root first, `node` last.
pub fn breadcrumbs(node: &RequestNode, urls: &URLConf) -> ViewTreeResult<Vec<Crumb>> {
    let mut trail = node.ancestors();
    trail.push(node.clone());
    trail
        .iter()
        .map(|n| {
            Ok(Crumb {
                title: n.to_string(),
                url: n.url(urls)?,
            })
        })
        .collect()
}

/// A single URL in a sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapEntry {
    /// The URL path.
    pub location: String,
    /// The node's display form.
    pub title: String,
    /// Distance from the node the sitemap was built from.
    pub depth: usize,
}

/// A collection of sitemap entries in pre-order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Sitemap {
    /// The entries in this sitemap.
    pub entries: Vec<SitemapEntry>,
}

impl Sitemap {
    /// Creates a new empty sitemap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the sitemap has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, SitemapEntry> {
        self.entries.iter()
    }
}

/// Lists `root` and its descendants down to `max_depth` levels below it.
///
/// Redirect nodes are skipped, as are the children of dynamic segments that
/// cannot be enumerated.
pub fn sitemap(root: &RequestNode, urls: &URLConf, max_depth: usize) -> ViewTreeResult<Sitemap> {
    let mut sitemap = Sitemap::new();
    visit(root, urls, 0, max_depth, &mut sitemap)?;
    Ok(sitemap)
}

fn visit(
    node: &RequestNode,
    urls: &URLConf,
    depth: usize,
    max_depth: usize,
    sitemap: &mut Sitemap,
) -> ViewTreeResult<()> {
    sitemap.entries.push(SitemapEntry {
        location: node.url(urls)?,
        title: node.to_string(),
        depth,
    });
    if depth >= max_depth {
        return Ok(());
    }
    let children = match node.children() {
        Ok(children) => children,
        Err(ViewTreeError::NotIterable(name)) => {
            tracing::debug!(param = %name, "skipping children that cannot be enumerated");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    for child in children.iter().filter(|c| !c.is_redirect()) {
        visit(child, urls, depth + 1, max_depth, sitemap)?;
    }
    Ok(())
}

/// Renders a sitemap as XML, prefixing each location with `base_url`.
pub fn render_sitemap_xml(sitemap: &Sitemap, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for entry in &sitemap.entries {
        xml.push_str("  <url>\n");
        let _ = writeln!(
            xml,
            "    <loc>{}</loc>",
            escape_xml(&format!("{base_url}{}", entry.location))
        );
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Escapes special XML characters in a string.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
