//! Catalog views.
//!
//! Each view renders plain text from the request node it was dispatched
//! with. Views read typed parameters from the node and link to other pages
//! by walking the tree, never by formatting URLs themselves.

use std::fmt::Write;

use viewtree::core::ViewTreeResult;
use viewtree::tree::prelude::*;
use viewtree::tree::render_sitemap_xml;

use crate::library::{Book, Chapter};

/// Renders `title (url)` for each listed node.
fn listing(ctx: &ViewContext, nodes: &[RequestNode]) -> ViewTreeResult<String> {
    let urls = ctx.urls()?;
    let mut lines = Vec::with_capacity(nodes.len());
    for node in nodes.iter().filter(|n| !n.is_redirect()) {
        lines.push(format!("- {node} ({})", node.url(urls)?));
    }
    Ok(lines.join("\n"))
}

/// Renders the breadcrumb trail of the current node.
fn trail(ctx: &ViewContext) -> ViewTreeResult<String> {
    let crumbs = breadcrumbs(ctx.node(), ctx.urls()?)?;
    Ok(crumbs
        .iter()
        .map(|c| c.title.as_str())
        .collect::<Vec<_>>()
        .join(" > "))
}

/// `/`: the catalog's sections.
pub fn index(ctx: &ViewContext, title: &str) -> ViewTreeResult<String> {
    let sections = ctx.node().children()?;
    Ok(format!("{title}\n\n{}", listing(ctx, &sections)?))
}

/// `/about`
pub fn about(ctx: &ViewContext) -> ViewTreeResult<String> {
    Ok(format!("{}\n\nA demonstration of hierarchical view trees.", trail(ctx)?))
}

/// `/books`: every book.
pub fn book_list(ctx: &ViewContext) -> ViewTreeResult<String> {
    let books = ctx.node().children()?;
    Ok(format!("{}\n\n{}", trail(ctx)?, listing(ctx, &books)?))
}

/// `/books/<book_id>`
pub fn book_detail(ctx: &ViewContext) -> ViewTreeResult<String> {
    let book = ctx.param("book_id")?.get::<Book>()?;
    Ok(format!(
        "{}\n\n{} by {}\n{} chapters",
        trail(ctx)?,
        book.title,
        book.author,
        book.chapters.len()
    ))
}

/// `/books/<book_id>/chapters`
pub fn chapter_list(ctx: &ViewContext) -> ViewTreeResult<String> {
    let chapters = ctx.node().children()?;
    Ok(format!("{}\n\n{}", trail(ctx)?, listing(ctx, &chapters)?))
}

/// `/books/<book_id>/chapters/<chapter>`
pub fn chapter_detail(ctx: &ViewContext) -> ViewTreeResult<String> {
    let book = ctx.param("book_id")?.get::<Book>()?;
    let chapter = ctx.param("chapter")?.get::<Chapter>()?;
    let mut page = format!("{}\n\n{book}, chapter {chapter}", trail(ctx)?);

    // link to the next chapter through the parent node
    let next = ctx
        .node()
        .parent()
        .and_then(|parent| parent.children().ok())
        .and_then(|siblings| {
            siblings.into_iter().find(|s| {
                s.var()
                    .ok()
                    .and_then(|v| v.downcast_ref::<Chapter>())
                    .is_some_and(|c| c.number == chapter.number + 1)
            })
        });
    if let Some(next) = next {
        let _ = write!(page, "\nnext: {}", ctx.url_for(&next)?);
    }
    Ok(page)
}

/// `/sitemap.xml`: every enumerable page below the root.
pub fn sitemap_xml(ctx: &ViewContext, site_origin: &str) -> ViewTreeResult<String> {
    let root = ctx
        .node()
        .ancestors()
        .into_iter()
        .next()
        .unwrap_or_else(|| ctx.node().clone());
    let map = sitemap(&root, ctx.urls()?, usize::MAX)?;
    Ok(render_sitemap_xml(&map, site_origin))
}
