//! The catalog's view tree.
//!
//! ```text
//! /                                   index
//! /about                              about
//! /sitemap.xml                        sitemap_xml
//! /latest                      ->     /books/<latest id>
//! /books                              book_list
//! /books/<book_id>                    book_detail
//! /books/<book_id>/first       ->     /books/<book_id>/chapters/1
//! /books/<book_id>/chapters           chapter_list
//! /books/<book_id>/chapters/<chapter> chapter_detail
//! ```

use std::sync::Arc;

use viewtree::core::{ConversionError, ConversionErrorKind, Settings, ViewTreeError, ViewTreeResult};
use viewtree::http::{HttpResponse, URLConf};
use viewtree::tree::decorators::require_get;
use viewtree::tree::prelude::*;

use crate::library::{Book, Library};
use crate::settings::catalog_title;
use crate::views;

/// Wraps a view that renders text, mapping its errors onto responses.
fn page<F>(debug: bool, render: F) -> ViewFn
where
    F: Fn(&ViewContext) -> ViewTreeResult<String> + Send + Sync + 'static,
{
    typed_page(debug, "text/html", render)
}

/// Like [`page`], served with `content_type`.
fn typed_page<F>(debug: bool, content_type: &'static str, render: F) -> ViewFn
where
    F: Fn(&ViewContext) -> ViewTreeResult<String> + Send + Sync + 'static,
{
    let render = Arc::new(render);
    view_fn(move |ctx: ViewContext| {
        let render = Arc::clone(&render);
        async move {
            match render(&ctx) {
                Ok(body) => {
                    let mut response = HttpResponse::ok(body);
                    response.set_content_type(content_type);
                    response
                }
                Err(e) => {
                    tracing::warn!(path = %ctx.request().path(), error = %e, "view failed");
                    HttpResponse::from_error(&e, debug)
                }
            }
        }
    })
}

/// Looks up a book by its raw id.
fn book_converter(library: Arc<Library>) -> Converter {
    Converter::from_fn(move |raw| {
        let id = raw
            .parse::<i64>()
            .map_err(|e| ConversionError::invalid(format!("{raw:?} is not a book id: {e}")))?;
        library
            .book(id)
            .cloned()
            .map(ParamValue::reversible)
            .ok_or_else(|| ConversionError::not_found(format!("no book with id {id}")))
    })
}

/// Looks up a chapter by number within the already-converted book.
fn chapter_converter() -> Converter {
    Converter::dependent(["book_id"], |args: &ParamArgs| {
        let book = args.value::<Book>("book_id")?;
        let raw = args.raw("chapter").unwrap_or_default();
        let number = raw
            .parse::<usize>()
            .map_err(|e| ConversionError::invalid(format!("{raw:?} is not a chapter number: {e}")))?;
        book.chapter(number)
            .map(ParamValue::reversible)
            .ok_or_else(|| ConversionError::not_found(format!("{book} has no chapter {number}")))
    })
}

fn not_found(what: &'static str) -> impl Fn(&ConversionError, &str) -> HttpResponse + Send + Sync + 'static {
    move |err, raw| {
        tracing::info!(raw, reason = %err, "unknown {}", what);
        HttpResponse::not_found(format!("No {what} {raw:?}"))
    }
}

/// The declared catalog: its route table and the root of its tree.
#[derive(Debug)]
pub struct Site {
    pub urls: URLConf,
    pub root: Arc<DefinitionNode>,
}

impl Site {
    /// Returns the request node for `path`, descending one segment at a time.
    pub fn node_at(&self, path: &str) -> ViewTreeResult<RequestNode> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(RequestNode::new(Arc::clone(&self.root), RawValues::new()), |node, segment| {
                node.descend(segment)
            })
    }
}

/// Declares the catalog tree and registers its routes.
pub fn catalog_urls(library: Arc<Library>, settings: &Settings) -> ViewTreeResult<Site> {
    let debug = settings.debug;
    let title = catalog_title(settings);
    let origin = settings.site_origin().to_string();
    let mut urls = URLConf::new();

    let index = declare_index(
        &mut urls,
        Index::new(page(debug, move |ctx| views::index(ctx, &title)))
            .decorator(require_get())
            .config(TreeConfig::from_settings(settings)),
    )?;
    index.declare_static_child(&mut urls, StaticChild::new("about", page(debug, views::about)).display("About"))?;
    index.declare_static_child(
        &mut urls,
        StaticChild::new(
            "sitemap.xml",
            typed_page(debug, "application/xml", move |ctx| views::sitemap_xml(ctx, &origin)),
        )
        .endpoint("sitemap"),
    )?;

    let books = index.declare_static_child(
        &mut urls,
        StaticChild::new("books", page(debug, views::book_list)).display("Books"),
    )?;
    let book_library = Arc::clone(&library);
    let book = books.declare_dynamic_child(
        &mut urls,
        DynamicChild::new("book_id", page(debug, views::book_detail))
            .converter(book_converter(Arc::clone(&library)))
            .iterable(Iterable::from_fn(move |_args| {
                Ok(book_library.books().iter().cloned().map(ParamValue::reversible).collect())
            })),
    )?;
    books.declare_failure_handler(
        [ConversionErrorKind::Invalid, ConversionErrorKind::NotFound],
        not_found("book"),
    )?;

    let chapters = book.declare_static_child(
        &mut urls,
        StaticChild::new("chapters", page(debug, views::chapter_list)).display("Chapters"),
    )?;
    chapters.declare_dynamic_child(
        &mut urls,
        DynamicChild::new("chapter", page(debug, views::chapter_detail))
            .converter(chapter_converter())
            .iterable(Iterable::from_fn(|args: &ParamArgs| {
                let book = args.value::<Book>("book_id").map_err(|source| ViewTreeError::Conversion {
                    param: "book_id".into(),
                    source,
                })?;
                Ok(book.all_chapters().into_iter().map(ParamValue::reversible).collect())
            })),
    )?;
    chapters.declare_failure_handler(
        [ConversionErrorKind::Invalid, ConversionErrorKind::NotFound],
        not_found("chapter"),
    )?;

    book.declare_redirect(
        &mut urls,
        RedirectChild::new("first", redirect_fn(|_raw| Ok(vec!["chapters".into(), "1".into()]))),
    )?;
    index.declare_redirect(
        &mut urls,
        RedirectChild::new(
            "latest",
            redirect_fn(move |_raw| {
                let latest = library
                    .latest()
                    .cloned()
                    .ok_or_else(|| ViewTreeError::NotFound("the catalog is empty".into()))?;
                Ok(vec!["books".into(), ParamValue::reversible(latest).into()])
            }),
        ),
    )?;

    tracing::debug!(routes = urls.len(), "declared catalog tree");
    Ok(Site { urls, root: index })
}

#[cfg(test)]
mod tests {
    use viewtree_test::{client_for, client_with_settings};

    use super::*;

    fn site() -> Site {
        catalog_urls(Arc::new(Library::with_sample_data()), &Settings::default()).unwrap()
    }

    fn urls() -> URLConf {
        site().urls
    }

    #[test]
    fn test_tree_shape() {
        let urls = urls();
        // 7 pages, 2 redirects with a subtree route each
        assert_eq!(urls.len(), 11);
        assert!(urls.find("books.book_id.chapters.chapter").is_some());
        assert!(urls.find("latest:subtree").is_some());
        assert!(urls.find("sitemap").is_some());
    }

    #[test]
    fn test_node_at() {
        let site = site();
        let node = site.node_at("/books/2/chapters/1").unwrap();
        assert_eq!(node.url(&site.urls).unwrap(), "/books/2/chapters/1");
        assert_eq!(node.to_string(), "1. Systems Programmers Can Have Nice Things");
        assert_eq!(node.ancestors().len(), 4);
        assert!(site.node_at("/nowhere").is_err());
        assert!(Arc::ptr_eq(site.node_at("/").unwrap().definition(), &site.root));
    }

    #[tokio::test]
    async fn test_pages() {
        let mut client = client_for(urls());

        let response = client.get("/").await;
        assert_eq!(response.status_code(), 200);
        assert!(response.contains("- Books (/books)"));
        assert!(!response.contains("latest"));

        let response = client.get("/books").await;
        assert!(response.contains("- Rust for Rustaceans (/books/3)"));

        let response = client.get("/books/1").await;
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert!(response.contains("/ > Books > The Rust Programming Language"));
        assert!(response.contains("4 chapters"));

        let response = client.get("/books/1/chapters/2").await;
        assert!(response.contains("chapter 2. Ownership"));
        assert!(response.contains("next: /books/1/chapters/3"));
    }

    #[tokio::test]
    async fn test_unknown_parameters_are_not_found() {
        let mut client = client_for(urls());

        let response = client.get("/books/42").await;
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.text(), "No book \"42\"");

        let response = client.get("/books/one").await;
        assert_eq!(response.status_code(), 404);

        let response = client.get("/books/2/chapters/9").await;
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.text(), "No chapter \"9\"");
    }

    #[tokio::test]
    async fn test_redirects() {
        let mut client = client_for(urls());

        let response = client.get("/latest").await;
        assert_eq!(response.status_code(), 302);
        assert_eq!(response.location(), Some("/books/3"));

        let response = client.get("/latest/chapters").await;
        assert_eq!(response.location(), Some("/books/3/chapters"));

        let response = client.get("/books/2/first").await;
        assert_eq!(response.location(), Some("/books/2/chapters/1"));
    }

    #[tokio::test]
    async fn test_only_get() {
        let mut client = client_for(urls());
        assert_eq!(client.post("/books", "").await.status_code(), 405);
    }

    #[tokio::test]
    async fn test_sitemap() {
        let settings = Settings {
            site_url: "https://books.example/".into(),
            ..Settings::default()
        };
        let site = catalog_urls(Arc::new(Library::with_sample_data()), &settings).unwrap();
        let mut client = client_with_settings(site.urls, settings);

        let response = client.get("/sitemap.xml").await;
        assert_eq!(response.header("content-type"), Some("application/xml; charset=utf-8"));
        let xml = response.text();
        assert!(xml.contains("<loc>https://books.example/books/2/chapters/2</loc>"));
        assert!(xml.contains("<loc>https://books.example/about</loc>"));
        assert!(!xml.contains("latest"));
        assert!(!xml.contains("first"));
    }
}
