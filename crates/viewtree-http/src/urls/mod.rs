//! URL routing and resolution.
//!
//! - [`pattern`]: route compilation via [`path()`](pattern::path)
//! - [`converters`]: placeholder types (`str`, `path`)
//! - [`conf`]: the route table, forward resolution and route options
//! - [`reverse`]: URL generation from endpoint names
//!
//! # Examples
//!
//! ```
//! use viewtree_http::urls::conf::{RouteOptions, URLConf};
//! use viewtree_http::{HttpRequest, HttpResponse};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! let handler = Arc::new(|_req: HttpRequest| -> viewtree_http::BoxFuture {
//!     Box::pin(async { HttpResponse::ok("ok") })
//! });
//!
//! let mut conf = URLConf::new();
//! conf.register_route("/books/<book_id>", "books.book_id", handler, RouteOptions::default())
//!     .unwrap();
//!
//! let m = conf.resolve(&http::Method::GET, "/books/3").unwrap();
//! assert_eq!(m.kwargs["book_id"], "3");
//!
//! let mut kwargs = HashMap::new();
//! kwargs.insert("book_id".to_string(), "3".to_string());
//! assert_eq!(conf.reverse("books.book_id", &kwargs).unwrap(), "/books/3");
//! ```

pub mod conf;
pub mod converters;
pub mod pattern;
pub mod reverse;
