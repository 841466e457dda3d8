//! HTTP test client for viewtree.
//!
//! This module provides [`TestClient`] for making simulated HTTP requests
//! against an axum application, and [`TestResponse`] for inspecting the
//! results. Redirects are never followed; inspect [`TestResponse::location`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use viewtree_test::client::TestClient;
//! use axum::Router;
//! use axum::routing::get;
//!
//! async fn example() {
//!     let app = Router::new().route("/hello", get(|| async { "Hello, World!" }));
//!     let mut client = TestClient::new(app);
//!
//!     let response = client.get("/hello").await;
//!     assert_eq!(response.status_code(), 200);
//!     assert_eq!(response.text(), "Hello, World!");
//! }
//! ```

use axum::Router;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// A test client for making simulated HTTP requests against an axum application.
///
/// Headers set with [`TestClient::set_header`] are sent with every request.
pub struct TestClient {
    app: Router,
    headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a new test client wrapping the given axum router.
    pub const fn new(app: Router) -> Self {
        Self {
            app,
            headers: Vec::new(),
        }
    }

    /// Sends a GET request to the given path.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.request(Method::GET, path, Vec::new()).await
    }

    /// Sends a HEAD request to the given path.
    pub async fn head(&mut self, path: &str) -> TestResponse {
        self.request(Method::HEAD, path, Vec::new()).await
    }

    /// Sends a POST request with a raw body.
    pub async fn post(&mut self, path: &str, body: impl Into<Vec<u8>>) -> TestResponse {
        self.request(Method::POST, path, body.into()).await
    }

    /// Sends a DELETE request to the given path.
    pub async fn delete(&mut self, path: &str) -> TestResponse {
        self.request(Method::DELETE, path, Vec::new()).await
    }

    /// Sets a header that will be included in subsequent requests.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Clears all default headers.
    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    /// Sends a request with the given method and body.
    pub async fn request(&mut self, method: Method, path: &str, body: Vec<u8>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let req = builder
            .body(axum::body::Body::from(body))
            .expect("request builder should not fail");

        self.send(req).await
    }

    /// Sends the request through the axum router and builds a `TestResponse`.
    async fn send(&self, req: Request<axum::body::Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body: body_bytes.to_vec(),
        }
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// The response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The response body as raw bytes.
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Returns the response body as a UTF-8 string.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Deserializes the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the value of a header by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the `Location` header of a redirect response.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    /// Returns `true` if the response is a 3xx redirect.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Returns `true` if the response body contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.text().contains(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{delete, get, post};

    fn test_app() -> Router {
        Router::new()
            .route("/hello", get(|| async { "Hello, World!" }))
            .route(
                "/json",
                get(|| async { axum::Json(serde_json::json!({"key": "value"})) }),
            )
            .route("/echo", post(|body: String| async move { body }))
            .route("/gone", delete(|| async { "deleted" }))
            .route(
                "/header",
                get(|headers: HeaderMap| async move {
                    headers
                        .get("x-token")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("none")
                        .to_string()
                }),
            )
            .route(
                "/moved",
                get(|| async { (StatusCode::FOUND, [(http::header::LOCATION, "/hello")], "") }),
            )
    }

    #[tokio::test]
    async fn test_get_simple() {
        let mut client = TestClient::new(test_app());
        let response = client.get("/hello").await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.text(), "Hello, World!");
        assert!(response.contains("World"));
    }

    #[tokio::test]
    async fn test_get_json() {
        let mut client = TestClient::new(test_app());
        let response = client.get("/json").await;
        let json: serde_json::Value = response.json().unwrap();
        assert_eq!(json["key"], "value");
    }

    #[tokio::test]
    async fn test_post_and_delete() {
        let mut client = TestClient::new(test_app());
        assert_eq!(client.post("/echo", "payload").await.text(), "payload");
        assert_eq!(client.delete("/gone").await.text(), "deleted");
    }

    #[tokio::test]
    async fn test_default_headers() {
        let mut client = TestClient::new(test_app());
        assert_eq!(client.get("/header").await.text(), "none");

        client.set_header("X-Token", "a");
        client.set_header("x-token", "b");
        assert_eq!(client.get("/header").await.text(), "b");

        client.clear_headers();
        assert_eq!(client.get("/header").await.text(), "none");
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let mut client = TestClient::new(test_app());
        let response = client.get("/moved").await;
        assert_eq!(response.status_code(), 302);
        assert!(response.is_redirect());
        assert_eq!(response.location(), Some("/hello"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let mut client = TestClient::new(test_app());
        assert_eq!(client.get("/missing").await.status_code(), 404);
    }
}
