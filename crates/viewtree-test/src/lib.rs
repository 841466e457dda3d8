//! # viewtree-test
//!
//! Testing utilities for viewtree. Provides a test client that sends
//! simulated HTTP requests through an application's axum router without
//! binding a socket.
//!
//! ## Modules
//!
//! - [`client`] - [`TestClient`] and [`TestResponse`]

pub mod client;

pub use client::{TestClient, TestResponse};

use viewtree_core::Settings;
use viewtree_http::server::App;
use viewtree_http::URLConf;

/// Builds a [`TestClient`] serving `urls` with default settings.
pub fn client_for(urls: URLConf) -> TestClient {
    client_with_settings(urls, Settings::default())
}

/// Builds a [`TestClient`] serving `urls` with the given settings.
pub fn client_with_settings(urls: URLConf, settings: Settings) -> TestClient {
    TestClient::new(App::new(settings).urls(urls).into_axum_router())
}
