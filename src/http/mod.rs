//! HTTP(S) static file server.
//!
//! Serves the document root with the security headers browsers require before
//! exposing camera and microphone. Two transports:
//! - **TLS**: the provisioned self-signed certificate, served over HTTPS
//! - **Plain**: HTTP with additional anti-sniffing and anti-framing headers,
//!   used when no certificate is available or TLS setup fails
//!
//! The server runs until Ctrl+C (or SIGTERM on Unix).

mod headers;
mod server;
mod shutdown;
mod static_files;
mod tls;

pub use headers::{security_headers, TransportMode, COMMON_HEADERS};
pub use server::{bind, select_transport, serve, BoundServer, ServerError, Transport};
pub use shutdown::{setup_shutdown_handler, shutdown_on};
pub use tls::{install_crypto_provider, load_tls_config};

use std::path::Path;

use axum::{middleware, Router};

use crate::middleware::request_id_layer;

/// Creates the router for `document_root` with the security headers for `mode`.
pub fn create_router(document_root: &Path, mode: TransportMode) -> Router {
    let router = static_files::static_router(document_root);

    headers::with_security_headers(router, mode)
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
