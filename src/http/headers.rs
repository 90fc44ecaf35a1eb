//! Security headers attached to every response.
//!
//! Browsers only expose camera and microphone to cross-origin isolated pages with
//! an explicit permissions policy. Plain HTTP responses additionally forbid
//! content sniffing and framing.

use axum::Router;
use http::header::{HeaderName, HeaderValue, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use tower_http::set_header::SetResponseHeaderLayer;

/// Transport a router is served over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Tls,
    Plain,
}

impl TransportMode {
    pub fn scheme(&self) -> &'static str {
        match self {
            TransportMode::Tls => "https",
            TransportMode::Plain => "http",
        }
    }
}

/// Headers sent in both modes
pub const COMMON_HEADERS: &[(&str, &str)] = &[
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
    ("permissions-policy", "camera=*, microphone=*"),
];

/// The headers for `mode`, in the order they are applied.
pub fn security_headers(mode: TransportMode) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers: Vec<(HeaderName, HeaderValue)> = COMMON_HEADERS
        .iter()
        .map(|&(name, value)| {
            (
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect();

    if mode == TransportMode::Plain {
        headers.push((X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")));
        headers.push((X_FRAME_OPTIONS, HeaderValue::from_static("DENY")));
    }

    headers
}

/// Layer the security headers for `mode` onto `router`, overriding any value a
/// handler set.
pub fn with_security_headers(router: Router, mode: TransportMode) -> Router {
    security_headers(mode)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name, value))
        })
}
