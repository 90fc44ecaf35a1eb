//! Request correlation.
//!
//! Every request gets a UUID v4. It names the tracing span the request is
//! served in, is stored in the request extensions for handlers that log, and is
//! echoed back to the browser in `x-request-id` so a failing asset load in the
//! devtools network tab can be matched to the server log.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Request id, read by handlers from request extensions.
#[derive(Clone, Copy, Debug)]
pub struct RequestId(pub Uuid);

/// Assign a request id, serve the request inside its span and log the outcome.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(RequestId(request_id));

    async move {
        let start = Instant::now();
        let mut response = next.run(request).await;

        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Served"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{create_router, TransportMode};
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn request_id(app: axum::Router, uri: &str) -> Uuid {
        let req = HttpRequest::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let header = resp.headers().get(REQUEST_ID_HEADER).unwrap();
        Uuid::parse_str(header.to_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_header_on_served_and_missing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "OK").unwrap();
        let app = create_router(dir.path(), TransportMode::Plain);

        let served = request_id(app.clone(), "/").await;
        let missing = request_id(app, "/missing.js").await;
        assert_ne!(served, missing);
    }
}
