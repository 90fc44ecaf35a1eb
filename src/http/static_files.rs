//! Static file serving from the document root.
//!
//! Files are served by `ServeDir`, which infers the content type from the
//! extension, serves `index.html` for directory requests and redirects directory
//! paths missing their trailing slash. Requests it cannot satisfy fall through to
//! a handler that renders a listing for directories without an index and a 404
//! page for everything else. Paths with `..` segments never leave the root.

use std::path::{Component, Path, PathBuf};

use axum::handler::HandlerWithoutStateExt;
use axum::http::Uri;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Router};
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::middleware::RequestId;

/// Create a router serving `document_root`.
pub fn static_router(document_root: &Path) -> Router {
    let root = document_root.to_path_buf();
    let fallback = move |uri: Uri, request_id: Option<Extension<RequestId>>| {
        let root = root.clone();
        async move {
            let result = directory_listing(&root, &uri).await;
            if let Err(error) = &result {
                let request_id = request_id.map(|Extension(RequestId(id))| id.to_string());
                tracing::debug!(request_id = ?request_id, %error, "Nothing to serve");
            }
            result
        }
    };

    let serve_dir = ServeDir::new(document_root)
        .append_index_html_on_directories(true)
        .fallback(fallback.into_service());

    Router::new().fallback_service(serve_dir)
}

/// Render a listing if `uri` names a directory under `root`, otherwise 404.
async fn directory_listing(root: &Path, uri: &Uri) -> Result<Response, AppError> {
    let request_path = uri.path();
    let not_found = || AppError::NotFound(request_path.to_string());

    let relative = resolve_path(request_path).ok_or_else(not_found)?;
    let dir = root.join(relative);

    let is_dir = tokio::fs::metadata(&dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir || !request_path.ends_with('/') {
        return Err(not_found());
    }

    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(&dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        // Follow symlinks so linked directories list as directories
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push((name, is_dir));
    }
    entries.sort_by_key(|(name, _)| name.to_lowercase());

    let display_path = urlencoding::decode(request_path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| request_path.to_string());

    tracing::debug!(path = %display_path, entries = entries.len(), "Rendering directory listing");

    Ok(Html(render_listing(&display_path, &entries)).into_response())
}

/// Map a URI path to a path relative to the document root.
///
/// Returns `None` for anything that could escape the root: parent directory
/// segments, absolute paths or drive prefixes after percent-decoding.
fn resolve_path(request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path.trim_start_matches('/')).ok()?;

    let mut relative = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn render_listing(display_path: &str, entries: &[(String, bool)]) -> String {
    let title = format!("Directory listing for {}", escape_html(display_path));

    let mut items = String::new();
    for (name, is_dir) in entries {
        let suffix = if *is_dir { "/" } else { "" };
        items.push_str(&format!(
            "<li><a href=\"{}{}\">{}{}</a></li>\n",
            urlencoding::encode(name),
            suffix,
            escape_html(name),
            suffix
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body>
    <h1>{title}</h1>
    <hr>
    <ul>
{items}    </ul>
    <hr>
</body>
</html>
"#
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8_lossy(&body).into_owned())
    }

    /// `<tmp>/secret.txt` outside `<tmp>/web`, which holds an index and assets.
    fn site() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
        let root = dir.path().join("web");
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("index.html"), "OK").unwrap();
        std::fs::write(root.join("assets/style.css"), "body {}").unwrap();
        std::fs::write(root.join("assets/Beta.txt"), "b").unwrap();
        std::fs::write(root.join("assets/alpha <1>.txt"), "a").unwrap();
        std::fs::create_dir_all(root.join("assets/fonts")).unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_index_served_for_root() {
        let (_dir, root) = site();
        let (status, content_type, body) = get(static_router(&root), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
        assert!(content_type.unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_content_type_from_extension() {
        let (_dir, root) = site();
        let (status, content_type, body) =
            get(static_router(&root), "/assets/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body {}");
        assert!(content_type.unwrap().starts_with("text/css"));
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let (_dir, root) = site();
        let (status, _, body) = get(static_router(&root), "/nope.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Error 404"));
    }

    #[tokio::test]
    async fn test_parent_traversal_rejected() {
        let (_dir, root) = site();
        for uri in ["/../secret.txt", "/assets/../../secret.txt", "/%2e%2e/secret.txt"] {
            let (status, _, body) = get(static_router(&root), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert!(!body.contains("top secret"), "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let (_dir, root) = site();
        let (status, _, _) = get(static_router(&root), "/assets").await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let (_dir, root) = site();
        let (status, content_type, body) = get(static_router(&root), "/assets/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains("Directory listing for /assets/"));
        assert!(body.contains("<a href=\"fonts/\">fonts/</a>"));
        assert!(body.contains("<a href=\"alpha%20%3C1%3E.txt\">alpha &lt;1&gt;.txt</a>"));

        let alpha = body.find("alpha").unwrap();
        let beta = body.find("Beta.txt").unwrap();
        let style = body.find("style.css").unwrap();
        assert!(alpha < beta && beta < style);
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/"), Some(PathBuf::new()));
        assert_eq!(
            resolve_path("/a/./b%20c/"),
            Some(PathBuf::from("a").join("b c"))
        );
        assert_eq!(resolve_path("/a/../../etc"), None);
        assert_eq!(resolve_path("/%2E%2E/etc"), None);
        assert_eq!(resolve_path("//etc/passwd"), Some(PathBuf::from("etc/passwd")));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;"
        );
    }
}
