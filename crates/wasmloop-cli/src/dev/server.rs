//! Static asset server.
//!
//! Serves the page, its scripts and the optimized module straight from disk,
//! plus the embedded reload client that talks to the WebSocket gateway.

use crate::error::{CliError, Result};
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Route of the embedded reload client.
pub const RELOAD_SCRIPT_PATH: &str = "/__wasmloop_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");
const WS_PORT_PLACEHOLDER: &str = "__WASMLOOP_WS_PORT__";

/// State shared by request handlers.
#[derive(Debug, Clone)]
pub struct AssetState {
    root: Arc<PathBuf>,
    ws_port: u16,
}

impl AssetState {
    pub fn new(root: PathBuf, ws_port: u16) -> Self {
        Self {
            root: Arc::new(root),
            ws_port,
        }
    }
}

/// HTTP server for the page and its assets.
pub struct AssetServer {
    addr: SocketAddr,
    state: AssetState,
}

impl AssetServer {
    /// # Arguments
    ///
    /// * `addr` - Address to listen on
    /// * `root` - Directory files are served from
    /// * `ws_port` - Gateway port baked into the reload client
    pub fn new(addr: SocketAddr, root: PathBuf, ws_port: u16) -> Self {
        Self {
            addr,
            state: AssetState::new(root, ws_port),
        }
    }

    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.addr)
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", self.addr, e)))
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router())
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback(handle_request)
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(self.state)
    }
}

async fn handle_reload_script(State(state): State<AssetState>) -> Response {
    let script = RELOAD_SCRIPT.replace(WS_PORT_PLACEHOLDER, &state.ws_port.to_string());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        script,
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "File not found",
    )
        .into_response()
}

/// Serve a file from the root, or redirect a directory to its index page.
async fn handle_request(State(state): State<AssetState>, uri: Uri) -> Response {
    let path = uri.path();
    let relative = path.trim_start_matches('/');

    // No escaping the served root
    if relative.split(['/', '\\']).any(|segment| segment == "..") {
        tracing::debug!(%path, "rejected path traversal");
        return not_found();
    }

    let file_path = state.root.join(relative);

    let metadata = match tokio::fs::metadata(&file_path).await {
        Ok(metadata) => metadata,
        Err(_) => return not_found(),
    };

    if metadata.is_dir() {
        let location = format!("{}/index.html", path.trim_end_matches('/'));
        return (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
    }

    let content = match tokio::fs::read(&file_path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(file = %file_path.display(), %e, "failed to read file");
            return not_found();
        }
    };

    let content = if is_html(&file_path) {
        inject_reload_script(&content)
    } else {
        content
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&file_path)),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        content,
    )
        .into_response()
}

fn is_html(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("html" | "htm")
    )
}

/// Add the reload client before the closing `</body>` tag.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}

/// Content type by extension. Unknown extensions are served as HTML.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "js" | "mjs" => "text/javascript",
        "wasm" => "application/wasm",
        "css" => "text/css",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "text/html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tempfile::TempDir;

    fn site() -> (TempDir, AssetState) {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("index.html"),
            "<html><body><canvas></canvas></body></html>",
        )
        .unwrap();
        std::fs::write(temp.path().join("runtime.js"), "console.log('hi');").unwrap();
        std::fs::create_dir(temp.path().join("bin")).unwrap();
        std::fs::write(temp.path().join("bin/app.wasm"), b"\0asm\x01\0\0\0").unwrap();

        let state = AssetState::new(temp.path().to_path_buf(), 8001);
        (temp, state)
    }

    async fn get_path(state: &AssetState, path: &str) -> Response {
        handle_request(State(state.clone()), path.parse::<Uri>().unwrap()).await
    }

    async fn body(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_serves_wasm_with_content_type() {
        let (_temp, state) = site();
        let response = get_path(&state, "/bin/app.wasm").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE), "application/wasm");
        assert_eq!(body(response).await, b"\0asm\x01\0\0\0");
    }

    #[tokio::test]
    async fn test_serves_js_unmodified() {
        let (_temp, state) = site();
        let response = get_path(&state, "/runtime.js").await;

        assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/javascript");
        assert_eq!(body(response).await, b"console.log('hi');");
    }

    #[tokio::test]
    async fn test_html_gets_reload_script() {
        let (_temp, state) = site();
        let response = get_path(&state, "/index.html").await;

        assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/html");
        let html = String::from_utf8(body(response).await).unwrap();
        let script = html.find(RELOAD_SCRIPT_PATH).unwrap();
        assert!(script < html.find("</body>").unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let (_temp, state) = site();
        let response = get_path(&state, "/nope.js").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(response).await, b"File not found");
    }

    #[tokio::test]
    async fn test_directory_redirects_to_index() {
        let (_temp, state) = site();

        let response = get_path(&state, "/").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(header_value(&response, header::LOCATION), "/index.html");

        let response = get_path(&state, "/bin").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(header_value(&response, header::LOCATION), "/bin/index.html");
    }

    #[tokio::test]
    async fn test_parent_segments_rejected() {
        let (temp, state) = site();
        std::fs::write(temp.path().join("bin/secret.txt"), "x").unwrap();
        let nested = AssetState::new(temp.path().join("bin"), 8001);

        assert_eq!(
            get_path(&nested, "/../index.html").await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_path(&state, "/bin/../index.html").await.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_reload_script_has_gateway_port() {
        let state = AssetState::new(PathBuf::from("."), 9123);
        let response = handle_reload_script(State(state)).await;

        assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/javascript");
        let script = String::from_utf8(body(response).await).unwrap();
        assert!(script.contains("'9123'"));
        assert!(!script.contains(WS_PORT_PLACEHOLDER));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.js")), "text/javascript");
        assert_eq!(content_type_for(Path::new("a.wasm")), "application/wasm");
        assert_eq!(content_type_for(Path::new("a.css")), "text/css");
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("README")), "text/html");
    }

    #[test]
    fn test_inject_without_body_appends() {
        let result = String::from_utf8(inject_reload_script(b"<h1>hi</h1>")).unwrap();
        assert!(result.starts_with("<h1>hi</h1>"));
        assert!(result.ends_with(r#"<script src="/__wasmloop_reload__.js"></script>"#));
    }
}
