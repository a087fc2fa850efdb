//! Page scaffold and embedded browser assets.
//!
//! Uses `rust-embed` to bake the `ui/` directory (client script,
//! normalize.css, favicon) into the binary and `askama` for the page
//! scaffold. In debug mode (`debug-embed` feature), files are read from
//! disk so you can edit the client script and just refresh the browser.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::warn;

use brutal_wui_core::config::PageConfig;

mod render;

pub use render::{favicon, render_page, render_script, render_stylesheet};

struct PageState {
    page: PageConfig,
    debug: bool,
}

/// Build an axum `Router` serving `/`, `/style.css`, `/script.js` and, when
/// enabled, `/favicon.ico` and `/font.ttf`.
pub fn ui_router(page: PageConfig, debug: bool) -> Router {
    let inject_favicon = page.inject_favicon;
    let font_enabled = page.font_enabled();
    let state = Arc::new(PageState { page, debug });

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/style.css", get(css_handler))
        .route("/script.js", get(js_handler));

    if inject_favicon {
        router = router.route("/favicon.ico", get(favicon_handler));
    }
    if font_enabled {
        router = router.route("/font.ttf", get(font_handler));
    }

    router.with_state(state)
}

/// Read an optional developer file; a read failure is logged and skipped.
async fn read_optional(path: Option<&str>) -> Option<String> {
    let path = path?;
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!(path, %e, "Failed to read page asset");
            None
        }
    }
}

async fn index_handler(State(state): State<Arc<PageState>>) -> Response {
    match render_page(&state.page) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(%e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn css_handler(State(state): State<Arc<PageState>>) -> impl IntoResponse {
    let extra = read_optional(state.page.css_path.as_deref()).await;
    (
        [(header::CONTENT_TYPE, "text/css")],
        render_stylesheet(&state.page, extra.as_deref()),
    )
}

async fn js_handler(State(state): State<Arc<PageState>>) -> impl IntoResponse {
    let extra = read_optional(state.page.js_path.as_deref()).await;
    (
        [(header::CONTENT_TYPE, "text/javascript")],
        render_script(&state.page, state.debug, extra.as_deref()),
    )
}

async fn favicon_handler() -> Response {
    match favicon() {
        Some(bytes) => {
            let mime = mime_guess::from_path("favicon.ico").first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                bytes,
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn font_handler(State(state): State<Arc<PageState>>) -> Response {
    let Some(path) = state.page.font_path.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match tokio::fs::read(path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "font/ttf")], bytes).into_response(),
        Err(e) => {
            warn!(path, %e, "Failed to read font");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
