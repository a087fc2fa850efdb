//! Page, script and stylesheet rendering.

use askama::Template;
use rust_embed::Embed;

use brutal_wui_core::config::PageConfig;
use brutal_wui_core::error::{Result, WuiError};

#[derive(Embed)]
#[folder = "ui/"]
struct UiAssets;

#[derive(Template)]
#[template(path = "page.html")]
struct PageTemplate<'a> {
    title: &'a str,
    lang: &'a str,
    encoding: &'a str,
    viewport: &'a str,
    inject_font: bool,
}

/// Render the page scaffold served at `/`. The body starts empty; the init
/// callback is expected to paint it.
pub fn render_page(page: &PageConfig) -> Result<String> {
    PageTemplate {
        title: &page.title,
        lang: &page.lang,
        encoding: &page.encoding,
        viewport: &page.viewport,
        inject_font: page.font_enabled(),
    }
    .render()
    .map_err(|e| WuiError::Render(e.to_string()))
}

fn embedded_text(path: &str) -> String {
    UiAssets::get(path)
        .map(|f| String::from_utf8_lossy(&f.data).into_owned())
        .unwrap_or_default()
}

/// The bundled client script with flags applied, followed by developer JS.
pub fn render_script(page: &PageConfig, debug: bool, extra_js: Option<&str>) -> String {
    let mut script = embedded_text("script.js");

    if debug {
        script = script.replace("var DEBUG = false;", "var DEBUG = true;");
    }
    if page.websocket_tls {
        script = script.replace("ws://", "wss://");
    }

    let mut out = format!("{script}\n\n{}", page.base_js);
    if let Some(js) = extra_js {
        out.push('\n');
        out.push_str(js);
    }
    out
}

/// normalize.css (when enabled) followed by developer CSS.
pub fn render_stylesheet(page: &PageConfig, extra_css: Option<&str>) -> String {
    let mut out = String::new();
    if page.inject_normalize_css {
        out.push_str(&embedded_text("normalize.css"));
        out.push_str("\n\n");
    }
    out.push_str(&page.base_css);
    if let Some(css) = extra_css {
        out.push('\n');
        out.push_str(css);
    }
    out
}

/// Bundled favicon bytes.
pub fn favicon() -> Option<Vec<u8>> {
    UiAssets::get("favicon.ico").map(|f| f.data.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_page_fields() {
        let page = PageConfig {
            title: "MyApp".into(),
            lang: "de".into(),
            ..PageConfig::default()
        };
        let html = render_page(&page).unwrap();
        assert!(html.contains("<title>MyApp</title>"));
        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains(r#"<meta charset="UTF-8" />"#));
        assert!(html.contains(r#"<script src="/script.js"></script>"#));
        assert!(html.contains("<body></body>"));
    }

    #[test]
    fn test_render_page_escapes_title() {
        let page = PageConfig {
            title: "<b>x</b>".into(),
            ..PageConfig::default()
        };
        let html = render_page(&page).unwrap();
        assert!(!html.contains("<b>x</b>"));
    }

    #[test]
    fn test_font_face_only_with_font() {
        let mut page = PageConfig::default();
        assert!(!render_page(&page).unwrap().contains("@font-face"));
        page.font_path = Some("font.ttf".into());
        assert!(!render_page(&page).unwrap().contains("@font-face"));
        page.inject_font = true;
        assert!(render_page(&page).unwrap().contains("@font-face"));
    }

    #[test]
    fn test_script_flags() {
        let page = PageConfig::default();
        let plain = render_script(&page, false, None);
        assert!(plain.contains("var DEBUG = false;"));
        assert!(plain.contains(r#"new WebSocket("ws://""#));
        assert!(plain.contains("window._wuiEvent"));
        assert!(plain.contains("window._wuiVal"));
        assert!(plain.contains("window._wuiChecked"));
        assert!(plain.contains("window._wuiSelected"));

        let tls = PageConfig {
            websocket_tls: true,
            ..PageConfig::default()
        };
        let script = render_script(&tls, true, None);
        assert!(script.contains("var DEBUG = true;"));
        assert!(script.contains(r#"new WebSocket("wss://""#));
    }

    #[test]
    fn test_script_appends_developer_js_last() {
        let page = PageConfig {
            base_js: "console.log('base');".into(),
            ..PageConfig::default()
        };
        let script = render_script(&page, false, Some("console.log('file');"));
        let builtin = script.find("window._wuiEvent").unwrap();
        let base = script.find("console.log('base');").unwrap();
        let file = script.find("console.log('file');").unwrap();
        assert!(builtin < base && base < file);
    }

    #[test]
    fn test_stylesheet_normalize_toggle() {
        let page = PageConfig {
            base_css: "body { color: red; }".into(),
            ..PageConfig::default()
        };
        let css = render_stylesheet(&page, None);
        assert!(css.starts_with("/*! normalize.css"));
        assert!(css.ends_with("body { color: red; }"));

        let bare = PageConfig {
            inject_normalize_css: false,
            ..page
        };
        assert_eq!(render_stylesheet(&bare, None), "body { color: red; }");
    }

    #[test]
    fn test_favicon_is_ico() {
        let bytes = favicon().unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 1, 0]);
    }
}
