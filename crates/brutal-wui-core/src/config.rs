//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Top-level BrutalWUI configuration.
///
/// Supplied once at startup; there is no runtime reconfiguration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub background: BackgroundConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Enables browser-side console logging in the served script.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    7865
}

/// Page scaffold and static asset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// `lang` attribute of the `<html>` tag.
    #[serde(default = "default_lang")]
    pub lang: String,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default = "default_viewport")]
    pub viewport: String,

    /// CSS appended to `/style.css`.
    #[serde(default)]
    pub base_css: String,

    /// JavaScript appended to `/script.js`, after the `_wui*` globals.
    #[serde(default)]
    pub base_js: String,

    /// CSS file re-read on every `/style.css` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css_path: Option<String>,

    /// JavaScript file re-read on every `/script.js` request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js_path: Option<String>,

    #[serde(default = "default_true")]
    pub inject_favicon: bool,

    #[serde(default = "default_true")]
    pub inject_normalize_css: bool,

    /// Serve `font_path` at `/font.ttf` and use it as the page font.
    /// No font is bundled, so this needs `font_path` too.
    #[serde(default)]
    pub inject_font: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<String>,

    /// Connect with `wss://` instead of `ws://` (when behind a TLS proxy).
    #[serde(default)]
    pub websocket_tls: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            lang: default_lang(),
            encoding: default_encoding(),
            viewport: default_viewport(),
            base_css: String::new(),
            base_js: String::new(),
            css_path: None,
            js_path: None,
            inject_favicon: true,
            inject_normalize_css: true,
            inject_font: false,
            font_path: None,
            websocket_tls: false,
        }
    }
}

impl PageConfig {
    /// Whether the font route and `@font-face` rule are active.
    pub fn font_enabled(&self) -> bool {
        self.inject_font && self.font_path.is_some()
    }
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    "BrutalWUI".into()
}

fn default_lang() -> String {
    "en".into()
}

fn default_encoding() -> String {
    "UTF-8".into()
}

fn default_viewport() -> String {
    "width=device-width, initial-scale=1.0".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// Delay between background callback invocations, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "brutal_wui_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> crate::error::Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| crate::error::WuiError::Config(e.to_string()))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| match std::env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                warn!(var = &caps[1], "Environment variable not set, substituting empty string");
                String::new()
            }
        })
        .into_owned())
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "Loading config");
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse config text (JSON5).
    pub fn parse(raw: &str) -> crate::error::Result<Self> {
        let substituted = substitute_env_vars(raw)?;
        json5::from_str(&substituted).map_err(|e| crate::error::WuiError::Config(e.to_string()))
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_millis(self.background.interval_ms)
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("Server port cannot be 0".to_string());
        }

        if self.background.interval_ms == 0 {
            errors.push("Background interval cannot be 0".to_string());
        }

        let page = &self.page;
        for (label, path) in [
            ("Font", &page.font_path),
            ("CSS", &page.css_path),
            ("JS", &page.js_path),
        ] {
            if let Some(p) = path {
                if !Path::new(p).exists() {
                    errors.push(format!("{label} file not found: {p}"));
                }
            }
        }

        if page.inject_font && page.font_path.is_none() {
            warnings.push("inject_font is set but no font_path is configured".to_string());
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for BrutalWUI data: `~/.brutal_wui/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".brutal_wui")
}
