//! Demo application: a text input, a button echoing it back, and a ticker
//! driven by the background loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use brutal_wui_core::config::Config;
use brutal_wui_gateway::{BackgroundTask, Broadcaster, UiHandler, WebUi};

pub const DEMO_CSS: &str = r#"
body {
    display: flex;
    flex-direction: column;
    align-items: center;
    padding: 30px 20px;
}

body > * {
    width: 100%;
    height: 24px;
    max-width: 300px;
    margin-bottom: 10px;
    padding: 0;
    border: none;
    outline: none;
    box-sizing: border-box;
}

body > input {
    border: 1px solid black;
    padding: 0 3px;
}
"#;

fn demo_html(button_text: &str, ticker: u64) -> String {
    format!(
        r#"
<input id="inp_regular_txt" value="Updated value" />
<button onclick="_wuiEvent('btn_press', _wuiVal('#inp_regular_txt'))">{button_text}</button>
<div>Result: <span id="txt_result">Old value</span></div>
<div>Ticker: <span id="txt_ticker">{ticker}</span></div>
"#
    )
}

/// Shared counter bumped by the background task and shown on init.
#[derive(Clone, Default)]
pub struct Ticker(Arc<AtomicU64>);

impl Ticker {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

pub struct DemoApp {
    ticker: Ticker,
}

impl DemoApp {
    pub fn new(ticker: Ticker) -> Self {
        Self { ticker }
    }
}

#[async_trait]
impl UiHandler for DemoApp {
    async fn on_init(&self, ui: &Broadcaster) -> anyhow::Result<()> {
        ui.el_set_html(&["body"], demo_html("Press me!", self.ticker.get()));
        Ok(())
    }

    async fn on_event(&self, ui: &Broadcaster, event: &str, data: Value) -> anyhow::Result<()> {
        match event {
            "btn_press" => {
                let text = match data {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                ui.el_set_text(&["#txt_result"], text);
            }
            other => debug!(event = other, "Ignoring unknown event"),
        }
        Ok(())
    }
}

pub struct DemoTicker {
    ticker: Ticker,
}

impl DemoTicker {
    pub fn new(ticker: Ticker) -> Self {
        Self { ticker }
    }
}

#[async_trait]
impl BackgroundTask for DemoTicker {
    async fn tick(&self, ui: &Broadcaster) -> anyhow::Result<()> {
        let n = self.ticker.bump();
        ui.el_set_text(&["#txt_ticker"], n.to_string());
        Ok(())
    }
}

/// Wire the demo handlers into a server. Demo CSS is used unless the config
/// already provides some.
pub fn build(mut config: Config) -> WebUi {
    if config.page.base_css.is_empty() {
        config.page.base_css = DEMO_CSS.to_string();
    }
    let ticker = Ticker::default();
    WebUi::new(config)
        .with_handler(DemoApp::new(ticker.clone()))
        .with_background(DemoTicker::new(ticker))
}
