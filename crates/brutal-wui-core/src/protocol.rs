//! BrutalWUI wire protocol.
//!
//! Every frame in either direction is a JSON object with exactly two keys:
//! `event` and `data`. Backend-to-browser frames use the closed [`Command`]
//! vocabulary; browser-to-backend frames carry application-defined event
//! names ([`InboundEvent`]).
//!
//! Delivery is fire-and-forget: there is no version field, no sequence
//! number and no acknowledgment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WuiError};

/// Per-selector payload. Keys are `querySelectorAll` selectors; matching
/// happens in the browser, so one entry may touch many elements.
pub type SelectorMap<T> = BTreeMap<String, T>;

/// A backend-to-browser command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Command {
    /// Set `document.title`.
    PgSetTitle(String),
    /// Evaluate a script in the page context.
    PgEval(String),
    /// Replace `innerHTML`.
    ElHtml(SelectorMap<String>),
    /// Replace `innerText`.
    ElText(SelectorMap<String>),
    /// Append to `innerText`.
    ElTextAppend(SelectorMap<String>),
    /// Set a form control's `value`.
    ElValue(SelectorMap<String>),
    /// Append to a form control's `value`.
    ElValueAppend(SelectorMap<String>),
    /// `setAttribute(name, value)`.
    ElSetAttr(SelectorMap<(String, String)>),
    /// `style[name] = value` (camelCase property names).
    ElSetStyle(SelectorMap<(String, String)>),
    /// `classList.add(name)`.
    ElClassAdd(SelectorMap<String>),
    /// `classList.remove(name)`.
    ElClassRemove(SelectorMap<String>),
    /// `disabled = true`. Values are always the empty string.
    ElDisable(SelectorMap<String>),
    /// `disabled = false`. Values are always the empty string.
    ElEnable(SelectorMap<String>),
}

/// Expand a selector list into one entry per selector, all sharing `value`.
fn fan_out<S: AsRef<str>, T: Clone>(selectors: &[S], value: T) -> SelectorMap<T> {
    selectors
        .iter()
        .map(|s| (s.as_ref().to_string(), value.clone()))
        .collect()
}

impl Command {
    pub fn set_title(content: impl Into<String>) -> Self {
        Self::PgSetTitle(content.into())
    }

    pub fn eval(script: impl Into<String>) -> Self {
        Self::PgEval(script.into())
    }

    pub fn html<S: AsRef<str>>(selectors: &[S], content: impl Into<String>) -> Self {
        Self::ElHtml(fan_out(selectors, content.into()))
    }

    pub fn text<S: AsRef<str>>(selectors: &[S], content: impl Into<String>) -> Self {
        Self::ElText(fan_out(selectors, content.into()))
    }

    pub fn text_append<S: AsRef<str>>(selectors: &[S], content: impl Into<String>) -> Self {
        Self::ElTextAppend(fan_out(selectors, content.into()))
    }

    pub fn value<S: AsRef<str>>(selectors: &[S], content: impl Into<String>) -> Self {
        Self::ElValue(fan_out(selectors, content.into()))
    }

    pub fn value_append<S: AsRef<str>>(selectors: &[S], content: impl Into<String>) -> Self {
        Self::ElValueAppend(fan_out(selectors, content.into()))
    }

    pub fn set_attr<S: AsRef<str>>(
        selectors: &[S],
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ElSetAttr(fan_out(selectors, (name.into(), value.into())))
    }

    pub fn set_style<S: AsRef<str>>(
        selectors: &[S],
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ElSetStyle(fan_out(selectors, (name.into(), value.into())))
    }

    pub fn class_add<S: AsRef<str>>(selectors: &[S], class: impl Into<String>) -> Self {
        Self::ElClassAdd(fan_out(selectors, class.into()))
    }

    pub fn class_remove<S: AsRef<str>>(selectors: &[S], class: impl Into<String>) -> Self {
        Self::ElClassRemove(fan_out(selectors, class.into()))
    }

    pub fn disable<S: AsRef<str>>(selectors: &[S]) -> Self {
        Self::ElDisable(fan_out(selectors, String::new()))
    }

    pub fn enable<S: AsRef<str>>(selectors: &[S]) -> Self {
        Self::ElEnable(fan_out(selectors, String::new()))
    }

    /// Wire name of this command, as sent in the `event` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PgSetTitle(_) => "pg_set_title",
            Self::PgEval(_) => "pg_eval",
            Self::ElHtml(_) => "el_html",
            Self::ElText(_) => "el_text",
            Self::ElTextAppend(_) => "el_text_append",
            Self::ElValue(_) => "el_value",
            Self::ElValueAppend(_) => "el_value_append",
            Self::ElSetAttr(_) => "el_set_attr",
            Self::ElSetStyle(_) => "el_set_style",
            Self::ElClassAdd(_) => "el_class_add",
            Self::ElClassRemove(_) => "el_class_remove",
            Self::ElDisable(_) => "el_disable",
            Self::ElEnable(_) => "el_enable",
        }
    }

    /// Serialize to a text frame.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A browser-to-backend event. `event` is chosen by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl InboundEvent {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Decode a text frame sent by `_wuiEvent`.
    ///
    /// A missing `data` key decodes as `null`; a missing or non-string
    /// `event` is a decode error.
    pub fn decode(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| WuiError::Decode(e.to_string()))
    }
}
