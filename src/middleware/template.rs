//! Watcher script generation.
//!
//! The runtime watcher is an embedded script rendered with typed
//! variables. Everything the watcher needs at runtime is baked in at
//! build time as serialized JSON literals with a fixed schema; nothing
//! is spliced ad hoc and nothing travels over the wire besides reload
//! signals. Output is deterministic for identical params.

use std::marker::PhantomData;

use serde::Serialize;

use crate::reload::message::ReloadSignal;

/// Fixed reconnection interval for the watcher's reconnect timer
pub const RECONNECT_INTERVAL_MS: u64 = 3000;

/// Socket error codes whose reconnect noise the watcher suppresses
pub const SOCKET_ERROR_CODES: [&str; 3] = ["ECONNREFUSED", "ECONNRESET", "ETIMEDOUT"];

/// Reference to the polyfill bundle for the extension messaging API
const POLYFILL_REF: &str = "webextension-polyfill";

/// Trait for template variable sets
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Template with typed variable injection
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

/// Config literal embedded in the generated watcher.
///
/// This is the fixed serialization schema shared with the script; the
/// field names are the schema, do not rename them casually.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherConfig {
    pub reconnect_interval_ms: u64,
    pub socket_error_codes: Vec<&'static str>,
    pub reload_page_enabled: bool,
}

/// Signal vocabulary literal, generated from the wire enum so the script
/// and the protocol cannot drift apart.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignalVocabulary {
    full_reload: &'static str,
    tab_reload: &'static str,
}

/// Variables for the watcher script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherParams {
    /// Broker port the watcher connects to
    pub port: u16,
    /// Whether TabReload signals are applied at all
    pub reload_page: bool,
}

impl TemplateVars for WatcherParams {
    fn apply(&self, content: &str) -> String {
        let config = WatcherConfig {
            reconnect_interval_ms: RECONNECT_INTERVAL_MS,
            socket_error_codes: SOCKET_ERROR_CODES.to_vec(),
            reload_page_enabled: self.reload_page,
        };
        let signals = SignalVocabulary {
            full_reload: ReloadSignal::FullReload.wire_tag(),
            tab_reload: ReloadSignal::TabReload.wire_tag(),
        };

        content
            .replace("__RELOAD_WS_HOST__", &format!("ws://localhost:{}", self.port))
            .replace("__RELOAD_CONFIG__", &to_literal(&config))
            .replace("__RELOAD_SIGNALS__", &to_literal(&signals))
            .replace("__RELOAD_POLYFILL__", POLYFILL_REF)
    }
}

/// Serialize an embedded literal. The types above cannot fail to
/// serialize; the fallback keeps the generated script syntactically valid
/// regardless.
fn to_literal<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// The embedded watcher script.
pub const WATCHER_JS: Template<WatcherParams> = Template::new(include_str!("watcher.js"));

/// Render the watcher script for one build session.
pub fn build_watcher(params: &WatcherParams) -> String {
    WATCHER_JS.render(params)
}
