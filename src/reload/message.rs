//! Reload Signal Protocol
//!
//! Defines the JSON message format sent over WebSocket from the build
//! process to injected watcher agents.
//!
//! The vocabulary is deliberately tiny: `full_reload` and `tab_reload`
//! are the only server-to-agent messages, and the protocol has no
//! agent-to-server application messages at all (the connection itself is
//! the only signal the server needs from an agent). Configuration such as
//! the reconnect interval never travels over the wire; it is baked into
//! the generated watcher script at build time.

use serde::{Deserialize, Serialize};

use super::classify::ChangeScope;

/// Wire-level reload instruction sent to a running agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadSignal {
    /// Reload the entire extension runtime (background plus all
    /// content-script contexts)
    FullReload,
    /// Reload only the currently active page/tab
    TabReload,
}

impl ReloadSignal {
    /// Wire counterpart of a reload scope. `ChangeScope::None` never
    /// produces a signal.
    pub fn from_scope(scope: ChangeScope) -> Option<Self> {
        match scope {
            ChangeScope::None => None,
            ChangeScope::BackgroundOrContent => Some(Self::FullReload),
            ChangeScope::PageOnly => Some(Self::TabReload),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|_| r#"{"type":"full_reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }

    /// The `type` tag as it appears on the wire.
    pub const fn wire_tag(self) -> &'static str {
        match self {
            Self::FullReload => "full_reload",
            Self::TabReload => "tab_reload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_serialization_round_trip() {
        let json = ReloadSignal::FullReload.to_json();
        assert_eq!(json, r#"{"type":"full_reload"}"#);
        assert_eq!(ReloadSignal::from_json(&json), Some(ReloadSignal::FullReload));

        let json = ReloadSignal::TabReload.to_json();
        assert_eq!(json, r#"{"type":"tab_reload"}"#);
        assert_eq!(ReloadSignal::from_json(&json), Some(ReloadSignal::TabReload));
    }

    #[test]
    fn scope_to_signal_mapping() {
        assert_eq!(ReloadSignal::from_scope(ChangeScope::None), None);
        assert_eq!(
            ReloadSignal::from_scope(ChangeScope::BackgroundOrContent),
            Some(ReloadSignal::FullReload)
        );
        assert_eq!(
            ReloadSignal::from_scope(ChangeScope::PageOnly),
            Some(ReloadSignal::TabReload)
        );
    }

    #[test]
    fn unknown_message_is_rejected() {
        assert_eq!(ReloadSignal::from_json(r#"{"type":"restart"}"#), None);
        assert_eq!(ReloadSignal::from_json("not json"), None);
    }
}
