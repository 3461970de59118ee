//! Live reload: browser notification when a served page goes stale.
//!
//! ```text
//! watcher ──▶ PageRenderer::on_partial_file_changed ──▶ ReloadSink::full_reload("/weeks/one.html")
//!                                                              │
//!                                                  ReloadServer (WebSocket)
//!                                                              │
//!                                         {"type":"full-reload","path":"/weeks/one.html"}
//!                                                              ▼
//!                                              injected client compares location.pathname
//! ```

mod client;
mod server;

pub use client::inject_client;
pub use server::ReloadServer;

use serde::{Deserialize, Serialize};

/// Path that addresses every open page.
pub const ALL_PAGES: &str = "*";

/// Receiver of page reload instructions, keyed by URL path.
pub trait ReloadSink {
    fn full_reload(&self, path: &str);
}

/// Message sent over the live-reload WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    /// Sent once after the handshake
    Connected { version: String },
    /// Reload the page at `path` (or every page for `*`)
    FullReload { path: String },
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    pub fn full_reload(path: impl Into<String>) -> Self {
        Self::FullReload { path: path.into() }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_reload_json_shape() {
        let json = ReloadMessage::full_reload("/weeks/one.html").to_json();
        assert_eq!(json, r#"{"type":"full-reload","path":"/weeks/one.html"}"#);
    }

    #[test]
    fn test_connected_json_round_trip() {
        let json = ReloadMessage::connected().to_json();
        assert!(json.starts_with(r#"{"type":"connected","version":"#));

        let parsed: ReloadMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ReloadMessage::connected());
    }
}
