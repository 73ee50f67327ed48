//! Reload Module
//!
//! Change detection and reload signaling between the build process and
//! running extension instances.
//!
//! # Architecture
//!
//! ```text
//! build emit -> VersionTracker -> classify -> SignalBroker -> agents
//!                  (diff)         (scope)     (broadcast)
//! ```
//!
//! # Modules
//!
//! - `version` - Per-chunk content version tracking across rebuilds
//! - `classify` - Reload-scope decision from the changed-chunk set
//! - `message` - Wire-level reload signals (full reload, tab reload)
//! - `broker` - Broker actor that broadcasts signals to connected agents
//! - `server` - TCP listener feeding agent connections to the broker

pub mod broker;
pub mod classify;
pub mod message;
pub mod server;
pub mod version;
