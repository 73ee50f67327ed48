//! Middleware Module
//!
//! Build-time generation of the watcher script and its injection into
//! the extension's script assets.
//!
//! # Modules
//!
//! - `template` - Typed rendering of the embedded watcher script
//! - `injector` - Concatenation of the watcher onto role-matching assets

mod injector;
mod template;

pub use injector::{AssetMap, inject};
pub use template::{
    RECONNECT_INTERVAL_MS, SOCKET_ERROR_CODES, WatcherConfig, WatcherParams, build_watcher,
};
