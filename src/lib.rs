//! webext-reload - selective hot-reload signaling for browser-extension builds.
//!
//! A rebuild of an extension bundle rarely needs a full reinstall. This crate
//! tracks per-chunk content hashes across rebuilds, classifies what changed
//! into a reload scope (whole extension vs. active tab), injects a watcher
//! script into the relevant build outputs, and broadcasts reload signals to
//! running extension instances over WebSocket.
//!
//! # Architecture
//!
//! ```text
//! build pipeline --[assets finalized]--> MiddlewareInjector
//!       |                                   (watcher ++ chunk.js)
//!       +--------[emit complete]-----> VersionTracker -> ChangeClassifier
//!                                            |
//!                                      SignalBroker --[FullReload/TabReload]--> agents
//! ```
//!
//! The host build tool surfaces exactly two lifecycle events through the
//! [`orchestrator::BuildHooks`] adapter; everything else is host-agnostic.

#[doc(hidden)]
pub mod logger;

pub mod agent;
pub mod config;
pub mod middleware;
pub mod orchestrator;
pub mod reload;

pub use config::{ConfigError, EntrySpec, ReloadOptions, RoleMap};
pub use middleware::{AssetMap, WatcherParams, build_watcher, inject};
pub use orchestrator::{BuildHooks, ReloadOrchestrator};
pub use reload::classify::{ChangeScope, classify};
pub use reload::message::ReloadSignal;
pub use reload::version::{ChunkRecord, ContentHash, VersionTracker};
