//! Reload Orchestrator
//!
//! Thin glue wiring the core to the host's two build-lifecycle events.
//! Hosts adapt whatever hook API their bundler version exposes to the
//! [`BuildHooks`] seam; the tracker, classifier, injector and broker
//! stay host-agnostic behind it.
//!
//! Role resolution, watcher generation and broker startup all happen in
//! [`ReloadOrchestrator::new`], before any build activity, so every
//! configuration problem is fatal up front rather than a silent no-op
//! session.

use anyhow::Result;

use crate::config::{ReloadOptions, RoleMap};
use crate::middleware::{AssetMap, WatcherParams, build_watcher, inject};
use crate::reload::broker::SignalBroker;
use crate::reload::classify::{ChangeScope, classify};
use crate::reload::version::{ChunkRecord, VersionTracker};

/// The two build-lifecycle events a host must surface.
///
/// "Assets finalized" fires while the asset map is still mutable, before
/// the final output is written; "emit complete" fires after, and the
/// host must await it before reporting its own emit phase as done. That
/// coupling is deliberate: a broadcast failure becomes a build failure.
#[allow(async_fn_in_trait)] // hosts drive this from their own runtime
pub trait BuildHooks {
    /// Inject the watcher into this build's assets. Returns only the
    /// modified paths; the host merges them over its asset map.
    fn assets_finalized(&self, assets: &AssetMap, chunks: &[ChunkRecord]) -> AssetMap;

    /// Diff, classify and broadcast for this build. Resolves once the
    /// signal (if any) was handed to the transport for every connected
    /// agent; fails the emit phase on broker failure.
    async fn emit_complete(&mut self, chunks: &[ChunkRecord]) -> Result<()>;
}

/// Session-lifetime orchestrator owning the tracker and the broker.
pub struct ReloadOrchestrator {
    roles: RoleMap,
    reload_page: bool,
    watcher: String,
    tracker: VersionTracker,
    broker: SignalBroker,
}

impl ReloadOrchestrator {
    /// Resolve roles, render the watcher and start the signal broker.
    ///
    /// Must be called within a tokio runtime (the broker actor is
    /// spawned on it). `entry_names` and `output_filename` come from the
    /// host's build configuration.
    pub fn new(
        options: &ReloadOptions,
        entry_names: &[String],
        output_filename: &str,
    ) -> Result<Self> {
        let roles = options.resolve_roles(entry_names, output_filename)?;

        let (broker, actor) = SignalBroker::start(options.port)?;
        tokio::spawn(actor.run());
        crate::log!("reload"; "signal broker listening on port {}", broker.port());

        // The watcher embeds the actual port so ephemeral-port sessions work
        let watcher = build_watcher(&WatcherParams {
            port: broker.port(),
            reload_page: options.reload_page,
        });

        Ok(Self {
            roles,
            reload_page: options.reload_page,
            watcher,
            tracker: VersionTracker::new(),
            broker,
        })
    }

    /// Actual broker port for this session.
    pub fn port(&self) -> u16 {
        self.broker.port()
    }

    /// The rendered watcher script injected into this session's assets.
    pub fn watcher_script(&self) -> &str {
        &self.watcher
    }

    /// Stop the broker and drop all agent connections.
    pub async fn shutdown(&self) {
        self.broker.shutdown().await;
    }

    /// Reload scope for this build, with the page-reload policy applied:
    /// page-only changes produce no signal when `reload_page` is off.
    fn scope_for(&mut self, chunks: &[ChunkRecord]) -> ChangeScope {
        let changed = self.tracker.diff(chunks);
        match classify(&changed, &self.roles) {
            ChangeScope::PageOnly if !self.reload_page => {
                crate::debug!("reload"; "page-only change ignored (reloadPage disabled)");
                ChangeScope::None
            }
            scope => scope,
        }
    }
}

impl BuildHooks for ReloadOrchestrator {
    fn assets_finalized(&self, assets: &AssetMap, chunks: &[ChunkRecord]) -> AssetMap {
        inject(assets, chunks, &self.roles, &self.watcher)
    }

    async fn emit_complete(&mut self, chunks: &[ChunkRecord]) -> Result<()> {
        let scope = self.scope_for(chunks);
        if scope == ChangeScope::None {
            return Ok(());
        }
        crate::log!("reload"; "broadcasting {:?}", scope);
        self.broker.trigger(scope).await
    }
}
