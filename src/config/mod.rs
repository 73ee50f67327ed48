//! Plugin configuration surface.
//!
//! Recognized options mirror the host-facing plugin config: broker port,
//! page-reload policy, and the role mapping (explicit `entries` or a
//! `manifest` path resolved through the manifest collaborator). Role
//! resolution happens once, before any build activity, and every failure
//! there is fatal by design: a broken role map would otherwise only
//! surface after the bundle is loaded into a browser.

mod error;
mod manifest;
mod roles;

pub use error::ConfigError;
pub use roles::{EntrySpec, RoleMap, RoleSpec};

use std::path::PathBuf;

use serde::Deserialize;

/// Default broker port
pub const DEFAULT_PORT: u16 = 9090;

/// Options accepted from the host build tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReloadOptions {
    /// Broker listen port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Enables TabReload delivery for page-only changes
    #[serde(default = "default_reload_page")]
    pub reload_page: bool,
    /// Explicit role mapping
    #[serde(default)]
    pub entries: Option<EntrySpec>,
    /// Extension manifest path; takes precedence over `entries`
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_reload_page() -> bool {
    true
}

impl Default for ReloadOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            reload_page: true,
            entries: None,
            manifest: None,
        }
    }
}

impl ReloadOptions {
    /// Resolve the session's role map.
    ///
    /// `entry_names` are the host's entry-point names and
    /// `output_filename` its output naming pattern (e.g.
    /// `[name].bundle.js`). A configured `manifest` wins over static
    /// `entries`; each resolved role name must match a known entry.
    pub fn resolve_roles(
        &self,
        entry_names: &[String],
        output_filename: &str,
    ) -> Result<RoleMap, ConfigError> {
        if let Some(path) = &self.manifest {
            return manifest::extract_roles(path, entry_names, output_filename);
        }
        if let Some(entries) = &self.entries {
            let roles = entries.clone().normalize();
            roles.validate_against(entry_names)?;
            return Ok(roles);
        }
        Err(ConfigError::MissingRoles)
    }
}
