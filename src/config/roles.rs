//! Role mapping between chunk names and extension runtime roles.
//!
//! Hosts express roles in flexible shapes (a single name, a list of
//! names, or nothing at all). All of that is normalized here into
//! uniform sets before it reaches the tracker, classifier or injector,
//! so none of them ever does shape checking.

use rustc_hash::FxHashSet;
use serde::Deserialize;

use super::ConfigError;

/// A role value as hosts write it: one name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleSpec {
    One(String),
    Many(Vec<String>),
}

impl RoleSpec {
    /// Normalize into a set of names.
    pub fn into_set(self) -> FxHashSet<String> {
        match self {
            Self::One(name) => std::iter::once(name).collect(),
            Self::Many(names) => names.into_iter().collect(),
        }
    }
}

/// Explicit role mapping as accepted in plugin options.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntrySpec {
    /// Background entry name
    pub background: String,
    /// Content-script entry name(s)
    #[serde(default)]
    pub content_script: Option<RoleSpec>,
    /// Extension-page entry name(s)
    #[serde(default)]
    pub extension_page: Option<RoleSpec>,
}

impl EntrySpec {
    /// Normalize into the uniform set-of-names representation.
    pub fn normalize(self) -> RoleMap {
        RoleMap {
            background: self.background,
            content_scripts: self.content_script.map(RoleSpec::into_set).unwrap_or_default(),
            pages: self.extension_page.map(RoleSpec::into_set).unwrap_or_default(),
        }
    }
}

/// Which chunk names play which runtime role. Immutable for the session.
#[derive(Debug, Clone)]
pub struct RoleMap {
    /// The background chunk
    pub background: String,
    /// Content-script chunks
    pub content_scripts: FxHashSet<String>,
    /// Extension-page chunks (options page, popup, ...); empty when the
    /// host declared none
    pub pages: FxHashSet<String>,
}

impl RoleMap {
    /// True if the chunk name plays any role. A name appearing in several
    /// roles matches once, which is what keeps injection idempotent.
    pub fn matches(&self, name: &str) -> bool {
        name == self.background
            || self.content_scripts.contains(name)
            || self.pages.contains(name)
    }

    /// Every name declared by this role map.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.background.as_str())
            .chain(self.content_scripts.iter().map(String::as_str))
            .chain(self.pages.iter().map(String::as_str))
    }

    /// Check that every declared name matches a known build entry.
    pub fn validate_against(&self, entry_names: &[String]) -> Result<(), ConfigError> {
        for name in self.names() {
            if !entry_names.iter().any(|entry| entry == name) {
                return Err(ConfigError::EntryResolution(name.to_string()));
            }
        }
        Ok(())
    }
}
