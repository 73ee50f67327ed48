//! Watcher injection into build assets.
//!
//! Runs once per build during asset finalization, before the output is
//! written, so the injected content reaches disk before the build
//! reports completion. Returns only the modified paths; the caller
//! merges them over its asset map.

use rustc_hash::FxHashMap;

use crate::config::RoleMap;
use crate::reload::version::ChunkRecord;

/// Asset path -> content, as exposed by the host during finalization.
pub type AssetMap = FxHashMap<String, String>;

/// Prepend the watcher script to every `.js` file of every role-matching
/// chunk.
///
/// The input map is never mutated. Non-script files and chunks matching
/// no role are absent from the result, as are files a chunk names but
/// the asset map does not contain. A file reachable through several
/// roles is injected once.
pub fn inject(
    assets: &AssetMap,
    chunks: &[ChunkRecord],
    roles: &RoleMap,
    watcher: &str,
) -> AssetMap {
    let mut patched = AssetMap::default();

    for chunk in chunks.iter().filter(|chunk| roles.matches(&chunk.name)) {
        for file in &chunk.files {
            if !file.ends_with(".js") || patched.contains_key(file) {
                continue;
            }
            if let Some(original) = assets.get(file) {
                crate::debug!("reload"; "injecting watcher into {}", file);
                patched.insert(file.clone(), format!("{watcher}{original}"));
            }
        }
    }

    patched
}
