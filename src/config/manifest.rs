//! Manifest collaborator: role extraction from an extension manifest.
//!
//! Consumes the manifest JSON shape
//! `{ background: { scripts: [..] }, content_scripts: [{ js: [..] }] }`
//! and resolves the script filenames against the host's entry names
//! using its output naming pattern (the `[name]` placeholder). Passing a
//! manifest instead of explicit entries means misconfigurations surface
//! at build start rather than after loading the bundle into a browser.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::ConfigError;
use super::roles::RoleMap;

#[derive(Debug, Deserialize)]
struct Manifest {
    background: Option<Background>,
    content_scripts: Option<Vec<ContentScriptDecl>>,
}

#[derive(Debug, Deserialize)]
struct Background {
    scripts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ContentScriptDecl {
    #[serde(default)]
    js: Vec<String>,
}

/// Resolve a manifest into the session's role map.
///
/// `output_filename` is the host's naming pattern, e.g.
/// `[name].bundle.js`: stripping everything around `[name]` from a
/// manifest script path recovers the entry name it was built from.
/// Pages are never derived from a manifest; hosts wanting page reloads
/// declare them via explicit entries.
pub fn extract_roles(
    manifest_path: &Path,
    entry_names: &[String],
    output_filename: &str,
) -> Result<RoleMap, ConfigError> {
    let raw = fs::read_to_string(manifest_path)
        .map_err(|e| ConfigError::Io(manifest_path.to_path_buf(), e))?;
    let manifest: Manifest = serde_json::from_str(&raw)?;

    let bg_scripts = manifest
        .background
        .and_then(|b| b.scripts)
        .filter(|scripts| !scripts.is_empty())
        .ok_or(ConfigError::MissingBackground)?;

    let suffix = output_filename.replace("[name]", "");

    let background = entry_names
        .iter()
        .find(|entry| {
            bg_scripts
                .iter()
                .any(|script| script.replace(&suffix, "") == **entry)
        })
        .cloned()
        .ok_or_else(|| ConfigError::EntryResolution(bg_scripts[0].clone()))?;

    let content_scripts = manifest
        .content_scripts
        .unwrap_or_default()
        .into_iter()
        .flat_map(|decl| decl.js)
        .map(|script| script.replace(&suffix, ""))
        .filter(|name| entry_names.iter().any(|entry| entry == name))
        .collect();

    Ok(RoleMap {
        background,
        content_scripts,
        pages: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_manifest(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_background_and_content_scripts() {
        let file = write_manifest(
            r#"{
                "background": {"scripts": ["bg.bundle.js"]},
                "content_scripts": [{"js": ["content.bundle.js", "vendor.bundle.js"]}]
            }"#,
        );
        let roles = extract_roles(
            file.path(),
            &names(&["bg", "content"]),
            "[name].bundle.js",
        )
        .unwrap();

        assert_eq!(roles.background, "bg");
        assert!(roles.content_scripts.contains("content"));
        // vendor.bundle.js matches no entry and is ignored
        assert_eq!(roles.content_scripts.len(), 1);
        assert!(roles.pages.is_empty());
    }

    #[test]
    fn missing_background_scripts_is_fatal() {
        let file = write_manifest(r#"{"content_scripts": [{"js": ["content.bundle.js"]}]}"#);
        let err =
            extract_roles(file.path(), &names(&["content"]), "[name].bundle.js").unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackground));
    }

    #[test]
    fn unresolvable_background_entry_is_fatal() {
        let file = write_manifest(r#"{"background": {"scripts": ["missing.bundle.js"]}}"#);
        let err = extract_roles(file.path(), &names(&["bg"]), "[name].bundle.js").unwrap_err();
        assert!(matches!(err, ConfigError::EntryResolution(script) if script == "missing.bundle.js"));
    }

    #[test]
    fn invalid_json_is_fatal() {
        let file = write_manifest("not json");
        let err = extract_roles(file.path(), &names(&["bg"]), "[name].js").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
