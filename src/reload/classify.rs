//! Reload-scope classification.
//!
//! Pure function from the changed-chunk set and the session's role map to
//! a reload scope. No side effects, cannot fail.

use rustc_hash::FxHashSet;

use crate::config::RoleMap;

/// How broad a reload the rebuild requires.
///
/// Ordered by precedence: `BackgroundOrContent > PageOnly > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Nothing relevant changed; no signal is emitted
    None,
    /// Background or content-script chunk changed; the whole extension
    /// runtime must reload
    BackgroundOrContent,
    /// Only extension-page chunks changed; the active tab is enough
    PageOnly,
}

/// Classify a changed-chunk set into a reload scope.
///
/// Background/content dominance is absolute: when a background or
/// content-script chunk changed, page membership is not even evaluated.
/// A background/content change can break the whole extension's logic, so
/// it always wins over a page-only change in the same rebuild.
pub fn classify(changed: &FxHashSet<String>, roles: &RoleMap) -> ChangeScope {
    let background_or_content = changed.contains(&roles.background)
        || roles.content_scripts.iter().any(|name| changed.contains(name));

    if background_or_content {
        return ChangeScope::BackgroundOrContent;
    }

    if roles.pages.iter().any(|name| changed.contains(name)) {
        ChangeScope::PageOnly
    } else {
        ChangeScope::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles() -> RoleMap {
        RoleMap {
            background: "bg".into(),
            content_scripts: ["content".to_string()].into_iter().collect(),
            pages: ["opts".to_string()].into_iter().collect(),
        }
    }

    fn set(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn background_change_is_full_scope() {
        assert_eq!(
            classify(&set(&["bg"]), &roles()),
            ChangeScope::BackgroundOrContent
        );
    }

    #[test]
    fn content_dominates_page_change() {
        // Both a content script and a page changed in the same rebuild
        assert_eq!(
            classify(&set(&["content", "opts"]), &roles()),
            ChangeScope::BackgroundOrContent
        );
    }

    #[test]
    fn page_only_change() {
        assert_eq!(classify(&set(&["opts"]), &roles()), ChangeScope::PageOnly);
    }

    #[test]
    fn unrelated_change_is_none() {
        assert_eq!(classify(&set(&["vendor"]), &roles()), ChangeScope::None);
        assert_eq!(classify(&set(&[]), &roles()), ChangeScope::None);
    }

    #[test]
    fn absent_pages_never_classify_as_page_only() {
        let roles = RoleMap {
            background: "bg".into(),
            content_scripts: FxHashSet::default(),
            pages: FxHashSet::default(),
        };
        assert_eq!(classify(&set(&["opts"]), &roles), ChangeScope::None);
    }
}
