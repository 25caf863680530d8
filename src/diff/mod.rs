// src/diff/mod.rs

//! Diff computation between two profile generations.
//!
//! Diffs are computed at three granularities: a single resource, a
//! component, and a whole profile. Only *values* are compared — type,
//! context and derivation metadata never make a resource "modified".
//! [`quickdiff`] is a cheap name-set pre-filter used to skip the full
//! diff when nothing structural changed.

pub mod holdfile;

pub use holdfile::render_holdfile;

use crate::change::Change;
use crate::component::{Component, Profile};
use crate::resource::Resource;
use std::collections::BTreeSet;

/// Old and new sides of one resource; the change type is derived on demand
#[derive(Debug, Clone, Default)]
pub struct ResourceDiff {
    old: Option<Resource>,
    new: Option<Resource>,
}

impl ResourceDiff {
    pub fn new(old: Option<Resource>, new: Option<Resource>) -> Self {
        Self { old, new }
    }

    pub fn old(&self) -> Option<&Resource> {
        self.old.as_ref()
    }

    pub fn new_side(&self) -> Option<&Resource> {
        self.new.as_ref()
    }

    /// The diffed resource's name
    pub fn name(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|r| r.name())
            .unwrap_or("")
    }

    /// Classify this diff. Values alone decide `Modified`; metadata
    /// (type, context, derivation, priority) is explicitly ignored.
    pub fn change_type(&self) -> Change {
        match (&self.old, &self.new) {
            (None, None) => Change::None,
            (None, Some(_)) => Change::Added,
            (Some(_), None) => Change::Removed,
            (Some(old), Some(new)) => {
                if old.value_or_empty() == new.value_or_empty() {
                    Change::None
                } else {
                    Change::Modified
                }
            }
        }
    }

    /// True when both sides are absent or empty — nothing worth reporting
    pub fn is_vacuous(&self) -> bool {
        self.old.as_ref().is_none_or(|r| r.value_or_empty().is_empty())
            && self.new.as_ref().is_none_or(|r| r.value_or_empty().is_empty())
    }
}

/// Compute the diff and classification for one resource pair
pub fn resource_diff(old: Option<&Resource>, new: Option<&Resource>) -> (ResourceDiff, Change) {
    let diff = ResourceDiff::new(old.cloned(), new.cloned());
    let change = diff.change_type();
    (diff, change)
}

/// All changed resources of one component, name-sorted
#[derive(Debug, Clone)]
pub struct ComponentDiff {
    name: String,
    entries: Vec<ResourceDiff>,
    change: Change,
}

impl ComponentDiff {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[ResourceDiff] {
        &self.entries
    }

    /// The cached whole-component classification
    pub fn change_type(&self) -> Change {
        self.change
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when this component was modified and carries a non-empty new
    /// value for the `sentinel` resource — the "force re-apply even though
    /// nothing else changed" marker.
    pub fn is_prodded(&self, sentinel: &str) -> bool {
        self.change == Change::Modified
            && self.entries.iter().any(|d| {
                d.name() == sentinel
                    && d.new_side()
                        .is_some_and(|r| !r.value_or_empty().is_empty())
            })
    }
}

/// Diff two generations of one component.
///
/// Collects every resource present on either side whose resource diff is
/// non-`None`, sorted by name. The whole-component type is `Added` or
/// `Removed` when one side is absent or empty, `Modified` when both sides
/// are non-empty and at least one resource changed, else `None`.
pub fn component_diff(old: Option<&Component>, new: Option<&Component>) -> (ComponentDiff, Change) {
    let name = new
        .or(old)
        .map(|c| c.name().to_string())
        .unwrap_or_default();

    let mut names: BTreeSet<&str> = BTreeSet::new();
    if let Some(c) = old {
        names.extend(c.iter().map(|r| r.name()));
    }
    if let Some(c) = new {
        names.extend(c.iter().map(|r| r.name()));
    }

    let mut entries = Vec::new();
    for rname in names {
        let (diff, change) = resource_diff(
            old.and_then(|c| c.find(rname)),
            new.and_then(|c| c.find(rname)),
        );
        if change.is_change() {
            entries.push(diff);
        }
    }

    let old_empty = old.is_none_or(|c| c.is_empty());
    let new_empty = new.is_none_or(|c| c.is_empty());

    let change = match (old_empty, new_empty) {
        (true, true) => Change::None,
        (true, false) => Change::Added,
        (false, true) => Change::Removed,
        (false, false) => {
            if entries.is_empty() {
                Change::None
            } else {
                Change::Modified
            }
        }
    };

    (
        ComponentDiff {
            name,
            entries,
            change,
        },
        change,
    )
}

/// Component diffs for a whole profile, name-sorted
#[derive(Debug, Clone, Default)]
pub struct ProfileDiff {
    components: Vec<ComponentDiff>,
}

impl ProfileDiff {
    pub fn components(&self) -> &[ComponentDiff] {
        &self.components
    }

    /// True when no component changed
    pub fn is_empty(&self) -> bool {
        self.components.iter().all(|c| !c.change_type().is_change())
    }

    pub fn find(&self, name: &str) -> Option<&ComponentDiff> {
        self.components.iter().find(|c| c.name() == name)
    }
}

/// Diff two whole profiles; only changed components are recorded
pub fn profile_diff(old: &Profile, new: &Profile) -> ProfileDiff {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(old.iter().map(|c| c.name()));
    names.extend(new.iter().map(|c| c.name()));

    let mut components = Vec::new();
    for name in names {
        let (diff, change) = component_diff(old.find(name), new.find(name));
        if change.is_change() {
            components.push(diff);
        }
    }

    ProfileDiff { components }
}

/// Name-set summary of what changed between two profiles.
///
/// For names present on both sides the comparison is structural only —
/// resource count and name presence — so a pure value edit does not show
/// up here. This is the fast pre-filter, not the full diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickDiff {
    pub modified: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl QuickDiff {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

/// Cheap structural comparison of two component sets
pub fn quickdiff(old: &Profile, new: &Profile) -> QuickDiff {
    let mut out = QuickDiff::default();

    for component in new.iter() {
        match old.find(component.name()) {
            None => {
                out.added.insert(component.name().to_string());
            }
            Some(previous) => {
                if structurally_differs(previous, component) {
                    out.modified.insert(component.name().to_string());
                }
            }
        }
    }
    for component in old.iter() {
        if new.find(component.name()).is_none() {
            out.removed.insert(component.name().to_string());
        }
    }

    out
}

/// Resource count and name presence only; does not descend into values
fn structurally_differs(a: &Component, b: &Component) -> bool {
    if a.len() != b.len() {
        return true;
    }
    a.iter().any(|r| b.find(r.name()).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;

    fn resource(name: &str, value: &str) -> Resource {
        Resource::with_value(name, value).unwrap()
    }

    fn component(name: &str, resources: &[(&str, &str)]) -> Component {
        let mut c = Component::new(name);
        for (rname, rvalue) in resources {
            c.merge_resource(resource(rname, rvalue));
        }
        c
    }

    fn profile(components: &[(&str, &[(&str, &str)])]) -> Profile {
        let mut p = Profile::new();
        for (name, resources) in components {
            p.insert(component(name, resources));
        }
        p
    }

    // === resource diff ===

    #[test]
    fn test_resource_diff_classification() {
        let old = resource("x", "1");
        let new = resource("x", "2");

        assert_eq!(resource_diff(None, Some(&new)).1, Change::Added);
        assert_eq!(resource_diff(Some(&old), None).1, Change::Removed);
        assert_eq!(resource_diff(Some(&old), Some(&new)).1, Change::Modified);
        assert_eq!(resource_diff(Some(&old), Some(&old)).1, Change::None);
        assert_eq!(resource_diff(None, None).1, Change::None);
    }

    #[test]
    fn test_resource_diff_ignores_metadata() {
        let old = resource("x", "1");

        let mut new = resource("x", "1");
        new.set_context(Some("foo".into()));
        new.set_type(ResourceType::Integer).unwrap();
        new.set_priority(7);

        // Same value, differing metadata: not a change
        assert_eq!(resource_diff(Some(&old), Some(&new)).1, Change::None);
    }

    // === component diff ===

    #[test]
    fn test_component_diff_added_removed() {
        let c = component("sshd", &[("port", "22")]);
        assert_eq!(component_diff(None, Some(&c)).1, Change::Added);
        assert_eq!(component_diff(Some(&c), None).1, Change::Removed);

        // An empty old side counts as added too
        let empty = Component::new("sshd");
        assert_eq!(component_diff(Some(&empty), Some(&c)).1, Change::Added);
        assert_eq!(component_diff(Some(&c), Some(&empty)).1, Change::Removed);
    }

    #[test]
    fn test_component_diff_modified_and_sorted() {
        let old = component("sshd", &[("port", "22"), ("banner", "old"), ("keep", "x")]);
        let new = component("sshd", &[("port", "2222"), ("banner", "new"), ("keep", "x")]);

        let (diff, change) = component_diff(Some(&old), Some(&new));
        assert_eq!(change, Change::Modified);
        let names: Vec<&str> = diff.entries().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["banner", "port"]);
    }

    #[test]
    fn test_component_diff_none_when_equal() {
        let c = component("sshd", &[("port", "22")]);
        let (diff, change) = component_diff(Some(&c), Some(&c.clone()));
        assert_eq!(change, Change::None);
        assert!(diff.is_empty());
    }

    // === prodded ===

    #[test]
    fn test_prodded_detection() {
        let old = component("sshd", &[("prod", "")]);
        let new = component("sshd", &[("prod", "now")]);

        let (diff, _) = component_diff(Some(&old), Some(&new));
        assert!(diff.is_prodded("prod"));
        assert!(!diff.is_prodded("other"));

        // A prod value going away does not count
        let (diff, _) = component_diff(Some(&new), Some(&old));
        assert!(!diff.is_prodded("prod"));
    }

    #[test]
    fn test_prodded_requires_modified() {
        let new = component("sshd", &[("prod", "now")]);
        let (diff, change) = component_diff(None, Some(&new));
        assert_eq!(change, Change::Added);
        assert!(!diff.is_prodded("prod"));
    }

    // === profile diff ===

    #[test]
    fn test_profile_diff_self_is_empty() {
        let p = profile(&[("sshd", &[("port", "22")]), ("ntp", &[("server", "pool")])]);
        let diff = profile_diff(&p, &p.clone());
        assert!(diff.is_empty());
        assert!(diff.components().is_empty());
    }

    #[test]
    fn test_profile_diff_sorted_by_component() {
        let old = profile(&[("zz", &[("a", "1")]), ("aa", &[("b", "1")])]);
        let new = profile(&[("zz", &[("a", "2")]), ("aa", &[("b", "2")])]);

        let diff = profile_diff(&old, &new);
        let names: Vec<&str> = diff.components().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["aa", "zz"]);
    }

    // === quickdiff ===

    #[test]
    fn test_quickdiff_name_sets() {
        let old = profile(&[("keep", &[("x", "1")]), ("gone", &[("y", "1")])]);
        let new = profile(&[("keep", &[("x", "1")]), ("fresh", &[("z", "1")])]);

        let q = quickdiff(&old, &new);
        assert!(q.added.contains("fresh"));
        assert!(q.removed.contains("gone"));
        assert!(q.modified.is_empty());
    }

    #[test]
    fn test_quickdiff_structural_only() {
        // Value-only edits are invisible to quickdiff
        let old = profile(&[("c", &[("x", "1")])]);
        let new = profile(&[("c", &[("x", "2")])]);
        assert!(quickdiff(&old, &new).is_empty());

        // A new resource name is structural
        let new = profile(&[("c", &[("x", "1"), ("y", "1")])]);
        let q = quickdiff(&old, &new);
        assert!(q.modified.contains("c"));
    }
}
