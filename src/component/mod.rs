// src/component/mod.rs

//! Components and profiles.
//!
//! A component is a named group of resources, unique by resource name; a
//! profile is the full configuration for one host: a set of components
//! plus its package list. Merge is replace-by-name with no history, and
//! component-level merge distinguishes "override only" loads (existing
//! components only) from full merges that also take new components.

use crate::change::Change;
use crate::context::ContextList;
use crate::error::Result;
use crate::packages::PackageList;
use crate::resource::Resource;
use std::collections::HashMap;

/// A named group of resources, unique by resource name
#[derive(Debug, Clone, Default)]
pub struct Component {
    name: String,
    resources: HashMap<String, Resource>,
}

impl Component {
    /// Create an empty component
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(name)
    }

    /// Insert or replace by resource name; the superseded resource is
    /// dropped, no history is kept.
    pub fn merge_resource(&mut self, resource: Resource) -> Change {
        match self.resources.get(resource.name()) {
            Some(existing) if existing == &resource => Change::None,
            Some(_) => {
                self.resources.insert(resource.name().to_string(), resource);
                Change::Modified
            }
            None => {
                self.resources.insert(resource.name().to_string(), resource);
                Change::Added
            }
        }
    }

    /// Merge every resource of `other` into this component
    pub fn merge_component(&mut self, other: &Component) -> Change {
        let mut overall = Change::None;
        for resource in other.iter() {
            match self.merge_resource(resource.clone()) {
                Change::None => {}
                _ => overall = Change::Modified,
            }
        }
        overall
    }

    pub fn remove(&mut self, name: &str) -> Option<Resource> {
        self.resources.remove(name)
    }

    /// Iterate in arbitrary (hash) order
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Resources sorted by name, for deterministic serialization
    pub fn sorted_resources(&self) -> Vec<&Resource> {
        let mut out: Vec<&Resource> = self.resources.values().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    /// Sorted resource names, the store's enumeration entry
    pub fn resource_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Evaluate every resource's context expression against `contexts`
    pub fn eval_priorities(&mut self, contexts: &ContextList) -> Result<()> {
        for resource in self.resources.values_mut() {
            resource.eval_priority(contexts)?;
        }
        Ok(())
    }
}

/// The full configuration for one host: components plus packages
#[derive(Debug, Clone, Default)]
pub struct Profile {
    components: HashMap<String, Component>,
    packages: PackageList,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    /// Insert a component, replacing any existing one of the same name
    pub fn insert(&mut self, component: Component) -> Option<Component> {
        self.components
            .insert(component.name().to_string(), component)
    }

    /// Fetch or create a component by name
    pub fn entry(&mut self, name: &str) -> &mut Component {
        self.components
            .entry(name.to_string())
            .or_insert_with(|| Component::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Component> {
        self.components.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Components sorted by name, for deterministic output
    pub fn sorted_components(&self) -> Vec<&Component> {
        let mut out: Vec<&Component> = self.components.values().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }

    pub fn component_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn packages(&self) -> &PackageList {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut PackageList {
        &mut self.packages
    }

    /// Merge `source` into this profile.
    ///
    /// Components present on both sides merge resource-by-resource.
    /// Components only in `source` are added when `take_new_components`
    /// is true ("full merge") and skipped otherwise ("override only").
    pub fn merge_components(&mut self, source: &Profile, take_new_components: bool) -> Change {
        let mut overall = Change::None;
        for component in source.iter() {
            match self.components.get_mut(component.name()) {
                Some(target) => {
                    if target.merge_component(component).is_change() {
                        overall = Change::Modified;
                    }
                }
                None if take_new_components => {
                    self.components
                        .insert(component.name().to_string(), component.clone());
                    overall = Change::Modified;
                }
                None => {}
            }
        }
        overall
    }

    /// Evaluate context priorities into every resource and package
    pub fn eval_priorities(&mut self, contexts: &ContextList) -> Result<()> {
        for component in self.components.values_mut() {
            component.eval_priorities(contexts)?;
        }
        self.packages.eval_priorities(contexts)
    }
}
