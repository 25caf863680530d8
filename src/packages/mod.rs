// src/packages/mod.rs

//! Package specifications and their merge policies.
//!
//! A package entry is keyed by (name, arch). When two specifications for
//! the same key meet during a merge, the incoming entry's prefix decides
//! the outcome: plain add/replace, removal, add-if-absent, keep the
//! greater version, or pin. A pinned entry survives later plain adds
//! until it is explicitly unpinned.

use crate::change::Change;
use crate::context::ContextList;
use crate::derivation::SharedDerivation;
use crate::error::{Error, Result};
use crate::version::compare_version_release;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use strum_macros::EnumIter;
use tracing::debug;

/// Merge policy selected by a package specification's prefix character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter)]
pub enum PackagePrefix {
    /// `+` — insert or replace unconditionally (unless the target is pinned)
    #[default]
    Add,
    /// `=` — insert or replace, and pin the result against later adds
    Pin,
    /// `-` — delete any existing entry
    Remove,
    /// `~` — replace an existing entry; an absent target is a conflict
    Replace,
    /// `?` — insert only when absent
    AddIfAbsent,
    /// `>` — keep whichever entry has the greater version/release
    KeepGreater,
}

impl PackagePrefix {
    pub fn symbol(self) -> char {
        match self {
            PackagePrefix::Add => '+',
            PackagePrefix::Pin => '=',
            PackagePrefix::Remove => '-',
            PackagePrefix::Replace => '~',
            PackagePrefix::AddIfAbsent => '?',
            PackagePrefix::KeepGreater => '>',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(PackagePrefix::Add),
            '=' => Some(PackagePrefix::Pin),
            '-' => Some(PackagePrefix::Remove),
            '~' => Some(PackagePrefix::Replace),
            '?' => Some(PackagePrefix::AddIfAbsent),
            '>' => Some(PackagePrefix::KeepGreater),
            _ => None,
        }
    }
}

/// One package specification
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub arch: String,
    pub version: String,
    pub release: String,
    pub flags: Option<String>,
    pub context: Option<String>,
    pub derivation: Option<SharedDerivation>,
    pub prefix: PackagePrefix,
    pub priority: i32,
    /// Set when a `Pin` merge installed this entry; blocks later adds
    pub pinned: bool,
}

impl Package {
    pub fn new(
        name: impl Into<String>,
        arch: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version: version.into(),
            release: release.into(),
            flags: None,
            context: None,
            derivation: None,
            prefix: PackagePrefix::default(),
            priority: 0,
            pinned: false,
        }
    }

    pub fn with_prefix(mut self, prefix: PackagePrefix) -> Self {
        self.prefix = prefix;
        self
    }

    /// The (name, arch) identity used as the merge key
    pub fn key(&self) -> (String, String) {
        (self.name.clone(), self.arch.clone())
    }

    /// Active packages (priority >= 0) are installed on the host
    pub fn is_active(&self) -> bool {
        self.priority >= 0
    }

    /// Evaluate the context expression and store the signed priority
    pub fn eval_priority(&mut self, contexts: &ContextList) -> Result<i32> {
        let priority = match &self.context {
            Some(expr) => contexts.eval(expr)?,
            None => 0,
        };
        self.priority = priority;
        Ok(priority)
    }

    /// Full ordering: name (case-insensitive), arch, version, release
    pub fn compare(&self, other: &Package) -> Ordering {
        let by_name = self
            .name
            .to_ascii_lowercase()
            .cmp(&other.name.to_ascii_lowercase());
        by_name
            .then_with(|| self.arch.cmp(&other.arch))
            .then_with(|| {
                compare_version_release(&self.version, &self.release, &other.version, &other.release)
            })
    }
}

impl fmt::Display for Package {
    /// `name-version-release[/arch]`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.version, self.release)?;
        if !self.arch.is_empty() {
            write!(f, "/{}", self.arch)?;
        }
        Ok(())
    }
}

/// A set of package specifications, unique by (name, arch)
#[derive(Debug, Clone, Default)]
pub struct PackageList {
    entries: HashMap<(String, String), Package>,
}

impl PackageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, name: &str, arch: &str) -> Option<&Package> {
        self.entries.get(&(name.to_string(), arch.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.entries.values()
    }

    /// Entries in full package order, for deterministic output
    pub fn sorted(&self) -> Vec<&Package> {
        let mut out: Vec<&Package> = self.entries.values().collect();
        out.sort_by(|a, b| a.compare(b));
        out
    }

    /// Merge one specification according to its prefix policy.
    ///
    /// `Replace` with no existing target is a [`Error::MergeConflict`];
    /// every other policy always succeeds.
    pub fn merge(&mut self, package: Package) -> Result<Change> {
        let key = package.key();

        match package.prefix {
            PackagePrefix::Add => match self.entries.get(&key) {
                Some(existing) if existing.pinned => {
                    debug!(package = %package, "add blocked by pinned entry");
                    Ok(Change::None)
                }
                Some(existing) if existing == &package => Ok(Change::None),
                Some(_) => {
                    self.entries.insert(key, package);
                    Ok(Change::Modified)
                }
                None => {
                    self.entries.insert(key, package);
                    Ok(Change::Added)
                }
            },

            PackagePrefix::Pin => {
                let mut package = package;
                package.pinned = true;
                let had = self.entries.insert(key, package).is_some();
                Ok(if had { Change::Modified } else { Change::Added })
            }

            PackagePrefix::Remove => match self.entries.remove(&key) {
                Some(_) => Ok(Change::Removed),
                None => Ok(Change::None),
            },

            PackagePrefix::Replace => {
                if !self.entries.contains_key(&key) {
                    return Err(Error::MergeConflict(format!(
                        "replace of '{}' but no existing entry",
                        package
                    )));
                }
                self.entries.insert(key, package);
                Ok(Change::Modified)
            }

            PackagePrefix::AddIfAbsent => {
                if self.entries.contains_key(&key) {
                    Ok(Change::None)
                } else {
                    self.entries.insert(key, package);
                    Ok(Change::Added)
                }
            }

            PackagePrefix::KeepGreater => match self.entries.get(&key) {
                Some(existing) => {
                    let incoming_greater = compare_version_release(
                        &package.version,
                        &package.release,
                        &existing.version,
                        &existing.release,
                    ) == Ordering::Greater;
                    if incoming_greater {
                        self.entries.insert(key, package);
                        Ok(Change::Modified)
                    } else {
                        Ok(Change::None)
                    }
                }
                None => {
                    self.entries.insert(key, package);
                    Ok(Change::Added)
                }
            },
        }
    }

    /// Merge every entry of `other`, in its sorted order
    pub fn merge_list(&mut self, other: &PackageList) -> Result<Change> {
        let mut overall = Change::None;
        for package in other.sorted() {
            if self.merge(package.clone())?.is_change() {
                overall = Change::Modified;
            }
        }
        Ok(overall)
    }

    /// Clear the pin on an entry; later adds may then replace it
    pub fn unpin(&mut self, name: &str, arch: &str) -> bool {
        match self.entries.get_mut(&(name.to_string(), arch.to_string())) {
            Some(pkg) if pkg.pinned => {
                pkg.pinned = false;
                true
            }
            _ => false,
        }
    }

    /// Evaluate context priorities into every entry
    pub fn eval_priorities(&mut self, contexts: &ContextList) -> Result<()> {
        for package in self.entries.values_mut() {
            package.eval_priority(contexts)?;
        }
        Ok(())
    }

    /// Entries with priority >= 0, in sorted order
    pub fn active(&self) -> Vec<&Package> {
        self.sorted().into_iter().filter(|p| p.is_active()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn pkg(name: &str, version: &str, prefix: PackagePrefix) -> Package {
        Package::new(name, "x86_64", version, "1").with_prefix(prefix)
    }

    #[test]
    fn test_prefix_symbols_roundtrip() {
        for prefix in PackagePrefix::iter() {
            assert_eq!(PackagePrefix::from_symbol(prefix.symbol()), Some(prefix));
        }
        assert_eq!(PackagePrefix::from_symbol('!'), None);
    }

    #[test]
    fn test_add_and_replace() {
        let mut list = PackageList::new();
        assert_eq!(
            list.merge(pkg("foo", "1.0", PackagePrefix::Add)).unwrap(),
            Change::Added
        );
        assert_eq!(
            list.merge(pkg("foo", "2.0", PackagePrefix::Add)).unwrap(),
            Change::Modified
        );
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "2.0");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut list = PackageList::new();
        list.merge(pkg("foo", "1.0", PackagePrefix::Add)).unwrap();
        assert_eq!(
            list.merge(pkg("foo", "", PackagePrefix::Remove)).unwrap(),
            Change::Removed
        );
        assert!(list.is_empty());
        // Removing again is a no-op
        assert_eq!(
            list.merge(pkg("foo", "", PackagePrefix::Remove)).unwrap(),
            Change::None
        );
    }

    #[test]
    fn test_replace_requires_target() {
        let mut list = PackageList::new();
        let err = list.merge(pkg("foo", "1.0", PackagePrefix::Replace));
        assert!(matches!(err, Err(Error::MergeConflict(_))));

        list.merge(pkg("foo", "1.0", PackagePrefix::Add)).unwrap();
        assert_eq!(
            list.merge(pkg("foo", "2.0", PackagePrefix::Replace)).unwrap(),
            Change::Modified
        );
    }

    #[test]
    fn test_add_if_absent() {
        let mut list = PackageList::new();
        assert_eq!(
            list.merge(pkg("foo", "1.0", PackagePrefix::AddIfAbsent)).unwrap(),
            Change::Added
        );
        assert_eq!(
            list.merge(pkg("foo", "2.0", PackagePrefix::AddIfAbsent)).unwrap(),
            Change::None
        );
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "1.0");
    }

    #[test]
    fn test_keep_greater() {
        let mut list = PackageList::new();
        list.merge(pkg("foo", "1.0", PackagePrefix::KeepGreater)).unwrap();
        assert_eq!(
            list.merge(pkg("foo", "2.0", PackagePrefix::KeepGreater)).unwrap(),
            Change::Modified
        );
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "2.0");

        // A lesser version is ignored
        assert_eq!(
            list.merge(pkg("foo", "1.5", PackagePrefix::KeepGreater)).unwrap(),
            Change::None
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "2.0");
    }

    #[test]
    fn test_pin_blocks_add() {
        let mut list = PackageList::new();
        list.merge(pkg("foo", "1.0", PackagePrefix::Pin)).unwrap();
        assert!(list.find("foo", "x86_64").unwrap().pinned);

        assert_eq!(
            list.merge(pkg("foo", "9.0", PackagePrefix::Add)).unwrap(),
            Change::None
        );
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "1.0");

        // Pin persists across merge generations until cleared
        assert!(list.unpin("foo", "x86_64"));
        assert_eq!(
            list.merge(pkg("foo", "9.0", PackagePrefix::Add)).unwrap(),
            Change::Modified
        );
        assert_eq!(list.find("foo", "x86_64").unwrap().version, "9.0");
    }

    #[test]
    fn test_pin_can_repin() {
        let mut list = PackageList::new();
        list.merge(pkg("foo", "1.0", PackagePrefix::Pin)).unwrap();
        list.merge(pkg("foo", "2.0", PackagePrefix::Pin)).unwrap();
        let entry = list.find("foo", "x86_64").unwrap();
        assert_eq!(entry.version, "2.0");
        assert!(entry.pinned);
    }

    #[test]
    fn test_arch_distinguishes_entries() {
        let mut list = PackageList::new();
        list.merge(Package::new("foo", "x86_64", "1.0", "1")).unwrap();
        list.merge(Package::new("foo", "aarch64", "1.0", "1")).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_sorted_ordering() {
        let mut list = PackageList::new();
        list.merge(Package::new("zlib", "x86_64", "1.0", "1")).unwrap();
        list.merge(Package::new("Bash", "x86_64", "5.0", "1")).unwrap();
        list.merge(Package::new("bash", "aarch64", "5.0", "1")).unwrap();

        let names: Vec<String> = list
            .sorted()
            .iter()
            .map(|p| format!("{}/{}", p.name, p.arch))
            .collect();
        // Case-insensitive name first, then arch
        assert_eq!(names, vec!["bash/aarch64", "Bash/x86_64", "zlib/x86_64"]);
    }
}
