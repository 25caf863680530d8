// src/derivation.rs

//! Derivation (provenance) tracking for resources and packages.
//!
//! A derivation records which source files, and which lines within them,
//! contributed a value. It is diagnostic-only: derivations never affect
//! merge or diff classification. Lists are shared (`Rc`) between cloned
//! resources; mutation goes through [`SharedDerivation`], which privately
//! copies the list first (`Rc::make_mut`) so other owners are unaffected.
//!
//! Text form: space-separated `file:l1,l2` entries, e.g.
//! `profile.xml:12,40 site.xml:3`.

use crate::error::{Error, Result};
use std::fmt;
use std::rc::Rc;

/// One source file and the lines within it that contributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub file: String,
    pub lines: Vec<u32>,
}

impl Derivation {
    pub fn new(file: impl Into<String>, lines: Vec<u32>) -> Self {
        Self {
            file: file.into(),
            lines,
        }
    }

    /// Parse `file:l1,l2,...` (a bare `file` has no line numbers)
    pub fn parse(s: &str) -> Result<Self> {
        let (file, lines) = match s.rsplit_once(':') {
            Some((file, lines)) if !file.is_empty() => {
                let parsed = lines
                    .split(',')
                    .filter(|l| !l.is_empty())
                    .map(|l| {
                        l.parse::<u32>()
                            .map_err(|_| Error::Parse(format!("bad line number '{}' in derivation", l)))
                    })
                    .collect::<Result<Vec<u32>>>()?;
                (file.to_string(), parsed)
            }
            _ => {
                if s.is_empty() {
                    return Err(Error::Parse("empty derivation entry".into()));
                }
                (s.to_string(), Vec::new())
            }
        };
        Ok(Self { file, lines })
    }
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lines.is_empty() {
            write!(f, "{}", self.file)
        } else {
            let lines: Vec<String> = self.lines.iter().map(|l| l.to_string()).collect();
            write!(f, "{}:{}", self.file, lines.join(","))
        }
    }
}

/// An ordered list of derivations, unique by file (lines accumulate)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivationList {
    entries: Vec<Derivation>,
}

impl DerivationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Derivation> {
        self.entries.iter()
    }

    /// Add an entry; same-file entries merge their line lists
    pub fn push(&mut self, deriv: Derivation) {
        match self.entries.iter_mut().find(|d| d.file == deriv.file) {
            Some(existing) => {
                for line in deriv.lines {
                    if !existing.lines.contains(&line) {
                        existing.lines.push(line);
                    }
                }
            }
            None => self.entries.push(deriv),
        }
    }

    /// Append every entry of `other`
    pub fn merge(&mut self, other: &DerivationList) {
        for deriv in other.iter() {
            self.push(deriv.clone());
        }
    }

    /// Parse the space-separated text form
    pub fn parse(s: &str) -> Result<Self> {
        let mut list = Self::new();
        for part in s.split_whitespace() {
            list.push(Derivation::parse(part)?);
        }
        Ok(list)
    }
}

impl fmt::Display for DerivationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.entries.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// A derivation list shared between resource clones.
///
/// Cloning shares the underlying list; any mutation first makes the list
/// private to this handle, so sibling clones keep their view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedDerivation {
    inner: Rc<DerivationList>,
}

impl SharedDerivation {
    pub fn new(list: DerivationList) -> Self {
        Self {
            inner: Rc::new(list),
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(Self::new(DerivationList::parse(s)?))
    }

    pub fn get(&self) -> &DerivationList {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Record another contributing source; copies-on-write when shared
    pub fn push(&mut self, deriv: Derivation) {
        Rc::make_mut(&mut self.inner).push(deriv);
    }

    /// Merge another list in; copies-on-write when shared
    pub fn merge(&mut self, other: &SharedDerivation) {
        Rc::make_mut(&mut self.inner).merge(other.get());
    }

    /// True if both handles point at the same allocation (test aid)
    pub fn shares_with(&self, other: &SharedDerivation) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Display for SharedDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
