// src/context/mod.rs

//! Context store: named, prioritized conditions and their evaluation.
//!
//! Contexts are the site/role flags that decide which resources and
//! packages apply on a host. They live in prioritized lists loaded from
//! `name = value` files, and resources reference them through small
//! boolean expressions (`NAME`, `NAME=VALUE`, `NAME!=VALUE`, a single
//! leading `!`). Evaluation yields a signed priority: the magnitude is the
//! referenced context's weight, the sign says whether the condition holds.
//!
//! Lists clone cheaply: entries are `Rc`-shared between clones, and every
//! mutation replaces the shared entry rather than writing through it, so a
//! clone never observes another list's updates.

mod lock;
mod pending;

pub use lock::DirLock;
pub use pending::{promote, PromoteOutcome, ACTIVE_FILE, PENDING_FILE};

use crate::change::Change;
use crate::error::{Error, Result};
use crate::resource::{canonicalize_boolean, valid_name};
use filetime::FileTime;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::SystemTime;
use tracing::debug;

/// A single named condition with a priority weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    name: String,
    value: Option<String>,
    priority: i32,
}

impl Context {
    /// Create a context, validating the name
    pub fn new(name: impl Into<String>, value: Option<String>, priority: i32) -> Result<Self> {
        let name = name.into();
        if !valid_name(&name) {
            return Err(Error::validation("context name", name));
        }
        Ok(Self {
            name,
            value,
            priority,
        })
    }

    /// Parse a `name = value` line; `priority` is the 1-based line position
    pub fn parse(line: &str, priority: i32) -> Result<Self> {
        let (name, value) = line
            .split_once('=')
            .ok_or_else(|| Error::Parse(format!("expected 'name = value', got '{}'", line)))?;
        Self::new(name.trim(), Some(value.trim().to_string()), priority)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored value; `None` and empty are equivalent when evaluating
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Value with absent mapped to empty, the form evaluation works on
    fn value_or_empty(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value_or_empty())
    }
}

/// An ordered list of contexts, unique by name.
///
/// Entries are shared (`Rc`) between cloned lists; [`ContextList::update`]
/// replaces the entry wholesale so clones keep observing the old value.
#[derive(Debug, Clone, Default)]
pub struct ContextList {
    entries: Vec<Rc<Context>>,
}

impl ContextList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a context by name
    pub fn find(&self, name: &str) -> Option<&Context> {
        self.entries
            .iter()
            .find(|c| c.name() == name)
            .map(|rc| rc.as_ref())
    }

    /// Insert or replace by name.
    ///
    /// Returns `Added` for a new name, `None` when name and value already
    /// match (priority alone is not a modification), `Modified` otherwise.
    /// The existing entry is never mutated in place.
    pub fn update(&mut self, context: Context) -> Change {
        match self.entries.iter().position(|c| c.name() == context.name()) {
            Some(idx) => {
                if self.entries[idx].value_or_empty() == context.value_or_empty() {
                    return Change::None;
                }
                self.entries[idx] = Rc::new(context);
                Change::Modified
            }
            None => {
                self.entries.push(Rc::new(context));
                Change::Added
            }
        }
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.entries.iter().map(|rc| rc.as_ref())
    }

    /// Entries sorted by priority (stable on ties), for serialization
    pub fn sorted_by_priority(&self) -> Vec<&Context> {
        let mut out: Vec<&Context> = self.iter().collect();
        out.sort_by_key(|c| c.priority());
        out
    }

    /// Evaluate a boolean context expression into a signed priority.
    ///
    /// See the module docs for the grammar. `&`-separated terms form a
    /// conjunction: the magnitude is the sum of the term magnitudes and
    /// the sign is negative if any term fails.
    pub fn eval(&self, expression: &str) -> Result<i32> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(Error::Parse("empty context expression".into()));
        }

        let mut magnitude = 0i32;
        let mut holds = true;

        for term in expression.split('&') {
            let term = term.trim();
            if term.is_empty() {
                return Err(Error::Parse(format!(
                    "empty term in context expression '{}'",
                    expression
                )));
            }
            let (weight, term_holds) = self.eval_term(term)?;
            magnitude += weight;
            holds &= term_holds;
        }

        Ok(if holds { magnitude } else { -magnitude })
    }

    /// Evaluate one term of an expression: `[!]NAME[=VALUE | !=VALUE]`
    fn eval_term(&self, term: &str) -> Result<(i32, bool)> {
        // A single leading ! negates the whole comparison
        let (negated, term) = match term.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, term),
        };

        let (name, comparison) = if let Some((name, value)) = term.split_once("!=") {
            (name.trim(), Some((value.trim(), true)))
        } else if let Some((name, value)) = term.split_once('=') {
            (name.trim(), Some((value.trim(), false)))
        } else {
            (term.trim(), None)
        };

        if !valid_name(name) {
            return Err(Error::Parse(format!(
                "invalid context name '{}' in expression",
                name
            )));
        }

        // An absent context evaluates as present-with-empty-value, weight 1
        let (weight, actual) = match self.find(name) {
            Some(ctx) => (ctx.priority().max(1), ctx.value_or_empty().to_string()),
            None => (1, String::new()),
        };

        let mut holds = match comparison {
            // Bare NAME: true when the value is non-empty
            None => !actual.is_empty(),
            Some((expected, invert)) => {
                // `true`/`false` compare through boolean canonicalization
                let matched = match expected {
                    "true" => canonicalize_boolean(&actual).as_deref() == Some("yes"),
                    "false" => canonicalize_boolean(&actual).as_deref() == Some(""),
                    other => actual == other,
                };
                matched != invert
            }
        };

        if negated {
            holds = !holds;
        }

        Ok((weight, holds))
    }

    /// True iff the two lists differ: any name missing from either side,
    /// or differing values for the same name.
    ///
    /// When `profile_dir` is given, a context whose override file
    /// `<dir>/<name>` has an mtime newer than `reference_time` also counts
    /// as changed even if the values agree.
    pub fn diff(
        &self,
        other: &ContextList,
        profile_dir: Option<&Path>,
        reference_time: Option<SystemTime>,
    ) -> bool {
        for ctx in self.iter() {
            match other.find(ctx.name()) {
                None => return true,
                Some(theirs) => {
                    if ctx.value_or_empty() != theirs.value_or_empty() {
                        return true;
                    }
                    if let (Some(dir), Some(reference)) = (profile_dir, reference_time) {
                        if override_file_newer(dir, ctx.name(), reference) {
                            return true;
                        }
                    }
                }
            }
        }
        // Names present only on the other side
        other.iter().any(|ctx| self.find(ctx.name()).is_none())
    }

    /// Parse a context file: one `name = value` per line, blank lines and
    /// `#` comments ignored, priority = 1-based line number.
    ///
    /// With `allow_missing`, a nonexistent file loads as an empty list.
    pub fn load(path: &Path, allow_missing: bool) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut list = Self::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let priority = (idx + 1) as i32;
            let ctx = Context::parse(trimmed, priority).map_err(|e| Error::ParseAt {
                file: path.display().to_string(),
                line: idx + 1,
                msg: e.to_string(),
            })?;
            list.update(ctx);
        }
        Ok(list)
    }

    /// Write priority-sorted `name=value` lines atomically (temp + rename).
    ///
    /// When `mtime` is given the renamed file's mtime is set to it, so a
    /// rewrite can preserve the source file's timestamp.
    pub fn store(&self, path: &Path, mtime: Option<SystemTime>) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for ctx in self.sorted_by_priority() {
            writeln!(tmp, "{}", ctx)?;
        }
        tmp.flush()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        if let Some(mtime) = mtime {
            filetime::set_file_mtime(path, FileTime::from_system_time(mtime))?;
        }
        debug!(path = %path.display(), entries = self.len(), "stored context list");
        Ok(())
    }
}

/// True if `<dir>/<name>` exists and is newer than `reference`
fn override_file_newer(dir: &Path, name: &str, reference: SystemTime) -> bool {
    let path = dir.join(name);
    match std::fs::metadata(&path).and_then(|m| m.modified()) {
        Ok(mtime) => mtime > reference,
        Err(_) => false,
    }
}

/// Canonically combine two context requirement expressions.
///
/// Terms from both inputs are split on `&`, trimmed, deduplicated and
/// sorted, so semantically identical combinations produce the same string
/// regardless of argument order. Empty inputs contribute nothing.
pub fn combine_expressions(a: &str, b: &str) -> String {
    let terms: BTreeSet<&str> = a
        .split('&')
        .chain(b.split('&'))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    terms.into_iter().collect::<Vec<_>>().join("&")
}
