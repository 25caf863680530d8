// src/change.rs

//! Change classification shared by merge and diff.

use std::fmt;

/// What happened to an entity between two generations, or during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Change {
    /// Nothing changed
    #[default]
    None,
    /// Present only in the new side
    Added,
    /// Present only in the old side
    Removed,
    /// Present in both with differing content
    Modified,
}

impl Change {
    /// True unless the classification is [`Change::None`]
    pub fn is_change(self) -> bool {
        self != Change::None
    }

    /// Single-character marker used in human-readable summaries
    pub fn symbol(self) -> char {
        match self {
            Change::None => ' ',
            Change::Added => '+',
            Change::Removed => '-',
            Change::Modified => '~',
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::None => "unchanged",
            Change::Added => "added",
            Change::Removed => "removed",
            Change::Modified => "modified",
        };
        write!(f, "{}", s)
    }
}
