// src/diff/holdfile.rs

//! Hold-file rendering.
//!
//! A hold file is the human-reviewable summary of pending resource
//! changes awaiting administrator approval. Each changed resource becomes
//! a three-line block:
//!
//! ```text
//! component.resource:
//!  - oldvalue
//!  + newvalue
//! ```
//!
//! Blocks whose old and new values are both absent or empty are omitted;
//! output order is name-sorted so identical input renders byte-identical
//! output. A `signature: <value>` trailer is appended when supplied.

use super::{ProfileDiff, ResourceDiff};
use std::fmt::Write;

/// Render one resource block; `None` when the change is vacuous
fn render_block(component: &str, diff: &ResourceDiff) -> Option<String> {
    if diff.is_vacuous() {
        return None;
    }

    let old = diff.old().map(|r| r.value_or_empty()).unwrap_or("");
    let new = diff.new_side().map(|r| r.value_or_empty()).unwrap_or("");

    let mut out = String::new();
    let _ = writeln!(out, "{}.{}:", component, diff.name());
    let _ = writeln!(out, " - {}", old);
    let _ = writeln!(out, " + {}", new);
    Some(out)
}

/// Render a whole profile diff into hold-file text.
///
/// The diff's component and resource entries are already name-sorted, so
/// repeated runs over identical input produce byte-identical output.
pub fn render_holdfile(diff: &ProfileDiff, signature: Option<&str>) -> String {
    let mut out = String::new();

    for component in diff.components() {
        for entry in component.entries() {
            if let Some(block) = render_block(component.name(), entry) {
                out.push_str(&block);
            }
        }
    }

    if let Some(signature) = signature {
        let _ = writeln!(out, "signature: {}", signature);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Profile};
    use crate::diff::profile_diff;
    use crate::resource::Resource;

    fn profile(components: &[(&str, &[(&str, &str)])]) -> Profile {
        let mut p = Profile::new();
        for (name, resources) in components {
            let mut c = Component::new(*name);
            for (rname, rvalue) in *resources {
                c.merge_resource(Resource::with_value(*rname, *rvalue).unwrap());
            }
            p.insert(c);
        }
        p
    }

    #[test]
    fn test_block_format() {
        let old = profile(&[("sshd", &[("port", "22")])]);
        let new = profile(&[("sshd", &[("port", "2222")])]);

        let text = render_holdfile(&profile_diff(&old, &new), None);
        assert_eq!(text, "sshd.port:\n - 22\n + 2222\n");
    }

    #[test]
    fn test_added_and_removed_blocks() {
        let old = profile(&[("sshd", &[("gone", "x")])]);
        let new = profile(&[("sshd", &[("fresh", "y")])]);

        let text = render_holdfile(&profile_diff(&old, &new), None);
        assert_eq!(
            text,
            "sshd.fresh:\n - \n + y\nsshd.gone:\n - x\n + \n"
        );
    }

    #[test]
    fn test_vacuous_changes_omitted() {
        // Empty-to-absent transitions report nothing
        let old = profile(&[("sshd", &[("flag", "")])]);
        let new = profile(&[("sshd", &[])]);

        let text = render_holdfile(&profile_diff(&old, &new), None);
        assert_eq!(text, "");
    }

    #[test]
    fn test_signature_trailer() {
        let old = profile(&[("sshd", &[("port", "22")])]);
        let new = profile(&[("sshd", &[("port", "23")])]);

        let text = render_holdfile(&profile_diff(&old, &new), Some("abc123"));
        assert!(text.ends_with("signature: abc123\n"));
    }

    #[test]
    fn test_deterministic_output() {
        let old = profile(&[("b", &[("y", "1"), ("x", "1")]), ("a", &[("z", "1")])]);
        let new = profile(&[("b", &[("y", "2"), ("x", "2")]), ("a", &[("z", "2")])]);

        let first = render_holdfile(&profile_diff(&old, &new), None);
        let second = render_holdfile(&profile_diff(&old, &new), None);
        assert_eq!(first, second);

        // Name-sorted: component a before b, resource x before y
        let lines: Vec<&str> = first.lines().filter(|l| l.ends_with(':')).collect();
        assert_eq!(lines, vec!["a.z:", "b.x:", "b.y:"]);
    }
}
