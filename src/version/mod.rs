// src/version/mod.rs

//! Package version comparison.
//!
//! Versions follow the `[epoch:]rest` convention: an optional numeric
//! epoch before the first `:` dominates the comparison, and the remainder
//! is compared Debian-style (alternating runs of non-digits and digits,
//! with `~` sorting below everything including end-of-string). Empty
//! strings sort below the `*` wildcard, which sorts below any concrete
//! value.

use std::cmp::Ordering;

/// Split a version string at the first `:` into (epoch, rest).
///
/// A missing or non-numeric epoch is treated as 0, matching the historical
/// behavior of tolerating junk epochs rather than failing a comparison.
fn split_epoch(s: &str) -> (u64, &str) {
    match s.find(':') {
        Some(pos) => {
            let epoch = s[..pos].parse::<u64>().unwrap_or(0);
            (epoch, &s[pos + 1..])
        }
        None => (0, s),
    }
}

/// Order of a single byte within a non-digit run.
///
/// `~` sorts below end-of-string; alphabetic bytes sort below punctuation.
fn char_order(c: Option<u8>) -> i32 {
    match c {
        Some(b'~') => -1,
        None => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

fn is_digit(c: Option<u8>) -> bool {
    c.is_some_and(|c| c.is_ascii_digit())
}

/// Debian-style comparison of two version fragments (no epoch handling)
fn compare_fragments(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        // Non-digit run, byte by byte; a digit on both sides ends the run
        while !(is_digit(a.first().copied()) && is_digit(b.first().copied())) {
            let ca = a.first().copied().filter(|c| !c.is_ascii_digit());
            let cb = b.first().copied().filter(|c| !c.is_ascii_digit());
            if ca.is_none() && cb.is_none() {
                break;
            }
            match char_order(ca).cmp(&char_order(cb)) {
                Ordering::Equal => {}
                ord => return ord,
            }
            // Only consume bytes that belonged to the non-digit run
            if ca.is_some() {
                a = &a[1..];
            }
            if cb.is_some() {
                b = &b[1..];
            }
        }

        if a.is_empty() && b.is_empty() {
            return Ordering::Equal;
        }

        // Digit run, compared numerically with leading zeros stripped
        while a.first() == Some(&b'0') {
            a = &a[1..];
        }
        while b.first() == Some(&b'0') {
            b = &b[1..];
        }

        let da = a.iter().take_while(|c| c.is_ascii_digit()).count();
        let db = b.iter().take_while(|c| c.is_ascii_digit()).count();

        match da.cmp(&db) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match a[..da].cmp(&b[..db]) {
            Ordering::Equal => {}
            ord => return ord,
        }

        a = &a[da..];
        b = &b[db..];
    }
}

/// Compare two version (or release) strings.
///
/// Ordering: empty < `*` < any concrete value; epochs compare numerically
/// first; equal-epoch concrete values fall through to the Debian-style
/// fragment comparison.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    match (a.is_empty(), b.is_empty()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match (a == "*", b == "*") {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let (epoch_a, rest_a) = split_epoch(a);
    let (epoch_b, rest_b) = split_epoch(b);

    match epoch_a.cmp(&epoch_b) {
        Ordering::Equal => {}
        ord => return ord,
    }

    compare_fragments(rest_a, rest_b)
}

/// Compare full version/release pairs, release consulted only on a tie
pub fn compare_version_release(
    version_a: &str,
    release_a: &str,
    version_b: &str,
    release_b: &str,
) -> Ordering {
    match compare_versions(version_a, version_b) {
        Ordering::Equal => compare_versions(release_a, release_b),
        ord => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sorts_lowest() {
        assert_eq!(compare_versions("", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0", ""), Ordering::Greater);
        assert_eq!(compare_versions("", ""), Ordering::Equal);
    }

    #[test]
    fn test_wildcard_below_concrete() {
        assert_eq!(compare_versions("*", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("*", "0.0.1"), Ordering::Less);
        assert_eq!(compare_versions("", "*"), Ordering::Less);
        assert_eq!(compare_versions("*", "*"), Ordering::Equal);
    }

    #[test]
    fn test_epoch_dominates() {
        assert_eq!(compare_versions("1:0.9", "0.9"), Ordering::Greater);
        assert_eq!(compare_versions("1:0.9", "2.0"), Ordering::Greater);
        assert_eq!(compare_versions("0:1.0", "1.0"), Ordering::Equal);
        assert_eq!(compare_versions("2:1.0", "10:0.1"), Ordering::Less);
    }

    #[test]
    fn test_numeric_runs() {
        assert_eq!(compare_versions("1.2", "1.10"), Ordering::Less);
        assert_eq!(compare_versions("1.02", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(compare_versions("10", "9"), Ordering::Greater);
    }

    #[test]
    fn test_tilde_sorts_below_everything() {
        assert_eq!(compare_versions("1.0~rc1", "1.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0~rc1", "1.0~rc2"), Ordering::Less);
        assert_eq!(compare_versions("1.0~~", "1.0~"), Ordering::Less);
        assert_eq!(compare_versions("1.0~rc1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_letters_below_separators() {
        assert_eq!(compare_versions("1.0a", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0alpha", "1.0beta"), Ordering::Less);
    }

    #[test]
    fn test_version_release_pairs() {
        assert_eq!(
            compare_version_release("1.0", "1", "1.0", "2"),
            Ordering::Less
        );
        assert_eq!(
            compare_version_release("1.1", "1", "1.0", "9"),
            Ordering::Greater
        );
        assert_eq!(
            compare_version_release("1.0", "1.el8", "1.0", "1.el8"),
            Ordering::Equal
        );
    }
}
