//! Dotted version comparison
//!
//! Upstream version strings are dotted and often short (`1.0`, `2.3.1`,
//! `3.0-beta.1`) — not always strict semver, so this is a small ordering of
//! our own: numeric segments compare numerically, missing segments count as
//! zero, and a pre-release suffix sorts below the plain release.

use std::cmp::Ordering;

/// Total order over dotted version strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (a_main, a_pre) = split_pre(a.trim().trim_start_matches(['v', 'V']));
    let (b_main, b_pre) = split_pre(b.trim().trim_start_matches(['v', 'V']));

    let main = compare_segments(a_main, b_main);
    if main != Ordering::Equal {
        return main;
    }

    match (a_pre, b_pre) {
        (None, None) => Ordering::Equal,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(a_pre), Some(b_pre)) => compare_segments(a_pre, b_pre),
    }
}

/// Whether `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare(current, candidate) == Ordering::Less
}

fn split_pre(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((main, pre)) => (main, Some(pre)),
        None => (version, None),
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let mut a_parts = a.split('.');
    let mut b_parts = b.split('.');

    loop {
        match (a_parts.next(), b_parts.next()) {
            (None, None) => return Ordering::Equal,
            (a_part, b_part) => {
                let a_part = a_part.unwrap_or("0");
                let b_part = b_part.unwrap_or("0");
                let ordering = match (a_part.parse::<u64>(), b_part.parse::<u64>()) {
                    (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
                    _ => a_part.cmp(b_part),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
