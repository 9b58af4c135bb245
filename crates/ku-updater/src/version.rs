// SPDX-License-Identifier: MIT

//! Version parsing and comparison module
//!
//! Versions are dot-separated unsigned integers with an optional non-numeric
//! prefix (`v2.3.0`, `release-2.3`). Parts that fail to parse count as `0`:
//! `"1.2.3-beta"` compares equal to `"1.2.0"`. Malformed tags therefore never
//! look newer than a well-formed current version, but they also never fail.

use std::cmp::Ordering;

/// Strip surrounding whitespace and any leading non-digit prefix
pub fn version_from_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches(|c: char| !c.is_ascii_digit())
}

fn parts(version: &str) -> Vec<u64> {
    version_from_tag(version)
        .split('.')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two dotted-numeric versions. Missing trailing parts are `0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = parts(a);
    let right = parts(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Returns true if `candidate` is strictly newer than `current`
pub fn is_newer(candidate: &str, current: &str) -> bool {
    let newer = compare_versions(candidate, current) == Ordering::Greater;
    tracing::debug!(candidate, current, newer, "Compared versions");
    newer
}
