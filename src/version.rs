// src/version.rs

//! Recipe version ordering
//!
//! Recipe files are named `<name>-<version>[-<revision>].sh`. When an atom
//! asks for `latest`, sibling recipes are ranked with [`RecipeVersion`]:
//!
//! - upstream versions that are both valid semver compare as semver
//! - otherwise versions compare segment by segment (`2.9` < `2.44`),
//!   numeric segments numerically, numbers sorting above letters
//! - the recipe revision is compared last (`2.44-1` < `2.44-2`)

use semver::Version;
use std::cmp::Ordering;
use std::fmt;

use crate::atom::DEFAULT_RELEASE;

/// A recipe version split into upstream version and recipe revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipeVersion {
    pub version: String,
    pub release: String,
}

impl RecipeVersion {
    /// Parse a version as it appears in a recipe file name
    ///
    /// Format: version[-release]. Returns None for strings that cannot name
    /// a concrete version (empty, or not starting with a digit - this keeps
    /// `latest` and stray files out of a directory scan).
    ///
    /// Examples:
    /// - "2.44" -> version="2.44", release="0"
    /// - "2.44-1" -> version="2.44", release="1"
    /// - "1.0-rc1-3" -> version="1.0-rc1", release="3"
    pub fn parse(s: &str) -> Option<Self> {
        if !s.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }

        let (version, release) = match s.rsplit_once('-') {
            Some((v, r)) if !r.is_empty() => (v, r),
            _ => (s, DEFAULT_RELEASE),
        };

        Some(Self {
            version: version.to_string(),
            release: release.to_string(),
        })
    }

    /// Compare two recipe versions
    pub fn compare(&self, other: &RecipeVersion) -> Ordering {
        let upstream = match (Version::parse(&self.version), Version::parse(&other.version)) {
            (Ok(v1), Ok(v2)) => v1.cmp(&v2),
            _ => compare_segments(&self.version, &other.version),
        };

        upstream.then_with(|| compare_segments(&self.release, &other.release))
    }
}

/// Segment-wise comparison of two version strings
///
/// Strings are split on any non-alphanumeric character and further into
/// runs of digits and letters: `1.10rc2` -> `1`, `10`, `rc`, `2`.
fn compare_segments(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let l_num = l.starts_with(|c: char| c.is_ascii_digit());
        let r_num = r.starts_with(|c: char| c.is_ascii_digit());

        let ord = match (l_num, r_num) {
            (true, true) => compare_numeric(l, r),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => l.cmp(r),
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}

/// Compare digit runs of arbitrary length without overflowing
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn segments(s: &str) -> Vec<&str> {
    let mut out = Vec::new();

    for chunk in s.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut start = 0;
        let bytes = chunk.as_bytes();
        for i in 1..bytes.len() {
            if bytes[i].is_ascii_digit() != bytes[i - 1].is_ascii_digit() {
                out.push(&chunk[start..i]);
                start = i;
            }
        }
        if start < chunk.len() {
            out.push(&chunk[start..]);
        }
    }

    out
}

impl fmt::Display for RecipeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.version, self.release)
    }
}

impl Ord for RecipeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for RecipeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
