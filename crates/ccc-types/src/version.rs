//! Catalyst Center release numbers and range checks.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A Catalyst Center release number such as `2.3.7.9`.
///
/// Versions compare segment-wise as integers, so `2.3.7.10 > 2.3.7.9`.
/// Missing trailing segments count as zero (`2.3.7 == 2.3.7.0`). Anything
/// after the first `-` (for example the build number in `2.3.7.6-70045`)
/// is kept for display but ignored when ordering.
///
/// # Examples
///
/// ```
/// use ccc_types::CccVersion;
///
/// let old: CccVersion = "2.3.7.9".parse().unwrap();
/// let new: CccVersion = "2.3.7.10".parse().unwrap();
/// assert!(new > old);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CccVersion {
    segments: Vec<u32>,
    suffix: Option<String>,
}

impl CccVersion {
    /// Creates a version from numeric segments.
    pub fn new(segments: impl Into<Vec<u32>>) -> Self {
        Self {
            segments: segments.into(),
            suffix: None,
        }
    }

    /// Returns the numeric segments.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Returns the build suffix, if any.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Returns true if `self >= other`.
    pub fn at_least(&self, other: &CccVersion) -> bool {
        self >= other
    }

    /// Returns true if `self <= other`.
    pub fn at_most(&self, other: &CccVersion) -> bool {
        self <= other
    }

    fn segment(&self, idx: usize) -> u32 {
        self.segments.get(idx).copied().unwrap_or(0)
    }
}

impl PartialEq for CccVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CccVersion {}

impl PartialOrd for CccVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CccVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for CccVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .segments
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match &self.suffix {
            Some(suffix) => write!(f, "{}-{}", joined, suffix),
            None => write!(f, "{}", joined),
        }
    }
}

impl FromStr for CccVersion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (numeric, suffix) = match trimmed.split_once('-') {
            Some((n, sfx)) => (n, Some(sfx.to_string())),
            None => (trimmed, None),
        };

        if numeric.is_empty() {
            return Err(ParseError::InvalidVersion(s.to_string()));
        }

        let segments = numeric
            .split('.')
            .map(|seg| seg.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseError::InvalidVersion(s.to_string()))?;

        Ok(Self { segments, suffix })
    }
}

impl TryFrom<String> for CccVersion {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CccVersion> for String {
    fn from(v: CccVersion) -> String {
        v.to_string()
    }
}

/// Compares two dotted version strings.
///
/// Returns `None` if either side fails to parse.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a: CccVersion = a.parse().ok()?;
    let b: CccVersion = b.parse().ok()?;
    Some(a.cmp(&b))
}

/// An inclusive version range; either bound may be open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: Option<CccVersion>,
    pub max: Option<CccVersion>,
}

impl VersionRange {
    /// Range covering every version.
    pub fn any() -> Self {
        Self::default()
    }

    /// Range `[min, max]`.
    pub fn between(min: CccVersion, max: CccVersion) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Range `[min, ∞)`.
    pub fn from(min: CccVersion) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Range `(-∞, max]`.
    pub fn up_to(max: CccVersion) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    /// Returns true if `version` lies inside the range.
    pub fn contains(&self, version: &CccVersion) -> bool {
        let above_min = self.min.as_ref().map_or(true, |min| version >= min);
        let below_max = self.max.as_ref().map_or(true, |max| version <= max);
        above_min && below_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn v(s: &str) -> CccVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("2.3.7.10") > v("2.3.7.9"));
        assert!(v("2.3.10.0") > v("2.3.9.99"));
    }

    #[test]
    fn test_missing_segments_are_zero() {
        assert_eq!(v("2.3.7"), v("2.3.7.0"));
        assert!(v("2.3.7.1") > v("2.3.7"));
    }

    #[test]
    fn test_suffix_ignored_for_ordering() {
        let with_build = v("2.3.7.6-70045");
        assert_eq!(with_build, v("2.3.7.6"));
        assert_eq!(with_build.suffix(), Some("70045"));
        assert_eq!(with_build.to_string(), "2.3.7.6-70045");
    }

    #[test]
    fn test_invalid_versions() {
        assert!("".parse::<CccVersion>().is_err());
        assert!("2.x.7".parse::<CccVersion>().is_err());
        assert!("2..7".parse::<CccVersion>().is_err());
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("2.3.5.3", "2.3.5.3"), Some(Ordering::Equal));
        assert_eq!(compare_versions("2.2.3.3", "2.3.5.3"), Some(Ordering::Less));
        assert_eq!(compare_versions("bogus", "2.3.5.3"), None);
    }

    #[test]
    fn test_version_range() {
        let range = VersionRange::between(v("2.2.3.3"), v("2.3.5.3"));
        assert!(range.contains(&v("2.2.3.3")));
        assert!(range.contains(&v("2.3.5.3")));
        assert!(!range.contains(&v("2.3.7.6")));

        assert!(VersionRange::from(v("2.3.7.6")).contains(&v("3.1.0")));
        assert!(VersionRange::up_to(v("2.3.5.3")).contains(&v("2.1")));
        assert!(VersionRange::any().contains(&v("1.0")));
    }

    #[test]
    fn test_into_string() {
        assert_eq!(String::from(v("2.3.7.9")), "2.3.7.9");
    }
}
