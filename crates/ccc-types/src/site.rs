//! Site hierarchy names.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fully qualified site name such as `Global/USA/San Jose/BLD23`.
///
/// The hierarchy always starts at `Global`; empty path components are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteHierarchy(String);

impl SiteHierarchy {
    /// The root of every site hierarchy.
    pub const ROOT: &'static str = "Global";

    /// Returns the hierarchy as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path components, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns the last component (the site's own name).
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(Self::ROOT)
    }

    /// Returns the parent hierarchy, or `None` for `Global`.
    pub fn parent(&self) -> Option<SiteHierarchy> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| SiteHierarchy(parent.to_string()))
    }

    /// Returns true if `self` equals `other` or lies below it.
    pub fn is_within(&self, other: &SiteHierarchy) -> bool {
        self.0 == other.0 || self.0.starts_with(&format!("{}/", other.0))
    }
}

impl fmt::Display for SiteHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SiteHierarchy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        let valid = trimmed
            .split('/')
            .next()
            .is_some_and(|root| root == Self::ROOT)
            && trimmed.split('/').all(|c| !c.trim().is_empty());
        if valid {
            Ok(SiteHierarchy(trimmed.to_string()))
        } else {
            Err(ParseError::InvalidSiteHierarchy(s.to_string()))
        }
    }
}

impl TryFrom<String> for SiteHierarchy {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SiteHierarchy> for String {
    fn from(site: SiteHierarchy) -> String {
        site.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_hierarchy() {
        let site: SiteHierarchy = "Global/USA/San Jose/BLD23/".parse().unwrap();
        assert_eq!(site.as_str(), "Global/USA/San Jose/BLD23");
        assert_eq!(site.name(), "BLD23");
        assert_eq!(site.components().count(), 4);
    }

    #[test]
    fn test_parent() {
        let site: SiteHierarchy = "Global/USA/San Jose".parse().unwrap();
        assert_eq!(site.parent().unwrap().as_str(), "Global/USA");
        let root: SiteHierarchy = "Global".parse().unwrap();
        assert!(root.parent().is_none());
    }

    #[test]
    fn test_is_within() {
        let area: SiteHierarchy = "Global/USA".parse().unwrap();
        let bld: SiteHierarchy = "Global/USA/SJC/BLD1".parse().unwrap();
        let other: SiteHierarchy = "Global/USAX".parse().unwrap();
        assert!(bld.is_within(&area));
        assert!(area.is_within(&area));
        assert!(!other.is_within(&area));
    }

    #[test]
    fn test_invalid_hierarchy() {
        assert!("USA/San Jose".parse::<SiteHierarchy>().is_err());
        assert!("Global//SJC".parse::<SiteHierarchy>().is_err());
        assert!("".parse::<SiteHierarchy>().is_err());
    }
}
