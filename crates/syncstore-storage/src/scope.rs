//! Tenant scopes and wildcard scope patterns.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `(resource_name, parent_id)` boundary isolating objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Scope {
    pub resource_name: String,
    pub parent_id: String,
}

impl Scope {
    pub fn new(resource_name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            parent_id: parent_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_name, self.parent_id)
    }
}

/// Selects one or more scopes for reads, bulk deletes and purges.
///
/// A `parent_id` ending with `*` matches every parent id starting with the
/// literal part before it; any other value matches exactly. `*` is only
/// special in trailing position. A `None` resource name matches every
/// resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePattern {
    pub resource_name: Option<String>,
    pub parent_id: String,
}

impl ScopePattern {
    pub fn new(resource_name: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            resource_name: Some(resource_name.into()),
            parent_id: parent_id.into(),
        }
    }

    /// Matches the parent id under every resource name.
    pub fn any_resource(parent_id: impl Into<String>) -> Self {
        Self {
            resource_name: None,
            parent_id: parent_id.into(),
        }
    }

    /// Whether the parent id is a trailing-wildcard prefix pattern.
    pub fn is_wildcard(&self) -> bool {
        self.parent_id.ends_with('*')
    }

    /// Returns the single scope this pattern denotes, if it is exact.
    pub fn exact(&self) -> Option<Scope> {
        match (&self.resource_name, self.is_wildcard()) {
            (Some(resource_name), false) => Some(Scope::new(resource_name, &self.parent_id)),
            _ => None,
        }
    }

    pub fn matches(&self, scope: &Scope) -> bool {
        if let Some(resource_name) = &self.resource_name
            && resource_name != &scope.resource_name
        {
            return false;
        }
        match self.parent_id.strip_suffix('*') {
            Some(prefix) => scope.parent_id.starts_with(prefix),
            None => scope.parent_id == self.parent_id,
        }
    }
}

impl From<&Scope> for ScopePattern {
    fn from(scope: &Scope) -> Self {
        Self::new(&scope.resource_name, &scope.parent_id)
    }
}

impl From<Scope> for ScopePattern {
    fn from(scope: Scope) -> Self {
        Self {
            resource_name: Some(scope.resource_name),
            parent_id: scope.parent_id,
        }
    }
}

impl fmt::Display for ScopePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.resource_name.as_deref().unwrap_or("*"),
            self.parent_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        let pattern = ScopePattern::new("test", "abc");
        assert!(pattern.matches(&Scope::new("test", "abc")));
        assert!(!pattern.matches(&Scope::new("test", "abcd")));
        assert!(!pattern.matches(&Scope::new("other", "abc")));
        assert_eq!(pattern.exact(), Some(Scope::new("test", "abc")));
    }

    #[test]
    fn test_trailing_wildcard_is_prefix_match() {
        let pattern = ScopePattern::new("test", "ab*");
        assert!(pattern.matches(&Scope::new("test", "ab")));
        assert!(pattern.matches(&Scope::new("test", "abc")));
        assert!(!pattern.matches(&Scope::new("test", "xab")));
        assert!(!pattern.matches(&Scope::new("test", "efg")));
        assert_eq!(pattern.exact(), None);
    }

    #[test]
    fn test_inner_star_is_literal() {
        let pattern = ScopePattern::new("test", "a*c");
        assert!(pattern.matches(&Scope::new("test", "a*c")));
        assert!(!pattern.matches(&Scope::new("test", "abc")));
    }

    #[test]
    fn test_any_resource() {
        let pattern = ScopePattern::any_resource("/buckets/a*");
        assert!(pattern.matches(&Scope::new("collection", "/buckets/abc")));
        assert!(pattern.matches(&Scope::new("record", "/buckets/a/collections/b")));
        assert!(!pattern.matches(&Scope::new("record", "/buckets/b")));
        assert_eq!(pattern.to_string(), "*//buckets/a*");
    }
}
