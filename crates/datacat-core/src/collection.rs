//! Validated collection names and the reserved namespace policy.

use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Prefixes of collections that are never reachable through the data API.
pub const RESERVED_PREFIXES: [&str; 2] = ["sys.", "system."];

/// Collection holding consumer records.
pub const CONSUMERS_COLLECTION: &str = "sys.consumers";

/// Collection holding key pair records.
pub const KEYS_COLLECTION: &str = "sys.keys";

/// Returns true when `name` falls under a reserved prefix (case-sensitive).
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Name of a document collection that has passed the namespace guard, or a
/// reserved collection selected by the service itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName(String);

impl CollectionName {
    /// Namespace guard for caller-supplied collection names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RestrictedCollection`] for names under a reserved
    /// prefix and [`CoreError::MissingParameters`] for an empty name.
    pub fn parse(name: &str) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(CoreError::MissingParameters("collection"));
        }
        if is_reserved(name) {
            return Err(CoreError::RestrictedCollection(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Reserved collection chosen by configuration, such as the dataset catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Internal`] when `name` is not under a reserved prefix.
    pub fn system(name: &str) -> CoreResult<Self> {
        if !is_reserved(name) {
            return Err(CoreError::internal(format!(
                "`{name}` is not a reserved collection"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// The consumer record collection.
    #[must_use]
    pub fn consumers() -> Self {
        Self(CONSUMERS_COLLECTION.to_string())
    }

    /// The key pair record collection.
    #[must_use]
    pub fn keys() -> Self {
        Self(KEYS_COLLECTION.to_string())
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for reserved collections.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        is_reserved(&self.0)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_reserved_prefixes() {
        for name in ["sys.consumers", "sys.anything", "system.users", "system."] {
            let err = CollectionName::parse(name).unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION", "{name}");
        }
    }

    #[test]
    fn test_guard_is_case_sensitive_exact_prefix() {
        for name in ["SYS.consumers", "System.users", "sys", "system", "sysadmin", "widgets"] {
            assert!(CollectionName::parse(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_empty_name_is_missing() {
        assert_eq!(
            CollectionName::parse("").unwrap_err().code(),
            "MISSING_PARAMETERS"
        );
    }

    #[test]
    fn test_system_constructor_requires_reserved_name() {
        assert!(CollectionName::system("sys.datasets").unwrap().is_reserved());
        assert!(CollectionName::system("datasets").is_err());
        assert_eq!(CollectionName::consumers().as_str(), CONSUMERS_COLLECTION);
        assert_eq!(CollectionName::keys().to_string(), KEYS_COLLECTION);
    }
}
