//! Persistent identifiers for uploaded objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persistent identifier assigned to one object in the repository.
///
/// Pids are generated fresh for every upload and never reused. Values that
/// arrive as other scalar types (numbers, UUIDs) are normalized to their
/// string form on conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    /// Generates a new random (UUID v4) pid.
    pub fn generate() -> Self {
        Pid(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty pid, which never identifies an uploaded object.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Pid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Pid {
    fn from(value: String) -> Self {
        Pid(value)
    }
}

impl From<&str> for Pid {
    fn from(value: &str) -> Self {
        Pid(value.to_string())
    }
}

impl From<&Pid> for Pid {
    fn from(value: &Pid) -> Self {
        value.clone()
    }
}

impl From<Uuid> for Pid {
    fn from(value: Uuid) -> Self {
        Pid(value.to_string())
    }
}

impl From<u64> for Pid {
    fn from(value: u64) -> Self {
        Pid(value.to_string())
    }
}

impl From<i64> for Pid {
    fn from(value: i64) -> Self {
        Pid(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_pids_are_unique() {
        let a = Pid::generate();
        let b = Pid::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_scalar_pids_normalize_to_strings() {
        assert_eq!(Pid::from(42u64).as_str(), "42");
        assert_eq!(Pid::from(-7i64).to_string(), "-7");
        let uuid = Uuid::new_v4();
        assert_eq!(Pid::from(uuid).as_str(), uuid.to_string());
    }

    #[test]
    fn test_blank_pid_is_empty() {
        assert!(Pid::from("").is_empty());
        assert!(Pid::from("   ").is_empty());
        assert!(!Pid::from("urn:uuid:1").is_empty());
    }
}
