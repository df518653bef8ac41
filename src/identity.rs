use std::fmt;

/// An approver reference: an individual account handle or a team handle.
///
/// Rule documents conventionally write approvers with a leading `@` sigil
/// (`@alice`, `@org/security`); the sigil is stripped on construction so that
/// `@alice` and `alice` denote the same identity. Comparison of the stored
/// form is exact-string and case-sensitive, matching the hosting platform's
/// canonical handles.
///
/// # Example
///
/// ```
/// use mergecap::Identity;
///
/// let user = Identity::new("@alice");
/// assert_eq!(user.as_str(), "alice");
/// assert!(!user.is_team());
///
/// let team = Identity::new("org/security");
/// assert!(team.is_team());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "events",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String")
)]
pub struct Identity(String);

impl Identity {
    /// Creates an identity from a handle, stripping a single leading `@`.
    pub fn new(handle: impl AsRef<str>) -> Self {
        let handle = handle.as_ref();
        Self(handle.strip_prefix('@').unwrap_or(handle).to_string())
    }

    /// Returns the canonical handle, without the `@` sigil.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is a team handle (`org/team`).
    pub fn is_team(&self) -> bool {
        self.0.contains('/')
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(handle: &str) -> Self {
        Self::new(handle)
    }
}

impl From<String> for Identity {
    fn from(handle: String) -> Self {
        Self::new(handle)
    }
}
