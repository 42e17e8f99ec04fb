use std::borrow::{Borrow, Cow};

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// Permission identifier.
///
/// Permissions are namespaced strings of the form `<module>.<action>`
/// (e.g. `"fee.collect"`). Both segments are lowercase ASCII letters, digits
/// or `_`. There is no wildcard: a master principal bypasses checks instead of
/// holding a special code.
///
/// A well-formed code is not necessarily a *known* code; membership in the
/// catalog is checked by [`crate::PermissionCatalog::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    /// Parse and validate the shape of a code.
    pub fn parse(code: impl Into<Cow<'static, str>>) -> Result<Self, ConfigurationError> {
        let code = code.into();
        if is_well_formed(&code) {
            Ok(Self(code))
        } else {
            Err(ConfigurationError::MalformedPermission(code.into_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `<module>` segment.
    pub fn module(&self) -> &str {
        self.split().0
    }

    /// The `<action>` segment.
    pub fn action(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        self.0.split_once('.').unwrap_or((&self.0, ""))
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

pub(crate) fn is_well_formed(code: &str) -> bool {
    match code.split_once('.') {
        Some((module, action)) => is_segment(module) && is_segment(action),
        None => false,
    }
}

impl Borrow<str> for PermissionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0.into_owned()
    }
}

impl core::str::FromStr for PermissionCode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn accepts_namespaced_codes() {
        let code = PermissionCode::parse("fee.collect").unwrap();
        assert_eq!(code.module(), "fee");
        assert_eq!(code.action(), "collect");
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "fee", "fee.", ".collect", "Fee.collect", "fee.collect.all", "fee collect", "*"] {
            assert!(
                matches!(PermissionCode::parse(bad), Err(ConfigurationError::MalformedPermission(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn set_lookup_by_str() {
        let set: HashSet<PermissionCode> = [PermissionCode::parse("student.read").unwrap()].into();
        assert!(set.contains("student.read"));
        assert!(!set.contains("student.delete"));
    }

    #[test]
    fn deserialize_validates() {
        let ok: PermissionCode = serde_json::from_str("\"exam.publish\"").unwrap();
        assert_eq!(ok.as_str(), "exam.publish");
        assert!(serde_json::from_str::<PermissionCode>("\"exam\"").is_err());
    }
}
