//! Party identity
//!
//! An [`Identity`] is an opaque address-like token. The ledger never interprets
//! its contents; it only compares them. Comparison is case-insensitive, so the
//! token is normalized (trimmed and lowercased) once at construction and all
//! later comparisons are plain string equality.

use super::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, case-insensitive party identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create an identity from any string-like token
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidIdentity`] if the token is empty after trimming.
    pub fn new(token: impl AsRef<str>) -> Result<Self, LedgerError> {
        let normalized = token.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(LedgerError::invalid_identity(token.as_ref()));
        }
        Ok(Identity(normalized))
    }

    /// The normalized token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identity {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lowercase("0xabc", "0xabc")]
    #[case::mixed_case("0xAbC", "0xabc")]
    #[case::padded("  0xABC\t", "0xabc")]
    fn test_identity_normalization(#[case] raw: &str, #[case] expected: &str) {
        let identity = Identity::new(raw).unwrap();
        assert_eq!(identity.as_str(), expected);
    }

    #[test]
    fn test_identity_equality_ignores_case() {
        assert_eq!(
            Identity::new("0xDEADbeef").unwrap(),
            "0xdeadBEEF".parse::<Identity>().unwrap()
        );
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    fn test_identity_rejects_blank(#[case] raw: &str) {
        assert!(matches!(
            Identity::new(raw),
            Err(LedgerError::InvalidIdentity { .. })
        ));
    }
}
