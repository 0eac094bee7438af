//! Validated table identifiers.
//!
//! Table names flow into rendered statement text, so they are restricted to
//! a character set that needs no escaping beyond identifier quoting.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{IDENTIFIER_EXTRA_CHARS, MAX_IDENTIFIER_LEN};
use crate::error::{SpitsError, SpitsResult};

/// A validated table name.
///
/// Valid names are 1 to [`MAX_IDENTIFIER_LEN`] bytes of ASCII letters,
/// digits, `_` and `$`, and do not start with a digit.
///
/// # Example
///
/// ```rust
/// use spits_common::TableName;
///
/// let name = TableName::new("test_users").unwrap();
/// assert_eq!(name.to_string(), "test_users");
///
/// assert!(TableName::new("users; DROP TABLE x").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a table name, validating it.
    pub fn new(name: impl Into<String>) -> SpitsResult<Self> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a new name with `prefix` prepended.
    ///
    /// The result is validated, so a prefix that pushes the name past the
    /// identifier limit is an error.
    pub fn with_prefix(&self, prefix: &str) -> SpitsResult<Self> {
        Self::new(format!("{}{}", prefix, self.0))
    }

    /// Returns the name with `prefix` removed, or `None` if the name does
    /// not start with it or nothing would remain.
    pub fn strip_prefix(&self, prefix: &str) -> Option<Self> {
        self.0
            .strip_prefix(prefix)
            .and_then(|rest| Self::new(rest).ok())
    }
}

fn validate(name: &str) -> SpitsResult<()> {
    let invalid = |reason: &str| SpitsError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("identifier is empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(&format!(
            "identifier is longer than {} bytes",
            MAX_IDENTIFIER_LEN
        )));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("identifier starts with a digit"));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !IDENTIFIER_EXTRA_CHARS.contains(c))
    {
        return Err(invalid(&format!("character {:?} is not allowed", c)));
    }
    Ok(())
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TableName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TableName {
    type Error = SpitsError;

    fn try_from(value: String) -> SpitsResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TableName {
    type Error = SpitsError;

    fn try_from(value: &str) -> SpitsResult<Self> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["users", "test_users", "_private", "a1", "$temp$users", "T"] {
            assert!(TableName::new(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        for name in [
            "",
            "1users",
            "users;",
            "drop table",
            "users`",
            "us\"ers",
            "naïve",
            too_long.as_str(),
        ] {
            let err = TableName::new(name).unwrap_err();
            assert!(matches!(err, SpitsError::InvalidIdentifier { .. }));
        }
    }

    #[test]
    fn test_prefix_round_trip() {
        let name = TableName::new("orders").unwrap();
        let prefixed = name.with_prefix("$temp$").unwrap();
        assert_eq!(prefixed.as_str(), "$temp$orders");
        assert_eq!(prefixed.strip_prefix("$temp$"), Some(name.clone()));
        assert_eq!(name.strip_prefix("$temp$"), None);
    }

    #[test]
    fn test_prefix_respects_limit() {
        let name = TableName::new("y".repeat(MAX_IDENTIFIER_LEN)).unwrap();
        assert!(name.with_prefix("$temp$").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let name: TableName = from_toml("\"accounts\"").unwrap();
        assert_eq!(name.as_str(), "accounts");
        assert!(from_toml("\"bad name\"").is_err());
    }

    // toml has no bare-string documents, so wrap the value in a table.
    fn from_toml(quoted: &str) -> Result<TableName, toml::de::Error> {
        #[derive(Deserialize)]
        struct Wrapper {
            name: TableName,
        }
        let doc = format!("name = {}", quoted);
        toml::from_str::<Wrapper>(&doc).map(|w| w.name)
    }
}
