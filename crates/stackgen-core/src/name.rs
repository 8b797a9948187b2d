//! Logical resource names.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::{Error, Result};

/// Stable name of a resource within a stack.
///
/// Starts with an ASCII letter and contains only ASCII letters, digits, `-`
/// and `_`. Names key the synthesized manifest, so they never change once a
/// node has been declared.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct LogicalName(String);

impl LogicalName {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if !valid {
            return Err(Error::InvalidName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalName> for String {
    fn from(name: LogicalName) -> Self {
        name.0
    }
}

impl std::str::FromStr for LogicalName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for LogicalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LogicalName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LogicalName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
