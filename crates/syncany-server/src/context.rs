//! Security context names.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::validate;

/// A validated security context name (`[a-z0-9_-]+`).
///
/// Context names are used to build key-file and staging paths, so only this
/// type is accepted by the key store and the staging layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecurityContext(String);

impl SecurityContext {
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if !validate::is_context_name(&name) {
            return Err(ConfigError::InvalidContext);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SecurityContext {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SecurityContext {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
