//! Domain primitive types used across the workspace.
//!
//! Lease and network identifiers both end up as path components under the
//! state directory, so they are validated once, at construction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InfraError, Result};

/// Rejects values that would escape or alias a directory when used as a
/// single path component.
fn validate_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(InfraError::InvalidRequest {
            message: format!("{kind} must not be empty"),
        });
    }
    if value == "." || value == ".." || value.contains('/') || value.contains('\0') {
        return Err(InfraError::InvalidRequest {
            message: format!("{kind} is not a valid path component: {value:?}"),
        });
    }
    Ok(())
}

/// Identifier of a lease, normally the owning container's ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LeaseId(String);

impl LeaseId {
    /// Creates a lease ID, validating it as a path component.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::InvalidRequest`] if the value is empty, `.`,
    /// `..`, or contains `/` or NUL.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_component("lease ID", &id)?;
        Ok(Self(id))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LeaseId {
    type Error = InfraError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LeaseId> for String {
    fn from(id: LeaseId) -> Self {
        id.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a CNI network, as found in a network configuration list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkName(String);

impl NetworkName {
    /// Creates a network name, validating it as a path component.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::InvalidRequest`] if the value is empty, `.`,
    /// `..`, or contains `/` or NUL.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_component("network name", &name)?;
        Ok(Self(name))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NetworkName {
    type Error = InfraError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NetworkName> for String {
    fn from(name: NetworkName) -> Self {
        name.0
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
