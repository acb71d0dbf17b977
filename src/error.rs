//! Error types for metadata decoding, schema validation, and trust decisions.

use std::fmt;

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw document could not be decoded as JSON at all.
    #[error("metadata document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded document does not satisfy the schema for its role.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An operational read of a payload that has not passed the trust gate.
    #[error("cannot use untrusted '{role}' metadata")]
    UntrustedMetadata {
        /// Role of the envelope whose payload was requested.
        role: String,
    },

    /// A rollback check was attempted between two different roles.
    #[error("rollback check requires matching roles: local is '{local}', remote is '{remote}'")]
    RoleMismatch {
        /// Role of the trusted metadata.
        local: String,
        /// Role of the incoming metadata.
        remote: String,
    },

    /// The incoming metadata failed a version comparison.
    #[error(transparent)]
    Rollback(#[from] RollbackAttack),
}

/// A rejected version transition between trusted and incoming metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollbackAttack {
    /// The incoming version is not the version the caller required.
    #[error(
        "remote '{role}' metadata version {remote_version} does not match the expected version {expected_version}"
    )]
    ExpectedVersion {
        /// Role of the metadata being checked.
        role: String,
        /// Version carried by the incoming document.
        remote_version: u64,
        /// Version the caller required the incoming document to have.
        expected_version: u64,
    },

    /// The incoming version is older than the version already trusted.
    #[error(
        "remote '{role}' metadata version {remote_version} is lower than the trusted version {local_version}"
    )]
    VersionRegression {
        /// Role of the metadata being checked.
        role: String,
        /// Version carried by the incoming document.
        remote_version: u64,
        /// Version of the currently trusted document.
        local_version: u64,
    },
}

/// A single schema violation, locating the offending field by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the field, e.g. `signed.spec_version`.
    pub path: String,
    /// What is wrong with the field, including the offending value.
    pub reason: String,
}

impl Violation {
    /// Creates a violation at `path` with the given reason.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Every violation found while validating one document against one role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{role}' metadata failed schema validation: {}", list_violations(.violations))]
pub struct SchemaError {
    /// Role whose schema the document was validated against.
    pub role: String,
    /// All violations found, not only the first.
    pub violations: Vec<Violation>,
}

fn list_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
