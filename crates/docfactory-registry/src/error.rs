//! Error types for the template registry

use crate::validation::ValidationError;
use thiserror::Error;

/// Registry-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// Absent, or owned by another tenant. The two cases are deliberately
    /// indistinguishable.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Version {version} not found for template {template_id}")]
    VersionNotFound { template_id: String, version: u32 },

    #[error("Template already exists: {0}")]
    TemplateAlreadyExists(String),

    #[error("Version {version} already exists for template {template_id}")]
    VersionAlreadyExists { template_id: String, version: u32 },

    /// History only grows; a new entry must be numbered past the latest one
    #[error("Version {version} is not after latest version {latest} of template {template_id}")]
    VersionOutOfOrder {
        template_id: String,
        version: u32,
        latest: u32,
    },

    /// A full record carried a version other than the stored one
    #[error("Template {template_id} is at version {actual}, expected {expected}")]
    StaleVersion {
        template_id: String,
        expected: u32,
        actual: u32,
    },

    #[error("Template is deleted: {0}")]
    TemplateDeleted(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by transports to pick a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::TemplateNotFound(_) | RegistryError::VersionNotFound { .. } => {
                ErrorKind::NotFound
            }
            RegistryError::TemplateAlreadyExists(_)
            | RegistryError::VersionAlreadyExists { .. }
            | RegistryError::VersionOutOfOrder { .. }
            | RegistryError::StaleVersion { .. } => ErrorKind::Conflict,
            RegistryError::TemplateDeleted(_) | RegistryError::Validation(_) => {
                ErrorKind::InvalidInput
            }
            RegistryError::Storage(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
