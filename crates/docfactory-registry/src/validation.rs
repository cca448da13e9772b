//! Structural checks run before every store mutation
//!
//! Validation is pure: it inspects a record and reports the first field that
//! breaks a rule. Enumerated fields are enforced by their Rust types, so the
//! only enum failure left is parsing an unknown string (see the `FromStr`
//! impls in [`crate::entities`]).

use crate::entities::{Template, TemplateVersion};
use thiserror::Error;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Field-level validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("name must be between 3 and 100 characters")]
    NameLength,

    #[error("description must be <= 500 characters")]
    DescriptionTooLong,

    #[error("{field} is invalid")]
    InvalidValue { field: &'static str },

    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
}

/// Records that can check their own structural rules
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn required(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

impl Validate for Template {
    fn validate(&self) -> Result<(), ValidationError> {
        required(self.tenant_id.as_ref(), "tenant_id")?;

        let name_len = self.name.trim().chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(ValidationError::NameLength);
        }
        if self.description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ValidationError::DescriptionTooLong);
        }

        required(&self.json_schema_url, "json_schema_url")?;
        required(self.created_by.as_ref(), "created_by")?;
        required(self.updated_by.as_ref(), "updated_by")?;
        if self.version == 0 {
            return Err(ValidationError::NotPositive { field: "version" });
        }
        Ok(())
    }
}

impl Validate for TemplateVersion {
    fn validate(&self) -> Result<(), ValidationError> {
        required(self.template_id.as_ref(), "template_id")?;
        if self.version_number == 0 {
            return Err(ValidationError::NotPositive {
                field: "version_number",
            });
        }
        required(&self.json_schema_url, "json_schema_url")?;
        required(self.created_by.as_ref(), "created_by")
    }
}
