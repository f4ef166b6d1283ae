use minivault_mapper::BuildError;
use minivault_upstream::UpstreamError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A server-side credential or setting is absent. Holds the variable name.
    #[error("Missing configuration: {0}")]
    Configuration(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },
    /// A per-user credential is absent.
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ServiceError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<BuildError> for ServiceError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::InvalidNumber { field, value } => {
                Self::invalid(field, format!("expected a number, got `{value}`"))
            }
            BuildError::ReadOnly {
                field,
                property_type,
            } => Self::invalid(field, format!("{property_type} properties are read-only")),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
