// Use-case errors
use crate::domain::permissions::Action;
use crate::domain::session::AccessDenied;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not permitted to {0}")]
    Forbidden(Action),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("backend request failed: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl From<AccessDenied> for ServiceError {
    fn from(denied: AccessDenied) -> Self {
        ServiceError::Forbidden(denied.0)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
