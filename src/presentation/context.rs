// Caller context extraction from gateway headers
use crate::domain::permissions::Role;
use crate::domain::session::RequestContext;
use crate::presentation::errors::ApiError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

pub const STORE_ID_HEADER: &str = "x-store-id";
pub const EMPLOYEE_ID_HEADER: &str = "x-employee-id";
pub const ROLES_HEADER: &str = "x-roles";

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
}

/// Parse a comma-separated role list such as `Technician, Spa Expert`.
pub fn parse_roles(raw: &str) -> Result<Vec<Role>, ApiError> {
    let mut roles = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role = part
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    if roles.is_empty() {
        return Err(ApiError::Unauthorized(format!("empty {} header", ROLES_HEADER)));
    }
    Ok(roles)
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store_id = required_header(&parts.headers, STORE_ID_HEADER)?;
        let employee_id = required_header(&parts.headers, EMPLOYEE_ID_HEADER)?;
        let roles = parse_roles(required_header(&parts.headers, ROLES_HEADER)?)?;

        Ok(RequestContext::new(store_id, employee_id, roles))
    }
}
