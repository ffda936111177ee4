// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// O cliente (tenant) que o usuário quer gerenciar nesta requisição.
// Depois do tenant_guard ele já vem validado nos extensions.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl TenantContext {
    pub fn from_header_value(value: Option<&str>) -> Result<Self, AppError> {
        value
            .map(str::trim)
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(TenantContext)
            .ok_or(AppError::InvalidTenantHeader)
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(*ctx);
        }

        let header_value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|value| value.to_str().ok());

        TenantContext::from_header_value(header_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uuid_header() {
        let id = Uuid::new_v4();
        let ctx = TenantContext::from_header_value(Some(&format!(" {} ", id))).unwrap();
        assert_eq!(ctx.0, id);
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(matches!(
            TenantContext::from_header_value(None),
            Err(AppError::InvalidTenantHeader)
        ));
        assert!(matches!(
            TenantContext::from_header_value(Some("loja-1")),
            Err(AppError::InvalidTenantHeader)
        ));
    }
}
