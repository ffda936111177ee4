// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    common::error::{localize, ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::auth::User,
};

// Usuário autenticado, colocado nos extensions pelos guards
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

async fn authenticate(
    app_state: &AppState,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<User, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::InvalidToken)?;
    app_state.auth_service.validate_token(bearer.token()).await
}

// Rotas que exigem apenas login
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&app_state, bearer)
        .await
        .map_err(localize(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Rotas de gestão: login + header x-tenant-id + vínculo do usuário com o cliente
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let to_api = localize(&locale, &app_state.i18n_store);

    let user = authenticate(&app_state, bearer).await.map_err(&to_api)?;

    let header_value = request
        .headers()
        .get(crate::middleware::tenancy::TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok());
    let tenant = TenantContext::from_header_value(header_value).map_err(&to_api)?;

    let is_member = app_state
        .tenant_repo
        .check_user_tenancy(user.id, tenant.0)
        .await
        .map_err(&to_api)?;

    if !is_member {
        tracing::warn!(
            "⛔ Usuário {} tentou acessar o cliente {} sem vínculo",
            user.id,
            tenant.0
        );
        return Err(to_api(AppError::TenantAccessDenied));
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
