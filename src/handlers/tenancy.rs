// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, Staff},
        tenancy::TenantContext,
    },
    models::tenancy::{Tenant, UserTenant},
};

// O que o usuário envia para abrir um novo cliente
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    #[schema(example = "Museu de Ciências")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    #[schema(example = "equipe@museu.org")]
    pub email: String,
}

// POST /api/clientes
#[utoipa::path(
    post,
    path = "/api/clientes",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Cliente criado; o usuário vira membro", body = Tenant),
        (status = 409, description = "O usuário já tem um cliente com esse nome")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequireRole<Staff>,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let new_tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.name, payload.description.as_deref(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(new_tenant)))
}

// POST /api/gestao/membros
#[utoipa::path(
    post,
    path = "/api/gestao/membros",
    tag = "Tenancy",
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro da equipe adicionado", body = UserTenant),
        (status = 404, description = "Usuário não encontrado")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID do Cliente")),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    _guard: RequireRole<Staff>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let membership = app_state
        .tenant_service
        .add_staff_member(tenant.0, &payload.email)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(membership)))
}
