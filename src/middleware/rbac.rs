// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    common::i18n::I18nStore,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::UserRole,
};

/// 1. O Trait que define um grupo de perfis autorizados
pub trait RoleDef: Send + Sync + 'static {
    fn name() -> &'static str;
    fn allowed() -> &'static [UserRole];

    fn permits(role: UserRole) -> bool {
        Self::allowed().contains(&role)
    }
}

/// 2. O Extractor (Guardião). Precisa rodar depois de um auth_guard/tenant_guard.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        let store = I18nStore::global();

        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, store))?;

        if !T::permits(user.0.role) {
            tracing::warn!(
                "⛔ Perfil {:?} do usuário {} não pode acessar rota de {}",
                user.0.role,
                user.0.id,
                T::name()
            );
            return Err(AppError::Forbidden(T::name().to_string()).to_api_error(&locale, store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// GRUPOS DE PERFIS
// ---

// Equipe do cliente: administra eventos, horários, agendamentos e revisão
pub struct Staff;
impl RoleDef for Staff {
    fn name() -> &'static str { "staff" }
    fn allowed() -> &'static [UserRole] { &[UserRole::Admin, UserRole::Organizer] }
}

pub struct TeacherOnly;
impl RoleDef for TeacherOnly {
    fn name() -> &'static str { "teacher" }
    fn allowed() -> &'static [UserRole] { &[UserRole::Teacher] }
}

pub struct ReviewerOnly;
impl RoleDef for ReviewerOnly {
    fn name() -> &'static str { "reviewer" }
    fn allowed() -> &'static [UserRole] { &[UserRole::Reviewer] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::auth::User;

    fn parts_with(role: Option<UserRole>) -> Parts {
        let (mut parts, _) = Request::builder()
            .header("accept-language", "pt-BR")
            .body(())
            .unwrap()
            .into_parts();
        if let Some(role) = role {
            parts.extensions.insert(AuthenticatedUser(User {
                id: Uuid::new_v4(),
                full_name: "Teste".into(),
                email: "teste@exemplo.com".into(),
                password_hash: String::new(),
                role,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }));
        }
        parts
    }

    #[tokio::test]
    async fn staff_group_accepts_organizer_and_admin() {
        for role in [UserRole::Admin, UserRole::Organizer] {
            let mut parts = parts_with(Some(role));
            assert!(RequireRole::<Staff>::from_request_parts(&mut parts, &()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn teacher_cannot_reach_staff_routes() {
        let mut parts = parts_with(Some(UserRole::Teacher));
        let err = RequireRole::<Staff>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(err.error.contains("staff"));
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let mut parts = parts_with(None);
        let err = RequireRole::<TeacherOnly>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }
}
