// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::common::error::AppError;
use crate::models::tenancy::{Tenant, UserTenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um utilizador faz parte da equipe de um tenant.
    /// Esta é a verificação de autorização mais importante das rotas de gestão.
    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_tenants
                WHERE user_id = $1 AND tenant_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn user_has_tenant_with_name(
        &self,
        user_id: Uuid,
        name: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tenants t
                JOIN user_tenants ut ON ut.tenant_id = t.id
                WHERE ut.user_id = $1 AND LOWER(t.name) = LOWER($2)
            )
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await?;

        Ok(tenant)
    }

    /// Atribui um utilizador a um tenant (na tabela-ponte).
    pub async fn add_member_to_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserTenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, UserTenant>(
            r#"
            INSERT INTO user_tenants (user_id, tenant_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation("membro já vinculado".into());
                }
            }
            e.into()
        })
    }

    pub async fn get_tenants_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.* FROM tenants t
            JOIN user_tenants ut ON ut.tenant_id = t.id
            WHERE ut.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tenants)
    }
}
