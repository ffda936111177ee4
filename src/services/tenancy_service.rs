// src/services/tenancy_service.rs

use crate::{
    common::error::AppError,
    db::{TenantRepository, UserRepository},
    models::{
        auth::UserRole,
        tenancy::{Tenant, UserTenant},
    },
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, user_repo: UserRepository, pool: PgPool) -> Self {
        Self { tenant_repo, user_repo, pool }
    }

    /// Cria um novo cliente (organização) e, atomicamente,
    /// vincula o usuário que o criou como primeiro membro da equipe.
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let already_exists = self
            .tenant_repo
            .user_has_tenant_with_name(owner_id, name)
            .await?;

        if already_exists {
            return Err(AppError::UniqueConstraintViolation(format!("cliente '{}'", name)));
        }

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o cliente
        let new_tenant = self
            .tenant_repo
            .create_tenant(&mut *tx, name, description)
            .await?;

        // 3. Vincula o dono
        self.tenant_repo
            .add_member_to_tenant(&mut *tx, new_tenant.id, owner_id)
            .await?;

        // 4. Commit
        tx.commit().await?;

        tracing::info!("🏢 Cliente '{}' criado por {}", new_tenant.name, owner_id);
        Ok(new_tenant)
    }

    /// Adiciona outro organizador (já cadastrado) à equipe do cliente.
    pub async fn add_staff_member(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<UserTenant, AppError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !matches!(user.role, UserRole::Admin | UserRole::Organizer) {
            return Err(AppError::Forbidden("staff".into()));
        }

        let membership = self
            .tenant_repo
            .add_member_to_tenant(&self.pool, tenant_id, user.id)
            .await?;

        tracing::info!("👥 Usuário {} adicionado à equipe do cliente {}", user.id, tenant_id);
        Ok(membership)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.get_tenants_for_user(user_id).await
    }
}
