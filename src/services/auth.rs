// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ReviewRepository, UserRepository},
    models::auth::{Claims, User, UserRole},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    review_repo: ReviewRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        review_repo: ReviewRepository,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, review_repo, jwt_secret, pool }
    }

    pub async fn register_user(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<String, AppError> {
        if !role.is_self_assignable() {
            return Err(AppError::Forbidden("ADMIN".into()));
        }

        // 1. Hashing fora do runtime async
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Cria o usuário e, se for revisor, vincula os cadastros feitos
        //    antes do registro (mesmo e-mail, ainda sem conta)
        let email = email.trim().to_lowercase();
        let mut tx = self.pool.begin().await?;

        let new_user = self
            .user_repo
            .create_user(&mut *tx, full_name.trim(), &email, &hashed_password, role)
            .await?;

        if new_user.role == UserRole::Reviewer {
            let linked = self
                .review_repo
                .link_reviewer_accounts(&mut *tx, new_user.id, &email)
                .await?;
            if linked > 0 {
                tracing::info!("🔗 {} cadastro(s) de revisor vinculados ao usuário {}", linked, new_user.id);
            }
        }

        tx.commit().await?;

        tracing::info!("👤 Novo usuário {} ({:?})", new_user.id, new_user.role);

        // 3. Gera o token
        create_token(&self.jwt_secret, new_user.id, Utc::now())
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        create_token(&self.jwt_secret, user.id, Utc::now())
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }
}

pub fn create_token(secret: &str, user_id: Uuid, now: DateTime<Utc>) -> Result<String, AppError> {
    let expires_at = now + Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject() {
        let user_id = Uuid::new_v4();
        let token = create_token("segredo", user_id, Utc::now()).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("segredo", Uuid::new_v4(), Utc::now()).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::days(TOKEN_TTL_DAYS + 1);
        let token = create_token("segredo", Uuid::new_v4(), issued).unwrap();
        assert!(matches!(decode_token("segredo", &token), Err(AppError::InvalidToken)));
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn reviewer_registering_later_is_linked_to_existing_records(pool: PgPool) {
        use crate::db::{fixtures, ReviewRepository};

        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let reviews = fixtures::review_service(&pool);

        let reviewer = reviews
            .create_reviewer(
                tenant_id,
                event.id,
                &fixtures::reviewer_payload("Carla Souza", "carla@universidade.br", 3),
            )
            .await
            .unwrap();
        assert!(reviewer.user_id.is_none());

        let service = fixtures::auth_service(&pool);
        let token = service
            .register_user("Carla Souza", " Carla@Universidade.br ", "senha-forte", UserRole::Reviewer)
            .await
            .unwrap();
        let user = service.validate_token(&token).await.unwrap();

        let linked = ReviewRepository::new()
            .find_reviewer(&pool, tenant_id, reviewer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.user_id, Some(user.id));
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn other_roles_are_not_linked_to_reviewer_records(pool: PgPool) {
        use crate::db::{fixtures, ReviewRepository};

        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let reviewer = fixtures::review_service(&pool)
            .create_reviewer(
                tenant_id,
                event.id,
                &fixtures::reviewer_payload("Davi Rocha", "davi@escola.br", 3),
            )
            .await
            .unwrap();

        fixtures::auth_service(&pool)
            .register_user("Davi Rocha", "davi@escola.br", "senha-forte", UserRole::Teacher)
            .await
            .unwrap();

        let stored = ReviewRepository::new()
            .find_reviewer(&pool, tenant_id, reviewer.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.user_id.is_none());
    }
}
