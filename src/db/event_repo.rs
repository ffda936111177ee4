// src/db/event_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::events::{Event, EventToggles},
};

// Dados de criação já validados pelo handler
pub struct NewEvent<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub default_capacity: i32,
    pub is_public: bool,
    pub requires_approval: bool,
}

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_event<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &NewEvent<'_>,
    ) -> Result<Event, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (
                tenant_id, name, description, location, start_date, end_date,
                default_capacity, is_public, requires_approval
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.name)
        .bind(input.description)
        .bind(input.location)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.default_capacity)
        .bind(input.is_public)
        .bind(input.requires_approval)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UniqueConstraintViolation(format!("evento '{}'", input.name));
                }
            }
            e.into()
        })
    }

    pub async fn list_events<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<Event>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE tenant_id = $1 ORDER BY start_date DESC, name ASC",
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(events)
    }

    // Vitrine pública: eventos marcados como públicos que ainda não terminaram
    pub async fn list_public_events(&self, today: NaiveDate) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE is_public = TRUE AND end_date >= $1
            ORDER BY start_date ASC
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn find_event<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<Event>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let event = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE id = $1 AND tenant_id = $2",
        )
        .bind(event_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(event)
    }

    // Usado pelas rotas do professor, que não carregam o header de tenant.
    // O tenant vem do próprio evento.
    pub async fn find_event_by_id<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<Option<Event>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(executor)
            .await?;
        Ok(event)
    }

    pub async fn update_toggles<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        toggles: &EventToggles,
    ) -> Result<Option<Event>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // COALESCE: flag ausente no payload mantém o valor atual
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET is_public = COALESCE($3, is_public),
                requires_approval = COALESCE($4, requires_approval),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(tenant_id)
        .bind(toggles.is_public)
        .bind(toggles.requires_approval)
        .fetch_optional(executor)
        .await?;
        Ok(event)
    }
}
