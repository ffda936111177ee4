use chrono::NaiveTime;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::scheduling::SchedulingSettings,
};

pub struct SettingsInput {
    pub cancellation_deadline_hours: i32,
    pub block_duration_days: i32,
    pub default_capacity: i32,
    pub slot_minutes: i32,
    pub day_start: NaiveTime,
    pub day_end: NaiveTime,
    pub weekdays: Vec<i32>,
}

#[derive(Clone)]
pub struct SchedulingSettingsRepository {
    pool: PgPool,
}

impl SchedulingSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<Option<SchedulingSettings>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, SchedulingSettings>(
            "SELECT * FROM scheduling_settings WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(executor)
        .await?;

        Ok(settings)
    }

    pub async fn upsert_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        input: &SettingsInput,
    ) -> Result<SchedulingSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let settings = sqlx::query_as::<_, SchedulingSettings>(
            r#"
            INSERT INTO scheduling_settings (
                event_id, tenant_id, cancellation_deadline_hours, block_duration_days,
                default_capacity, slot_minutes, day_start, day_end, weekdays
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (event_id)
            DO UPDATE SET
                cancellation_deadline_hours = EXCLUDED.cancellation_deadline_hours,
                block_duration_days = EXCLUDED.block_duration_days,
                default_capacity = EXCLUDED.default_capacity,
                slot_minutes = EXCLUDED.slot_minutes,
                day_start = EXCLUDED.day_start,
                day_end = EXCLUDED.day_end,
                weekdays = EXCLUDED.weekdays,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(tenant_id)
        .bind(input.cancellation_deadline_hours)
        .bind(input.block_duration_days)
        .bind(input.default_capacity)
        .bind(input.slot_minutes)
        .bind(input.day_start)
        .bind(input.day_end)
        .bind(&input.weekdays)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }

    // Leitura fora de transação (tela de configuração)
    pub async fn find(&self, event_id: Uuid) -> Result<Option<SchedulingSettings>, AppError> {
        self.get_settings(&self.pool, event_id).await
    }
}
