// src/db/slot_repo.rs

use chrono::{NaiveDate, NaiveTime};
use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::scheduling::VisitSlot,
};

// Janela já calculada pelo gerador de horários
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWindow {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Clone, Default)]
pub struct SlotRepository;

impl SlotRepository {
    pub fn new() -> Self {
        Self
    }

    /// Insere todas as janelas de uma vez (UNNEST), com vagas livres = capacidade.
    pub async fn insert_slots<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Uuid,
        capacity: i32,
        windows: &[SlotWindow],
    ) -> Result<Vec<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if windows.is_empty() {
            return Ok(Vec::new());
        }

        let dates: Vec<NaiveDate> = windows.iter().map(|w| w.date).collect();
        let starts: Vec<NaiveTime> = windows.iter().map(|w| w.start_time).collect();
        let ends: Vec<NaiveTime> = windows.iter().map(|w| w.end_time).collect();

        let slots = sqlx::query_as::<_, VisitSlot>(
            r#"
            INSERT INTO visit_slots (
                tenant_id, event_id, date, start_time, end_time, total_capacity, available_seats
            )
            SELECT $1, $2, w.date, w.start_time, w.end_time, $3, $3
            FROM UNNEST($4::date[], $5::time[], $6::time[]) AS w(date, start_time, end_time)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(capacity)
        .bind(&dates)
        .bind(&starts)
        .bind(&ends)
        .fetch_all(executor)
        .await?;

        Ok(slots)
    }

    pub async fn list_for_event<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<Vec<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slots = sqlx::query_as::<_, VisitSlot>(
            "SELECT * FROM visit_slots WHERE event_id = $1 ORDER BY date, start_time",
        )
        .bind(event_id)
        .fetch_all(executor)
        .await?;
        Ok(slots)
    }

    pub async fn list_between<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slots = sqlx::query_as::<_, VisitSlot>(
            r#"
            SELECT * FROM visit_slots
            WHERE event_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date, start_time
            "#,
        )
        .bind(event_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(slots)
    }

    // Vitrine do professor: só horários futuros com vaga
    pub async fn list_open<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
        from: NaiveDate,
    ) -> Result<Vec<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slots = sqlx::query_as::<_, VisitSlot>(
            r#"
            SELECT * FROM visit_slots
            WHERE event_id = $1 AND date >= $2 AND available_seats > 0
            ORDER BY date, start_time
            "#,
        )
        .bind(event_id)
        .bind(from)
        .fetch_all(executor)
        .await?;
        Ok(slots)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        slot_id: Uuid,
    ) -> Result<Option<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slot = sqlx::query_as::<_, VisitSlot>("SELECT * FROM visit_slots WHERE id = $1")
            .bind(slot_id)
            .fetch_optional(executor)
            .await?;
        Ok(slot)
    }

    // Trava a linha até o fim da transação
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        slot_id: Uuid,
    ) -> Result<Option<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slot = sqlx::query_as::<_, VisitSlot>(
            "SELECT * FROM visit_slots WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(slot_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(slot)
    }

    /// Único ponto do sistema que retira vagas de um horário.
    /// O UPDATE condicional garante que `available_seats` nunca fica negativo,
    /// mesmo com reservas concorrentes.
    pub async fn reserve_seats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        slot_id: Uuid,
        quantity: i32,
    ) -> Result<Option<VisitSlot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slot = sqlx::query_as::<_, VisitSlot>(
            r#"
            UPDATE visit_slots
            SET available_seats = available_seats - $3
            WHERE id = $1 AND tenant_id = $2 AND available_seats >= $3
            RETURNING *
            "#,
        )
        .bind(slot_id)
        .bind(tenant_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?;
        Ok(slot)
    }

    /// Único ponto que devolve vagas. Nunca passa da capacidade total.
    pub async fn release_seats<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        slot_id: Uuid,
        quantity: i32,
    ) -> Result<VisitSlot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slot = sqlx::query_as::<_, VisitSlot>(
            r#"
            UPDATE visit_slots
            SET available_seats = LEAST(total_capacity, available_seats + $3)
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(slot_id)
        .bind(tenant_id)
        .bind(quantity)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;
        Ok(slot)
    }

    pub async fn update_capacity<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        slot_id: Uuid,
        total_capacity: i32,
        available_seats: i32,
    ) -> Result<VisitSlot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let slot = sqlx::query_as::<_, VisitSlot>(
            r#"
            UPDATE visit_slots
            SET total_capacity = $3, available_seats = $4
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(slot_id)
        .bind(tenant_id)
        .bind(total_capacity)
        .bind(available_seats)
        .fetch_one(executor)
        .await?;
        Ok(slot)
    }

    pub async fn delete_slot<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        slot_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM visit_slots WHERE id = $1 AND tenant_id = $2")
            .bind(slot_id)
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;
    use sqlx::PgPool;

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn reserve_refuses_more_than_available(pool: PgPool) {
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 10).await;
        let repo = SlotRepository::new();

        let reserved = repo.reserve_seats(&pool, tenant_id, slot.id, 8).await.unwrap();
        assert_eq!(reserved.map(|s| s.available_seats), Some(2));

        let refused = repo.reserve_seats(&pool, tenant_id, slot.id, 3).await.unwrap();
        assert!(refused.is_none());

        let current = repo.find_by_id(&pool, slot.id).await.unwrap().unwrap();
        assert_eq!(current.available_seats, 2);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn release_never_exceeds_total_capacity(pool: PgPool) {
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 10).await;
        let repo = SlotRepository::new();

        repo.reserve_seats(&pool, tenant_id, slot.id, 4).await.unwrap();
        let released = repo.release_seats(&pool, tenant_id, slot.id, 4).await.unwrap();
        assert_eq!(released.available_seats, 10);

        // Devolução repetida não passa da capacidade
        let again = repo.release_seats(&pool, tenant_id, slot.id, 4).await.unwrap();
        assert_eq!(again.available_seats, again.total_capacity);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn slots_of_another_tenant_are_untouched(pool: PgPool) {
        let tenant_id = fixtures::tenant(&pool).await;
        let other_tenant = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 10).await;

        let reserved = SlotRepository::new()
            .reserve_seats(&pool, other_tenant, slot.id, 1)
            .await
            .unwrap();
        assert!(reserved.is_none());
    }
}
