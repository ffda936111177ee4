// src/services/event_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{event_repo::NewEvent, scheduling_repo::SettingsInput, EventRepository, SchedulingSettingsRepository},
    models::{
        events::{CreateEventPayload, Event, EventToggles},
        scheduling::{parse_weekdays, SchedulingSettings, SchedulingSettingsPayload},
    },
};

#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    settings_repo: SchedulingSettingsRepository,
    clock: Clock,
    pool: PgPool,
}

impl EventService {
    pub fn new(
        event_repo: EventRepository,
        settings_repo: SchedulingSettingsRepository,
        clock: Clock,
        pool: PgPool,
    ) -> Self {
        Self { event_repo, settings_repo, clock, pool }
    }

    pub async fn create_event(
        &self,
        tenant_id: Uuid,
        payload: &CreateEventPayload,
    ) -> Result<Event, AppError> {
        if payload.end_date < payload.start_date {
            return Err(AppError::InvalidPeriod("data final antes da inicial".into()));
        }

        let input = NewEvent {
            name: payload.name.trim(),
            description: payload.description.as_deref(),
            location: payload.location.as_deref(),
            start_date: payload.start_date,
            end_date: payload.end_date,
            default_capacity: payload.default_capacity,
            is_public: payload.is_public,
            requires_approval: payload.requires_approval,
        };

        let event = self.event_repo.create_event(&self.pool, tenant_id, &input).await?;
        tracing::info!("📅 Evento '{}' criado no cliente {}", event.name, tenant_id);
        Ok(event)
    }

    pub async fn list_events(&self, tenant_id: Uuid) -> Result<Vec<Event>, AppError> {
        self.event_repo.list_events(&self.pool, tenant_id).await
    }

    pub async fn list_public_events(&self) -> Result<Vec<Event>, AppError> {
        self.event_repo.list_public_events(self.clock.today()).await
    }

    pub async fn get_event(&self, tenant_id: Uuid, event_id: Uuid) -> Result<Event, AppError> {
        self.event_repo
            .find_event(&self.pool, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))
    }

    pub async fn update_toggles(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        toggles: &EventToggles,
    ) -> Result<Event, AppError> {
        let event = self
            .event_repo
            .update_toggles(&self.pool, tenant_id, event_id, toggles)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        tracing::info!(
            "🔀 Evento {}: público={} aprovação={}",
            event.id,
            event.is_public,
            event.requires_approval
        );
        Ok(event)
    }

    /// Configuração salva ou, na falta dela, a política padrão do evento.
    pub async fn get_settings(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
    ) -> Result<SchedulingSettings, AppError> {
        let event = self.get_event(tenant_id, event_id).await?;
        let settings = self
            .settings_repo
            .find(event.id)
            .await?
            .unwrap_or_else(|| SchedulingSettings::defaults(event.id, tenant_id, event.default_capacity));
        Ok(settings)
    }

    pub async fn update_settings(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        payload: &SchedulingSettingsPayload,
    ) -> Result<SchedulingSettings, AppError> {
        if payload.day_end <= payload.day_start {
            return Err(AppError::InvalidPeriod("hora final deve ser depois da inicial".into()));
        }
        parse_weekdays(&payload.weekdays)?;

        let event = self.get_event(tenant_id, event_id).await?;

        let mut weekdays = payload.weekdays.clone();
        weekdays.sort_unstable();
        weekdays.dedup();

        let input = SettingsInput {
            cancellation_deadline_hours: payload.cancellation_deadline_hours,
            block_duration_days: payload.block_duration_days,
            default_capacity: payload.default_capacity,
            slot_minutes: payload.slot_minutes,
            day_start: payload.day_start,
            day_end: payload.day_end,
            weekdays,
        };

        let settings = self
            .settings_repo
            .upsert_settings(&self.pool, tenant_id, event.id, &input)
            .await?;

        tracing::info!("⚙️ Configuração de agendamento do evento {} atualizada", event.id);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn toggles_persist_and_none_keeps_the_flag(pool: PgPool) {
        let service = fixtures::event_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        assert!(event.is_public);

        service
            .update_toggles(
                tenant_id,
                event.id,
                &EventToggles { is_public: Some(false), requires_approval: Some(true) },
            )
            .await
            .unwrap();

        let stored = service.get_event(tenant_id, event.id).await.unwrap();
        assert!(!stored.is_public);
        assert!(stored.requires_approval);

        // Só uma flag informada: a outra fica como estava
        service
            .update_toggles(tenant_id, event.id, &EventToggles { is_public: Some(true), requires_approval: None })
            .await
            .unwrap();

        let stored = service.get_event(tenant_id, event.id).await.unwrap();
        assert!(stored.is_public);
        assert!(stored.requires_approval);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn toggles_of_another_tenant_are_not_found(pool: PgPool) {
        let service = fixtures::event_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let other_tenant = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;

        let result = service
            .update_toggles(other_tenant, event.id, &EventToggles { is_public: Some(false), requires_approval: None })
            .await;
        assert!(matches!(result, Err(AppError::ResourceNotFound(_))));
    }
}
