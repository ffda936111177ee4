// src/services/scheduling_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{slot_repo::SlotWindow, BookingRepository, EventRepository, SchedulingSettingsRepository, SlotRepository},
    models::scheduling::{
        parse_weekdays, GenerateSlotsPayload, SchedulingSettings, SlotGenerationResult, VisitSlot,
    },
    services::slot_generator::SlotGrid,
};

#[derive(Clone)]
pub struct SchedulingService {
    event_repo: EventRepository,
    settings_repo: SchedulingSettingsRepository,
    slot_repo: SlotRepository,
    booking_repo: BookingRepository,
    clock: Clock,
    pool: PgPool,
}

impl SchedulingService {
    pub fn new(
        event_repo: EventRepository,
        settings_repo: SchedulingSettingsRepository,
        slot_repo: SlotRepository,
        booking_repo: BookingRepository,
        clock: Clock,
        pool: PgPool,
    ) -> Self {
        Self { event_repo, settings_repo, slot_repo, booking_repo, clock, pool }
    }

    /// Gera os horários de visitação de um evento no período pedido.
    pub async fn generate_slots(
        &self,
        tenant_id: Uuid,
        event_id: Uuid,
        payload: &GenerateSlotsPayload,
    ) -> Result<SlotGenerationResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Evento e configuração (ou padrão)
        let event = self
            .event_repo
            .find_event(&mut *tx, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        let settings = self
            .settings_repo
            .get_settings(&mut *tx, event.id)
            .await?
            .unwrap_or_else(|| SchedulingSettings::defaults(event.id, tenant_id, event.default_capacity));

        // 2. Parâmetros do payload sobrepõem a configuração
        let weekdays = parse_weekdays(payload.weekdays.as_deref().unwrap_or(settings.weekdays.as_slice()))?;
        let grid = SlotGrid {
            start_date: payload.start_date,
            end_date: payload.end_date,
            weekdays,
            day_start: payload.day_start.unwrap_or(settings.day_start),
            day_end: payload.day_end.unwrap_or(settings.day_end),
            slot_minutes: payload.slot_minutes.unwrap_or(settings.slot_minutes),
            capacity: payload.capacity.unwrap_or(settings.default_capacity),
        };
        grid.validate()?;

        if !event.contains(grid.start_date) || !event.contains(grid.end_date) {
            return Err(AppError::InvalidPeriod(format!(
                "o evento vai de {} a {}",
                event.start_date, event.end_date
            )));
        }

        // 3. Horários já existentes no período
        let existing: Vec<SlotWindow> = self
            .slot_repo
            .list_between(&mut *tx, event.id, grid.start_date, grid.end_date)
            .await?
            .into_iter()
            .map(|slot| SlotWindow {
                date: slot.date,
                start_time: slot.start_time,
                end_time: slot.end_time,
            })
            .collect();

        // 4. Planeja e grava
        let plan = grid.plan(&existing)?;
        let created = self
            .slot_repo
            .insert_slots(&mut *tx, tenant_id, event.id, grid.capacity, &plan.windows)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "🗓️ Evento {}: {} horários criados, {} ignorados por sobreposição",
            event.id,
            created.len(),
            plan.skipped
        );

        Ok(SlotGenerationResult { created, skipped: plan.skipped })
    }

    pub async fn list_slots(&self, tenant_id: Uuid, event_id: Uuid) -> Result<Vec<VisitSlot>, AppError> {
        let event = self
            .event_repo
            .find_event(&self.pool, tenant_id, event_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        self.slot_repo.list_for_event(&self.pool, event.id).await
    }

    /// Horários que um professor ainda pode agendar (evento público, futuro, com vaga).
    pub async fn list_open_slots(&self, event_id: Uuid) -> Result<Vec<VisitSlot>, AppError> {
        let event = self
            .event_repo
            .find_event_by_id(&self.pool, event_id)
            .await?
            .filter(|event| event.is_public)
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        let now_local = self.clock.now_local();
        let slots = self
            .slot_repo
            .list_open(&self.pool, event.id, now_local.date())
            .await?
            .into_iter()
            .filter(|slot| slot.starts_at() > now_local)
            .collect();
        Ok(slots)
    }

    pub async fn resize_slot(
        &self,
        tenant_id: Uuid,
        slot_id: Uuid,
        new_capacity: i32,
    ) -> Result<VisitSlot, AppError> {
        let mut tx = self.pool.begin().await?;

        let slot = self
            .slot_repo
            .find_for_update(&mut *tx, tenant_id, slot_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        let available = slot.resized_available_seats(new_capacity)?;
        let updated = self
            .slot_repo
            .update_capacity(&mut *tx, tenant_id, slot.id, new_capacity, available)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "📐 Horário {}: capacidade {} -> {} ({} livres)",
            slot.id,
            slot.total_capacity,
            updated.total_capacity,
            updated.available_seats
        );
        Ok(updated)
    }

    pub async fn remove_slot(&self, tenant_id: Uuid, slot_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let slot = self
            .slot_repo
            .find_for_update(&mut *tx, tenant_id, slot_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        if self.booking_repo.count_seat_holding(&mut *tx, slot.id).await? > 0 {
            return Err(AppError::SlotHasBookings);
        }

        self.slot_repo.delete_slot(&mut *tx, tenant_id, slot.id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Horário {} removido", slot.id);
        Ok(())
    }
}
