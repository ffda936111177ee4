// src/services/booking_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{
        booking_repo::{BookingFilter, NewBooking},
        BookingRepository, EventRepository, SchedulingSettingsRepository, SlotRepository,
    },
    models::scheduling::{
        checkin_decision, BookingDetail, BookingStatus, CancellationResult, CheckinDecision,
        CheckinResult, CreateBookingPayload, SchedulingSettings, StudentWithNeeds, TeacherBlock,
        VisitBooking, VisitingStudent,
    },
    services::qrcode_service,
};

const LATE_CANCELLATION_REASON: &str = "Cancelamento fora do prazo";

// Token aleatório impresso no QR Code do agendamento
pub fn generate_checkin_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Clone)]
pub struct BookingService {
    booking_repo: BookingRepository,
    slot_repo: SlotRepository,
    event_repo: EventRepository,
    settings_repo: SchedulingSettingsRepository,
    clock: Clock,
    checkin_base_url: String,
    pool: PgPool,
}

impl BookingService {
    pub fn new(
        booking_repo: BookingRepository,
        slot_repo: SlotRepository,
        event_repo: EventRepository,
        settings_repo: SchedulingSettingsRepository,
        clock: Clock,
        checkin_base_url: String,
        pool: PgPool,
    ) -> Self {
        Self {
            booking_repo,
            slot_repo,
            event_repo,
            settings_repo,
            clock,
            checkin_base_url,
            pool,
        }
    }

    // =========================================================================
    //  PROFESSOR
    // =========================================================================

    /// Agenda uma visita: reserva as vagas e grava agendamento, alunos e
    /// materiais numa única transação.
    pub async fn create_booking(
        &self,
        teacher_id: Uuid,
        payload: &CreateBookingPayload,
    ) -> Result<BookingDetail, AppError> {
        let now = self.clock.now();
        let now_local = self.clock.to_local(now);

        let mut tx = self.pool.begin().await?;

        // 1. Horário (travado até o commit) e evento. A trava serializa
        //    pedidos concorrentes no mesmo horário antes das checagens abaixo.
        let tenant_id = self
            .slot_repo
            .find_by_id(&mut *tx, payload.slot_id)
            .await?
            .map(|slot| slot.tenant_id)
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        let slot = self
            .slot_repo
            .find_for_update(&mut *tx, tenant_id, payload.slot_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        let event = self
            .event_repo
            .find_event_by_id(&mut *tx, slot.event_id)
            .await?
            .filter(|event| event.is_public)
            .ok_or_else(|| AppError::ResourceNotFound("evento".into()))?;

        if slot.starts_at() <= now_local {
            return Err(AppError::SlotInThePast);
        }

        // 2. Bloqueio por cancelamento tardio
        if let Some(block) = self
            .booking_repo
            .find_active_block(&mut *tx, teacher_id, event.id, now)
            .await?
        {
            return Err(AppError::TeacherBlocked { until: block.blocked_until });
        }

        // 3. Um agendamento ativo por professor e horário
        if self
            .booking_repo
            .has_active_booking(&mut *tx, teacher_id, slot.id)
            .await?
        {
            return Err(AppError::DuplicateBooking);
        }

        // 4. Reserva das vagas (checagem prévia + UPDATE condicional)
        slot.check_reservation(payload.student_count)?;
        let reserved_slot = self
            .slot_repo
            .reserve_seats(&mut *tx, slot.tenant_id, slot.id, payload.student_count)
            .await?
            .ok_or(AppError::NotEnoughSeats {
                available: slot.available_seats,
                requested: payload.student_count,
            })?;

        // 5. Agendamento
        let status = if event.requires_approval {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };
        let token = generate_checkin_token();

        let booking = self
            .booking_repo
            .create_booking(
                &mut *tx,
                &NewBooking {
                    tenant_id: slot.tenant_id,
                    slot_id: slot.id,
                    teacher_id,
                    school_name: payload.school_name.trim(),
                    school_code: payload.school_code.as_deref(),
                    class_name: payload.class_name.trim(),
                    education_level: payload.education_level.trim(),
                    student_count: payload.student_count,
                    notes: payload.notes.as_deref(),
                    status,
                    checkin_token: &token,
                },
            )
            .await?;

        // 6. Alunos, necessidades especiais e materiais de apoio
        let mut students = Vec::with_capacity(payload.students.len());
        for student_payload in &payload.students {
            let student = self
                .booking_repo
                .add_student(
                    &mut *tx,
                    booking.id,
                    student_payload.full_name.trim(),
                    student_payload.document_number.as_deref(),
                )
                .await?;

            let mut special_needs = Vec::with_capacity(student_payload.special_needs.len());
            for need in &student_payload.special_needs {
                special_needs.push(
                    self.booking_repo
                        .add_special_need(&mut *tx, student.id, need.kind.trim(), need.description.as_deref())
                        .await?,
                );
            }
            students.push(StudentWithNeeds { student, special_needs });
        }

        let mut support_materials = Vec::with_capacity(payload.support_materials.len());
        for material in &payload.support_materials {
            support_materials.push(
                self.booking_repo
                    .add_support_material(
                        &mut *tx,
                        booking.id,
                        material.name.trim(),
                        material.description.as_deref(),
                        material.url.as_deref(),
                    )
                    .await?,
            );
        }

        tx.commit().await?;

        tracing::info!(
            "🏫 Agendamento {} ({:?}) criado: {} alunos no horário {} ({} vagas restantes)",
            booking.id,
            booking.status,
            booking.student_count,
            reserved_slot.id,
            reserved_slot.available_seats
        );

        Ok(BookingDetail {
            booking,
            slot: reserved_slot,
            students,
            support_materials,
        })
    }

    pub async fn list_teacher_bookings(&self, teacher_id: Uuid) -> Result<Vec<VisitBooking>, AppError> {
        self.booking_repo.list_for_teacher(&self.pool, teacher_id).await
    }

    pub async fn teacher_booking_detail(
        &self,
        teacher_id: Uuid,
        booking_id: Uuid,
    ) -> Result<BookingDetail, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(&self.pool, booking_id)
            .await?
            .filter(|b| b.teacher_id == teacher_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        self.load_detail(booking).await
    }

    /// Cancelamento pelo próprio professor. Fora do prazo gera bloqueio,
    /// mas o cancelamento acontece do mesmo jeito.
    pub async fn cancel_by_teacher(
        &self,
        teacher_id: Uuid,
        booking_id: Uuid,
    ) -> Result<CancellationResult, AppError> {
        let now = self.clock.now();
        let now_local = self.clock.to_local(now);

        let mut tx = self.pool.begin().await?;

        let booking = self
            .booking_repo
            .find_for_update(&mut *tx, booking_id)
            .await?
            .filter(|b| b.teacher_id == teacher_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        let releases_seats = booking.status.transition(BookingStatus::Cancelled)?;

        let slot = self
            .slot_repo
            .find_by_id(&mut *tx, booking.slot_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        if releases_seats {
            self.slot_repo
                .release_seats(&mut *tx, booking.tenant_id, slot.id, booking.student_count)
                .await?;
        }

        let cancelled = self
            .booking_repo
            .update_status(&mut *tx, booking.id, BookingStatus::Cancelled)
            .await?;

        // Penalidade
        let settings = self
            .settings_repo
            .get_settings(&mut *tx, slot.event_id)
            .await?
            .unwrap_or_else(|| SchedulingSettings::defaults(slot.event_id, booking.tenant_id, 0));

        let block = match settings.late_cancellation_block(slot.starts_at(), now_local) {
            Some(duration) => {
                let block = self
                    .booking_repo
                    .create_block(
                        &mut *tx,
                        &cancelled,
                        slot.event_id,
                        now,
                        now + duration,
                        LATE_CANCELLATION_REASON,
                    )
                    .await?;
                tracing::warn!(
                    "🚫 Professor {} bloqueado até {} (cancelamento tardio do agendamento {})",
                    teacher_id,
                    block.blocked_until,
                    booking.id
                );
                Some(block)
            }
            None => None,
        };

        tx.commit().await?;

        tracing::info!("↩️ Agendamento {} cancelado pelo professor", booking.id);
        Ok(CancellationResult { booking: cancelled, block })
    }

    /// PNG do QR Code de check-in, só para o dono do agendamento.
    pub async fn checkin_qrcode(&self, teacher_id: Uuid, booking_id: Uuid) -> Result<Vec<u8>, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(&self.pool, booking_id)
            .await?
            .filter(|b| b.teacher_id == teacher_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        if !booking.status.holds_seats() {
            return Err(AppError::CheckinNotAllowed(booking.status));
        }

        let url = qrcode_service::checkin_url(&self.checkin_base_url, &booking.checkin_token);
        qrcode_service::render_png(&url)
    }

    // =========================================================================
    //  EQUIPE DO CLIENTE
    // =========================================================================

    pub async fn list_bookings(
        &self,
        tenant_id: Uuid,
        filter: BookingFilter,
    ) -> Result<Vec<VisitBooking>, AppError> {
        self.booking_repo.list_for_tenant(&self.pool, tenant_id, filter).await
    }

    pub async fn booking_detail(&self, tenant_id: Uuid, booking_id: Uuid) -> Result<BookingDetail, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(&self.pool, booking_id)
            .await?
            .filter(|b| b.tenant_id == tenant_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        self.load_detail(booking).await
    }

    /// Aplica a máquina de estados. Sair de um estado que segura vagas para
    /// CANCELLED/REJECTED devolve as vagas ao horário.
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        booking_id: Uuid,
        next: BookingStatus,
    ) -> Result<VisitBooking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking = self
            .booking_repo
            .find_for_update(&mut *tx, booking_id)
            .await?
            .filter(|b| b.tenant_id == tenant_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        let releases_seats = booking.status.transition(next)?;
        if releases_seats {
            self.slot_repo
                .release_seats(&mut *tx, tenant_id, booking.slot_id, booking.student_count)
                .await?;
        }

        let updated = self.booking_repo.update_status(&mut *tx, booking.id, next).await?;
        tx.commit().await?;

        tracing::info!(
            "🔁 Agendamento {}: {:?} -> {:?}",
            booking.id,
            booking.status,
            updated.status
        );
        Ok(updated)
    }

    pub async fn set_student_presence(
        &self,
        tenant_id: Uuid,
        booking_id: Uuid,
        student_id: Uuid,
        present: bool,
    ) -> Result<VisitingStudent, AppError> {
        let booking = self
            .booking_repo
            .find_by_id(&self.pool, booking_id)
            .await?
            .filter(|b| b.tenant_id == tenant_id)
            .ok_or_else(|| AppError::ResourceNotFound("agendamento".into()))?;

        self.booking_repo
            .set_student_presence(&self.pool, booking.id, student_id, present)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("aluno".into()))
    }

    /// Check-in pelo token do QR Code. Repetir o mesmo token não muda nada.
    pub async fn checkin(&self, tenant_id: Uuid, token: &str) -> Result<CheckinResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking = self
            .booking_repo
            .find_by_token_for_update(&mut *tx, tenant_id, token.trim())
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("token de check-in".into()))?;

        if checkin_decision(booking.status, booking.checked_in)? == CheckinDecision::AlreadyCheckedIn {
            tx.commit().await?;
            return Ok(CheckinResult { booking, already_checked_in: true });
        }

        let updated = self
            .booking_repo
            .mark_checked_in(&mut *tx, booking.id, self.clock.now())
            .await?;
        tx.commit().await?;

        tracing::info!("✅ Check-in do agendamento {} realizado", updated.id);
        Ok(CheckinResult { booking: updated, already_checked_in: false })
    }

    pub async fn list_blocks(
        &self,
        tenant_id: Uuid,
        event_id: Option<Uuid>,
        only_active: bool,
    ) -> Result<Vec<TeacherBlock>, AppError> {
        let active_at = only_active.then(|| self.clock.now());
        self.booking_repo
            .list_blocks(&self.pool, tenant_id, event_id, active_at)
            .await
    }

    pub async fn lift_block(&self, tenant_id: Uuid, block_id: Uuid) -> Result<TeacherBlock, AppError> {
        let block = self
            .booking_repo
            .lift_block(&self.pool, tenant_id, block_id, self.clock.now())
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("bloqueio".into()))?;

        tracing::info!("🔓 Bloqueio {} do professor {} encerrado", block.id, block.teacher_id);
        Ok(block)
    }

    // Monta agendamento + horário + alunos (com necessidades) + materiais
    async fn load_detail(&self, booking: VisitBooking) -> Result<BookingDetail, AppError> {
        let slot = self
            .slot_repo
            .find_by_id(&self.pool, booking.slot_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("horário".into()))?;

        let students = self.booking_repo.list_students(&self.pool, booking.id).await?;
        let mut needs = self.booking_repo.list_special_needs(&self.pool, booking.id).await?;
        let support_materials = self
            .booking_repo
            .list_support_materials(&self.pool, booking.id)
            .await?;

        let students = students
            .into_iter()
            .map(|student| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    needs.drain(..).partition(|need| need.student_id == student.id);
                needs = rest;
                StudentWithNeeds { student, special_needs: mine }
            })
            .collect();

        Ok(BookingDetail { booking, slot, students, support_materials })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::fixtures, models::auth::UserRole};

    #[test]
    fn checkin_tokens_are_unique_and_url_safe() {
        let a = generate_checkin_token();
        let b = generate_checkin_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    async fn seats_left(pool: &PgPool, slot_id: Uuid) -> i32 {
        SlotRepository::new()
            .find_by_id(pool, slot_id)
            .await
            .unwrap()
            .unwrap()
            .available_seats
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn checkin_is_idempotent_per_token(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 20))
            .await
            .unwrap();
        assert_eq!(detail.booking.status, BookingStatus::Confirmed);
        let token = detail.booking.checkin_token.clone();

        let first = service.checkin(tenant_id, &token).await.unwrap();
        assert!(!first.already_checked_in);
        assert!(first.booking.checked_in);
        assert_eq!(first.booking.status, BookingStatus::Completed);

        let second = service.checkin(tenant_id, &token).await.unwrap();
        assert!(second.already_checked_in);
        assert_eq!(second.booking.checked_in_at, first.booking.checked_in_at);
        assert_eq!(second.booking.status, BookingStatus::Completed);

        // Concluir a visita não devolve vagas
        assert_eq!(seats_left(&pool, slot.id).await, 10);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn checkin_rejects_pending_booking_and_foreign_tenant(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let other_tenant = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, true).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 5))
            .await
            .unwrap();
        assert_eq!(detail.booking.status, BookingStatus::Pending);

        let pending = service.checkin(tenant_id, &detail.booking.checkin_token).await;
        assert!(matches!(pending, Err(AppError::CheckinNotAllowed(BookingStatus::Pending))));

        let foreign = service.checkin(other_tenant, &detail.booking.checkin_token).await;
        assert!(matches!(foreign, Err(AppError::ResourceNotFound(_))));
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn cancellation_restores_seats_exactly_once(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 12))
            .await
            .unwrap();
        assert_eq!(seats_left(&pool, slot.id).await, 18);

        service.cancel_by_teacher(teacher.id, detail.booking.id).await.unwrap();
        assert_eq!(seats_left(&pool, slot.id).await, 30);

        let again = service.cancel_by_teacher(teacher.id, detail.booking.id).await;
        assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
        assert_eq!(seats_left(&pool, slot.id).await, 30);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn refusal_restores_seats_exactly_once(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, true).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 7))
            .await
            .unwrap();
        assert_eq!(seats_left(&pool, slot.id).await, 23);

        let refused = service
            .update_status(tenant_id, detail.booking.id, BookingStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(refused.status, BookingStatus::Rejected);
        assert_eq!(seats_left(&pool, slot.id).await, 30);

        let again = service
            .update_status(tenant_id, detail.booking.id, BookingStatus::Cancelled)
            .await;
        assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
        assert_eq!(seats_left(&pool, slot.id).await, 30);
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn late_cancellation_writes_a_block(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        // Prazo de uma semana: a visita daqui a 3 dias já está dentro dele
        fixtures::penalty_policy(&pool, &event, 24 * 7, 5).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let other_slot = fixtures::slot(&pool, &event, 4, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 10))
            .await
            .unwrap();
        let result = service.cancel_by_teacher(teacher.id, detail.booking.id).await.unwrap();

        assert_eq!(result.booking.status, BookingStatus::Cancelled);
        let block = result.block.expect("cancelamento tardio gera bloqueio");
        assert_eq!(block.teacher_id, teacher.id);
        assert_eq!(block.booking_id, Some(detail.booking.id));
        assert_eq!(block.blocked_until - block.blocked_from, chrono::Duration::days(5));

        let stored = service.list_blocks(tenant_id, Some(event.id), true).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, block.id);

        // Bloqueado no evento inteiro
        let blocked = service
            .create_booking(teacher.id, &fixtures::booking_payload(other_slot.id, 1))
            .await;
        assert!(matches!(blocked, Err(AppError::TeacherBlocked { .. })));

        // Desbloqueio libera novo agendamento
        service.lift_block(tenant_id, block.id).await.unwrap();
        service
            .create_booking(teacher.id, &fixtures::booking_payload(other_slot.id, 1))
            .await
            .unwrap();
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn early_cancellation_has_no_block(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        fixtures::penalty_policy(&pool, &event, 24, 7).await;
        let slot = fixtures::slot(&pool, &event, 5, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;

        let detail = service
            .create_booking(teacher.id, &fixtures::booking_payload(slot.id, 10))
            .await
            .unwrap();
        let result = service.cancel_by_teacher(teacher.id, detail.booking.id).await.unwrap();

        assert!(result.block.is_none());
        assert!(service.list_blocks(tenant_id, None, false).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn concurrent_requests_keep_one_active_booking_per_teacher_and_slot(pool: PgPool) {
        let service = fixtures::booking_service(&pool);
        let tenant_id = fixtures::tenant(&pool).await;
        let event = fixtures::event(&pool, tenant_id, false).await;
        let slot = fixtures::slot(&pool, &event, 3, 30).await;
        let teacher = fixtures::user(&pool, UserRole::Teacher).await;
        let payload = fixtures::booking_payload(slot.id, 5);

        let (a, b) = tokio::join!(
            service.create_booking(teacher.id, &payload),
            service.create_booking(teacher.id, &payload),
        );

        let created = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(created, 1);
        let rejected = if a.is_err() { a } else { b };
        assert!(matches!(rejected, Err(AppError::DuplicateBooking)));
        assert_eq!(seats_left(&pool, slot.id).await, 25);

        // Depois de cancelar, o mesmo professor pode agendar de novo
        let active = service.list_teacher_bookings(teacher.id).await.unwrap();
        service.cancel_by_teacher(teacher.id, active[0].id).await.unwrap();
        service.create_booking(teacher.id, &payload).await.unwrap();
    }
}
