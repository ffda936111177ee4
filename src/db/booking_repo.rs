// src/db/booking_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::scheduling::{
        BookingStatus, SpecialNeed, SupportMaterial, TeacherBlock, VisitBooking, VisitingStudent,
    },
};

// Índice parcial: no máximo um PENDING/CONFIRMED por (professor, horário)
const ACTIVE_BOOKING_CONSTRAINT: &str = "uq_visit_bookings_active_teacher_slot";

pub struct NewBooking<'a> {
    pub tenant_id: Uuid,
    pub slot_id: Uuid,
    pub teacher_id: Uuid,
    pub school_name: &'a str,
    pub school_code: Option<&'a str>,
    pub class_name: &'a str,
    pub education_level: &'a str,
    pub student_count: i32,
    pub notes: Option<&'a str>,
    pub status: BookingStatus,
    pub checkin_token: &'a str,
}

// Filtros opcionais da listagem da equipe
#[derive(Debug, Default, Clone, Copy)]
pub struct BookingFilter {
    pub event_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
}

#[derive(Clone, Default)]
pub struct BookingRepository;

impl BookingRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  AGENDAMENTOS
    // =========================================================================

    pub async fn create_booking<'e, E>(
        &self,
        executor: E,
        input: &NewBooking<'_>,
    ) -> Result<VisitBooking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, VisitBooking>(
            r#"
            INSERT INTO visit_bookings (
                tenant_id, slot_id, teacher_id, school_name, school_code, class_name,
                education_level, student_count, notes, status, checkin_token
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(input.tenant_id)
        .bind(input.slot_id)
        .bind(input.teacher_id)
        .bind(input.school_name)
        .bind(input.school_code)
        .bind(input.class_name)
        .bind(input.education_level)
        .bind(input.student_count)
        .bind(input.notes)
        .bind(input.status)
        .bind(input.checkin_token)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(ACTIVE_BOOKING_CONSTRAINT)
                {
                    return AppError::DuplicateBooking;
                }
            }
            e.into()
        })?;
        Ok(booking)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Option<VisitBooking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, VisitBooking>(
            "SELECT * FROM visit_bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(executor)
        .await?;
        Ok(booking)
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Option<VisitBooking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, VisitBooking>(
            "SELECT * FROM visit_bookings WHERE id = $1 FOR UPDATE",
        )
        .bind(booking_id)
        .fetch_optional(executor)
        .await?;
        Ok(booking)
    }

    pub async fn find_by_token_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        token: &str,
    ) -> Result<Option<VisitBooking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, VisitBooking>(
            "SELECT * FROM visit_bookings WHERE checkin_token = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(token)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;
        Ok(booking)
    }

    pub async fn list_for_teacher<'e, E>(
        &self,
        executor: E,
        teacher_id: Uuid,
    ) -> Result<Vec<VisitBooking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bookings = sqlx::query_as::<_, VisitBooking>(
            r#"
            SELECT b.* FROM visit_bookings b
            JOIN visit_slots s ON s.id = b.slot_id
            WHERE b.teacher_id = $1
            ORDER BY s.date DESC, s.start_time DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(executor)
        .await?;
        Ok(bookings)
    }

    pub async fn list_for_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: BookingFilter,
    ) -> Result<Vec<VisitBooking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bookings = sqlx::query_as::<_, VisitBooking>(
            r#"
            SELECT b.* FROM visit_bookings b
            JOIN visit_slots s ON s.id = b.slot_id
            WHERE b.tenant_id = $1
              AND ($2::uuid IS NULL OR s.event_id = $2)
              AND ($3::booking_status IS NULL OR b.status = $3)
            ORDER BY s.date ASC, s.start_time ASC, b.created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.event_id)
        .bind(filter.status)
        .fetch_all(executor)
        .await?;
        Ok(bookings)
    }

    pub async fn has_active_booking<'e, E>(
        &self,
        executor: E,
        teacher_id: Uuid,
        slot_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM visit_bookings
                WHERE teacher_id = $1 AND slot_id = $2
                  AND status IN ('PENDING', 'CONFIRMED')
            )
            "#,
        )
        .bind(teacher_id)
        .bind(slot_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn count_seat_holding<'e, E>(
        &self,
        executor: E,
        slot_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM visit_bookings
            WHERE slot_id = $1 AND status IN ('PENDING', 'CONFIRMED')
            "#,
        )
        .bind(slot_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<VisitBooking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // cancelled_at só é preenchido na entrada em CANCELLED
        let booking = sqlx::query_as::<_, VisitBooking>(
            r#"
            UPDATE visit_bookings
            SET status = $2,
                cancelled_at = CASE WHEN $2 = 'CANCELLED'::booking_status THEN NOW() ELSE cancelled_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    pub async fn mark_checked_in<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<VisitBooking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, VisitBooking>(
            r#"
            UPDATE visit_bookings
            SET status = 'COMPLETED', checked_in = TRUE, checked_in_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(at)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    // =========================================================================
    //  ALUNOS, NECESSIDADES E MATERIAIS
    // =========================================================================

    pub async fn add_student<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        full_name: &str,
        document_number: Option<&str>,
    ) -> Result<VisitingStudent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let student = sqlx::query_as::<_, VisitingStudent>(
            r#"
            INSERT INTO visiting_students (booking_id, full_name, document_number)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(full_name)
        .bind(document_number)
        .fetch_one(executor)
        .await?;
        Ok(student)
    }

    pub async fn add_special_need<'e, E>(
        &self,
        executor: E,
        student_id: Uuid,
        kind: &str,
        description: Option<&str>,
    ) -> Result<SpecialNeed, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let need = sqlx::query_as::<_, SpecialNeed>(
            r#"
            INSERT INTO special_needs (student_id, kind, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(kind)
        .bind(description)
        .fetch_one(executor)
        .await?;
        Ok(need)
    }

    pub async fn add_support_material<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        name: &str,
        description: Option<&str>,
        url: Option<&str>,
    ) -> Result<SupportMaterial, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let material = sqlx::query_as::<_, SupportMaterial>(
            r#"
            INSERT INTO support_materials (booking_id, name, description, url)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(name)
        .bind(description)
        .bind(url)
        .fetch_one(executor)
        .await?;
        Ok(material)
    }

    pub async fn list_students<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Vec<VisitingStudent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let students = sqlx::query_as::<_, VisitingStudent>(
            "SELECT * FROM visiting_students WHERE booking_id = $1 ORDER BY full_name",
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
        Ok(students)
    }

    pub async fn list_special_needs<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Vec<SpecialNeed>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let needs = sqlx::query_as::<_, SpecialNeed>(
            r#"
            SELECT n.* FROM special_needs n
            JOIN visiting_students st ON st.id = n.student_id
            WHERE st.booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
        Ok(needs)
    }

    pub async fn list_support_materials<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
    ) -> Result<Vec<SupportMaterial>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let materials = sqlx::query_as::<_, SupportMaterial>(
            "SELECT * FROM support_materials WHERE booking_id = $1 ORDER BY name",
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
        Ok(materials)
    }

    pub async fn set_student_presence<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        student_id: Uuid,
        present: bool,
    ) -> Result<Option<VisitingStudent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let student = sqlx::query_as::<_, VisitingStudent>(
            r#"
            UPDATE visiting_students SET present = $3
            WHERE id = $2 AND booking_id = $1
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(student_id)
        .bind(present)
        .fetch_optional(executor)
        .await?;
        Ok(student)
    }

    // =========================================================================
    //  BLOQUEIOS DE PROFESSOR
    // =========================================================================

    pub async fn find_active_block<'e, E>(
        &self,
        executor: E,
        teacher_id: Uuid,
        event_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<TeacherBlock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, TeacherBlock>(
            r#"
            SELECT * FROM teacher_blocks
            WHERE teacher_id = $1 AND event_id = $2 AND blocked_until > $3
            ORDER BY blocked_until DESC
            LIMIT 1
            "#,
        )
        .bind(teacher_id)
        .bind(event_id)
        .bind(now)
        .fetch_optional(executor)
        .await?;
        Ok(block)
    }

    pub async fn create_block<'e, E>(
        &self,
        executor: E,
        booking: &VisitBooking,
        event_id: Uuid,
        blocked_from: DateTime<Utc>,
        blocked_until: DateTime<Utc>,
        reason: &str,
    ) -> Result<TeacherBlock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, TeacherBlock>(
            r#"
            INSERT INTO teacher_blocks (
                tenant_id, event_id, teacher_id, booking_id, blocked_from, blocked_until, reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(booking.tenant_id)
        .bind(event_id)
        .bind(booking.teacher_id)
        .bind(booking.id)
        .bind(blocked_from)
        .bind(blocked_until)
        .bind(reason)
        .fetch_one(executor)
        .await?;
        Ok(block)
    }

    pub async fn list_blocks<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        event_id: Option<Uuid>,
        active_at: Option<DateTime<Utc>>,
    ) -> Result<Vec<TeacherBlock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let blocks = sqlx::query_as::<_, TeacherBlock>(
            r#"
            SELECT * FROM teacher_blocks
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR event_id = $2)
              AND ($3::timestamptz IS NULL OR blocked_until > $3)
            ORDER BY blocked_until DESC
            "#,
        )
        .bind(tenant_id)
        .bind(event_id)
        .bind(active_at)
        .fetch_all(executor)
        .await?;
        Ok(blocks)
    }

    // Desbloqueio antecipado: o prazo passa a ser "agora"
    pub async fn lift_block<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        block_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<TeacherBlock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let block = sqlx::query_as::<_, TeacherBlock>(
            r#"
            UPDATE teacher_blocks
            SET blocked_until = LEAST(blocked_until, $3)
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(block_id)
        .bind(tenant_id)
        .bind(now)
        .fetch_optional(executor)
        .await?;
        Ok(block)
    }
}
