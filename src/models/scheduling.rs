// src/models/scheduling.rs

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::error::AppError;

// =============================================================================
//  STATUS DO AGENDAMENTO
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rejected,
    Completed,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Rejected,
        BookingStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Enquanto pendente ou confirmado, o agendamento segura vagas do horário.
    pub fn holds_seats(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    /// Valida a transição. Devolve `true` quando as vagas devem voltar ao horário.
    pub fn transition(self, next: BookingStatus) -> Result<bool, AppError> {
        if !self.can_transition_to(next) {
            return Err(AppError::InvalidTransition { from: self, to: next });
        }
        Ok(self.holds_seats() && !next.holds_seats() && next != BookingStatus::Completed)
    }
}

// O que fazer ao ler um token de check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckinDecision {
    /// Token já usado: devolve o agendamento sem alterar nada.
    AlreadyCheckedIn,
    /// Primeira leitura de um agendamento confirmado.
    CheckIn,
}

/// Repetir o token é idempotente; fora isso só CONFIRMED aceita check-in.
pub fn checkin_decision(status: BookingStatus, checked_in: bool) -> Result<CheckinDecision, AppError> {
    if checked_in {
        return Ok(CheckinDecision::AlreadyCheckedIn);
    }
    if status != BookingStatus::Confirmed {
        return Err(AppError::CheckinNotAllowed(status));
    }
    Ok(CheckinDecision::CheckIn)
}

// =============================================================================
//  CONFIGURAÇÃO DE AGENDAMENTO (por evento)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSettings {
    pub event_id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = 24)]
    pub cancellation_deadline_hours: i32,
    #[schema(example = 7)]
    pub block_duration_days: i32,
    #[schema(example = 30)]
    pub default_capacity: i32,
    #[schema(example = 60)]
    pub slot_minutes: i32,
    #[schema(value_type = String, example = "08:00:00")]
    pub day_start: NaiveTime,
    #[schema(value_type = String, example = "17:00:00")]
    pub day_end: NaiveTime,
    // 0 = segunda ... 6 = domingo
    #[schema(example = json!([0, 1, 2, 3, 4]))]
    pub weekdays: Vec<i32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SchedulingSettings {
    /// Política usada quando o evento ainda não tem configuração salva.
    pub fn defaults(event_id: Uuid, tenant_id: Uuid, event_capacity: i32) -> Self {
        Self {
            event_id,
            tenant_id,
            cancellation_deadline_hours: 24,
            block_duration_days: 7,
            default_capacity: if event_capacity > 0 { event_capacity } else { 30 },
            slot_minutes: 60,
            day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            weekdays: vec![0, 1, 2, 3, 4],
            updated_at: None,
        }
    }

    /// Último instante (hora local) em que o professor cancela sem penalidade.
    pub fn cancellation_deadline(&self, visit_start: NaiveDateTime) -> NaiveDateTime {
        visit_start - Duration::hours(i64::from(self.cancellation_deadline_hours))
    }

    /// Se o cancelamento for tardio, devolve por quanto tempo o professor fica bloqueado.
    pub fn late_cancellation_block(
        &self,
        visit_start: NaiveDateTime,
        now_local: NaiveDateTime,
    ) -> Option<Duration> {
        if self.block_duration_days <= 0 {
            return None;
        }
        if now_local > self.cancellation_deadline(visit_start) {
            Some(Duration::days(i64::from(self.block_duration_days)))
        } else {
            None
        }
    }
}

/// Converte a lista numérica (0 = segunda) em dias da semana.
pub fn parse_weekdays(values: &[i32]) -> Result<Vec<Weekday>, AppError> {
    if values.is_empty() {
        return Err(AppError::InvalidPeriod("nenhum dia da semana selecionado".into()));
    }

    let mut days = Vec::with_capacity(values.len());
    for value in values {
        let day = match value {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            5 => Weekday::Sat,
            6 => Weekday::Sun,
            other => {
                return Err(AppError::InvalidPeriod(format!("dia da semana {} fora de 0..6", other)));
            }
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

// =============================================================================
//  HORÁRIO DE VISITAÇÃO
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitSlot {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
    #[schema(example = 40)]
    pub total_capacity: i32,
    #[schema(example = 12)]
    pub available_seats: i32,
    pub created_at: DateTime<Utc>,
}

impl VisitSlot {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn occupied_seats(&self) -> i32 {
        self.total_capacity - self.available_seats
    }

    /// Checagem prévia (sem banco) de uma reserva de `quantity` vagas.
    /// A garantia definitiva é o UPDATE condicional do repositório.
    pub fn check_reservation(&self, quantity: i32) -> Result<(), AppError> {
        if quantity <= 0 {
            return Err(AppError::InvalidCapacity("a quantidade de alunos deve ser positiva".into()));
        }
        if quantity > self.available_seats {
            return Err(AppError::NotEnoughSeats {
                available: self.available_seats,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Calcula as vagas livres após trocar a capacidade total.
    pub fn resized_available_seats(&self, new_capacity: i32) -> Result<i32, AppError> {
        if new_capacity <= 0 {
            return Err(AppError::InvalidCapacity("a capacidade deve ser positiva".into()));
        }
        let occupied = self.occupied_seats();
        if occupied > new_capacity {
            return Err(AppError::InvalidCapacity(format!(
                "{} vagas já estão ocupadas",
                occupied
            )));
        }
        Ok(new_capacity - occupied)
    }
}

// =============================================================================
//  AGENDAMENTO E FILHOS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitBooking {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub slot_id: Uuid,
    pub teacher_id: Uuid,
    #[schema(example = "E.E. Prof. João Silva")]
    pub school_name: String,
    #[schema(example = "35012345")]
    pub school_code: Option<String>,
    #[schema(example = "7º B")]
    pub class_name: String,
    #[schema(example = "Fundamental II")]
    pub education_level: String,
    #[schema(example = 25)]
    pub student_count: i32,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub checkin_token: String,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitingStudent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub full_name: String,
    pub document_number: Option<String>,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialNeed {
    pub id: Uuid,
    pub student_id: Uuid,
    #[schema(example = "VISUAL")]
    pub kind: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupportMaterial {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentWithNeeds {
    #[serde(flatten)]
    pub student: VisitingStudent,
    pub special_needs: Vec<SpecialNeed>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: VisitBooking,
    pub slot: VisitSlot,
    pub students: Vec<StudentWithNeeds>,
    pub support_materials: Vec<SupportMaterial>,
}

// Penalidade por cancelamento fora do prazo
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeacherBlock {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub event_id: Uuid,
    pub teacher_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub blocked_from: DateTime<Utc>,
    pub blocked_until: DateTime<Utc>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResult {
    pub booking: VisitBooking,
    /// `true` quando o token já tinha sido usado antes (nada mudou).
    pub already_checked_in: bool,
}

// Resultado do cancelamento pelo professor
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub booking: VisitBooking,
    /// Preenchido quando o cancelamento foi fora do prazo
    pub block: Option<TeacherBlock>,
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSettingsPayload {
    #[validate(range(min = 0, message = "O prazo de cancelamento não pode ser negativo."))]
    #[schema(example = 24)]
    pub cancellation_deadline_hours: i32,
    #[validate(range(min = 0, message = "O tempo de bloqueio não pode ser negativo."))]
    #[schema(example = 7)]
    pub block_duration_days: i32,
    #[validate(range(min = 1, message = "A capacidade padrão deve ser positiva."))]
    #[schema(example = 30)]
    pub default_capacity: i32,
    #[validate(range(min = 1, max = 1440, message = "A duração do horário deve estar entre 1 e 1440 minutos."))]
    #[schema(example = 60)]
    pub slot_minutes: i32,
    #[schema(value_type = String, example = "08:00:00")]
    pub day_start: NaiveTime,
    #[schema(value_type = String, example = "17:00:00")]
    pub day_end: NaiveTime,
    #[schema(example = json!([0, 1, 2, 3, 4]))]
    pub weekdays: Vec<i32>,
}

// Campos ausentes caem na configuração do evento
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSlotsPayload {
    #[schema(example = "2025-05-12")]
    pub start_date: NaiveDate,
    #[schema(example = "2025-05-16")]
    pub end_date: NaiveDate,
    pub weekdays: Option<Vec<i32>>,
    #[schema(value_type = Option<String>, example = "09:00:00")]
    pub day_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "12:00:00")]
    pub day_end: Option<NaiveTime>,
    pub slot_minutes: Option<i32>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SlotGenerationResult {
    pub created: Vec<VisitSlot>,
    /// Janelas ignoradas por sobreposição com horários existentes
    pub skipped: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResizeSlotPayload {
    #[validate(range(min = 1, message = "A capacidade deve ser positiva."))]
    pub total_capacity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecialNeedPayload {
    #[validate(length(min = 1, message = "Informe o tipo da necessidade."))]
    #[schema(example = "VISUAL")]
    pub kind: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPayload {
    #[validate(length(min = 1, message = "O nome do aluno é obrigatório."))]
    pub full_name: String,
    pub document_number: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub special_needs: Vec<SpecialNeedPayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupportMaterialPayload {
    #[validate(length(min = 1, message = "O nome do material é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "URL inválida."))]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_student_list"))]
pub struct CreateBookingPayload {
    pub slot_id: Uuid,
    #[validate(length(min = 1, message = "O nome da escola é obrigatório."))]
    pub school_name: String,
    pub school_code: Option<String>,
    #[validate(length(min = 1, message = "A turma é obrigatória."))]
    pub class_name: String,
    #[validate(length(min = 1, message = "O nível de ensino é obrigatório."))]
    pub education_level: String,
    #[validate(range(min = 1, message = "A quantidade de alunos deve ser positiva."))]
    pub student_count: i32,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub students: Vec<StudentPayload>,
    #[serde(default)]
    #[validate(nested)]
    pub support_materials: Vec<SupportMaterialPayload>,
}

// A lista nominal nunca passa da quantidade declarada
fn validate_student_list(payload: &CreateBookingPayload) -> Result<(), ValidationError> {
    if payload.students.len() > payload.student_count.max(0) as usize {
        let mut err = ValidationError::new("students_exceed_count");
        err.message = Some("A lista de alunos excede a quantidade informada.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusPayload {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentPresencePayload {
    pub present: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(total: i32, available: i32) -> VisitSlot {
        VisitSlot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            total_capacity: total,
            available_seats: available,
            created_at: Utc::now(),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn transition_table_matches_lifecycle() {
        use BookingStatus::*;
        let allowed = [
            (Pending, Confirmed),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Confirmed, Cancelled),
            (Confirmed, Completed),
        ];
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn cancelling_or_rejecting_releases_seats_but_completing_does_not() {
        use BookingStatus::*;
        assert!(Pending.transition(Cancelled).unwrap());
        assert!(Pending.transition(Rejected).unwrap());
        assert!(Confirmed.transition(Cancelled).unwrap());
        assert!(!Pending.transition(Confirmed).unwrap());
        assert!(!Confirmed.transition(Completed).unwrap());
    }

    #[test]
    fn final_states_reject_every_transition() {
        for from in [BookingStatus::Cancelled, BookingStatus::Rejected, BookingStatus::Completed] {
            for to in BookingStatus::ALL {
                assert!(matches!(
                    from.transition(to),
                    Err(AppError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn only_confirmed_bookings_accept_a_first_checkin() {
        assert_eq!(
            checkin_decision(BookingStatus::Confirmed, false).unwrap(),
            CheckinDecision::CheckIn
        );
        for status in [
            BookingStatus::Pending,
            BookingStatus::Cancelled,
            BookingStatus::Rejected,
            BookingStatus::Completed,
        ] {
            assert!(matches!(
                checkin_decision(status, false),
                Err(AppError::CheckinNotAllowed(s)) if s == status
            ));
        }
    }

    #[test]
    fn repeated_checkin_is_a_no_op() {
        // Depois do primeiro check-in o agendamento já está COMPLETED
        assert_eq!(
            checkin_decision(BookingStatus::Completed, true).unwrap(),
            CheckinDecision::AlreadyCheckedIn
        );
        assert_eq!(
            checkin_decision(BookingStatus::Confirmed, true).unwrap(),
            CheckinDecision::AlreadyCheckedIn
        );
    }

    #[test]
    fn reservation_never_exceeds_available_seats() {
        let s = slot(30, 5);
        assert!(s.check_reservation(5).is_ok());
        assert!(matches!(
            s.check_reservation(6),
            Err(AppError::NotEnoughSeats { available: 5, requested: 6 })
        ));
        assert!(matches!(s.check_reservation(0), Err(AppError::InvalidCapacity(_))));
    }

    #[test]
    fn resizing_keeps_occupied_seats() {
        let s = slot(30, 10); // 20 ocupadas
        assert_eq!(s.resized_available_seats(50).unwrap(), 30);
        assert_eq!(s.resized_available_seats(20).unwrap(), 0);
        assert!(s.resized_available_seats(19).is_err());
        assert!(s.resized_available_seats(0).is_err());
    }

    #[test]
    fn cancellation_inside_deadline_is_free() {
        let settings = SchedulingSettings::defaults(Uuid::new_v4(), Uuid::new_v4(), 0);
        // Visita dia 20 às 9h, prazo de 24h: cancelar dia 18 é tranquilo
        assert_eq!(settings.late_cancellation_block(at(20, 9), at(18, 9)), None);
        // exatamente no limite ainda é permitido
        assert_eq!(settings.late_cancellation_block(at(20, 9), at(19, 9)), None);
    }

    #[test]
    fn late_cancellation_blocks_for_configured_days() {
        let settings = SchedulingSettings::defaults(Uuid::new_v4(), Uuid::new_v4(), 0);
        assert_eq!(
            settings.late_cancellation_block(at(20, 9), at(19, 10)),
            Some(Duration::days(7))
        );
    }

    #[test]
    fn zero_block_duration_disables_penalty() {
        let mut settings = SchedulingSettings::defaults(Uuid::new_v4(), Uuid::new_v4(), 0);
        settings.block_duration_days = 0;
        assert_eq!(settings.late_cancellation_block(at(20, 9), at(20, 8)), None);
    }

    #[test]
    fn defaults_fall_back_when_event_has_no_capacity() {
        let settings = SchedulingSettings::defaults(Uuid::new_v4(), Uuid::new_v4(), 0);
        assert_eq!(settings.default_capacity, 30);
        let settings = SchedulingSettings::defaults(Uuid::new_v4(), Uuid::new_v4(), 45);
        assert_eq!(settings.default_capacity, 45);
    }

    #[test]
    fn weekdays_are_parsed_and_deduplicated() {
        let days = parse_weekdays(&[0, 2, 2, 6]).unwrap();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
        assert!(parse_weekdays(&[]).is_err());
        assert!(parse_weekdays(&[7]).is_err());
    }

    fn booking_payload(student_count: i32, students: usize) -> CreateBookingPayload {
        CreateBookingPayload {
            slot_id: Uuid::new_v4(),
            school_name: "E.E. Monteiro Lobato".into(),
            school_code: None,
            class_name: "5º A".into(),
            education_level: "Fundamental I".into(),
            student_count,
            notes: None,
            students: (0..students)
                .map(|i| StudentPayload {
                    full_name: format!("Aluno {}", i),
                    document_number: None,
                    special_needs: vec![],
                })
                .collect(),
            support_materials: vec![],
        }
    }

    #[test]
    fn booking_payload_rejects_more_names_than_students() {
        assert!(booking_payload(3, 3).validate().is_ok());
        assert!(booking_payload(3, 0).validate().is_ok());
        assert!(booking_payload(2, 3).validate().is_err());
        assert!(booking_payload(0, 0).validate().is_err());
    }
}
