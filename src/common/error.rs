// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::scheduling::BookingStatus;

// Nosso tipo de erro central. Todo serviço devolve Result<_, AppError>.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Acesso ao tenant negado")]
    TenantAccessDenied,

    #[error("Cabeçalho x-tenant-id ausente ou inválido")]
    InvalidTenantHeader,

    #[error("Perfil sem permissão: {0}")]
    Forbidden(String),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    // --- Agendamento ---
    #[error("Vagas insuficientes ({available} disponíveis, {requested} solicitadas)")]
    NotEnoughSeats { available: i32, requested: i32 },

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Professor bloqueado até {until}")]
    TeacherBlocked { until: DateTime<Utc> },

    #[error("O horário já começou ou já passou")]
    SlotInThePast,

    #[error("Período inválido: {0}")]
    InvalidPeriod(String),

    #[error("Capacidade inválida: {0}")]
    InvalidCapacity(String),

    #[error("O horário possui agendamentos ativos")]
    SlotHasBookings,

    #[error("Já existe um agendamento ativo deste professor neste horário")]
    DuplicateBooking,

    #[error("Check-in não permitido para o status {0:?}")]
    CheckinNotAllowed(BookingStatus),

    // --- Revisão ---
    #[error("Conflito de interesse entre revisor e autores")]
    ConflictOfInterest,

    #[error("Revisor atingiu o limite de trabalhos")]
    ReviewerOverloaded,

    #[error("Atribuição já concluída")]
    AssignmentAlreadyCompleted,

    // --- Infra ---
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` captura o contexto de qualquer erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Erro "pronto para o cliente": status HTTP + mensagem já traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Chave estável usada no catálogo de mensagens.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::UserNotFound => "user_not_found",
            AppError::TenantAccessDenied => "tenant_access_denied",
            AppError::InvalidTenantHeader => "invalid_tenant_header",
            AppError::Forbidden(_) => "forbidden",
            AppError::ResourceNotFound(_) => "resource_not_found",
            AppError::UniqueConstraintViolation(_) => "unique_violation",
            AppError::NotEnoughSeats { .. } => "not_enough_seats",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::TeacherBlocked { .. } => "teacher_blocked",
            AppError::SlotInThePast => "slot_in_the_past",
            AppError::InvalidPeriod(_) => "invalid_period",
            AppError::InvalidCapacity(_) => "invalid_capacity",
            AppError::SlotHasBookings => "slot_has_bookings",
            AppError::DuplicateBooking => "duplicate_booking",
            AppError::CheckinNotAllowed(_) => "checkin_not_allowed",
            AppError::ConflictOfInterest => "conflict_of_interest",
            AppError::ReviewerOverloaded => "reviewer_overloaded",
            AppError::AssignmentAlreadyCompleted => "assignment_already_completed",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidPeriod(_)
            | AppError::InvalidCapacity(_)
            | AppError::SlotInThePast
            | AppError::InvalidTenantHeader => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::TenantAccessDenied | AppError::Forbidden(_) | AppError::TeacherBlocked { .. } => {
                StatusCode::FORBIDDEN
            }
            AppError::UserNotFound | AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::UniqueConstraintViolation(_)
            | AppError::NotEnoughSeats { .. }
            | AppError::InvalidTransition { .. }
            | AppError::SlotHasBookings
            | AppError::DuplicateBooking
            | AppError::CheckinNotAllowed(_)
            | AppError::ConflictOfInterest
            | AppError::ReviewerOverloaded
            | AppError::AssignmentAlreadyCompleted => StatusCode::CONFLICT,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Valores interpolados nas mensagens traduzidas ("{available}", "{0}", ...)
    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::Forbidden(detail)
            | AppError::ResourceNotFound(detail)
            | AppError::UniqueConstraintViolation(detail)
            | AppError::InvalidPeriod(detail)
            | AppError::InvalidCapacity(detail) => vec![("0", detail.clone())],
            AppError::NotEnoughSeats { available, requested } => vec![
                ("available", available.to_string()),
                ("requested", requested.to_string()),
            ],
            AppError::InvalidTransition { from, to } => {
                vec![("from", from.as_str().to_string()), ("to", to.as_str().to_string())]
            }
            AppError::TeacherBlocked { until } => {
                vec![("until", until.format("%d/%m/%Y %H:%M UTC").to_string())]
            }
            AppError::CheckinNotAllowed(status) => vec![("0", status.as_str().to_string())],
            _ => vec![],
        }
    }

    /// Converte o erro interno em uma resposta localizada.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O cliente nunca vê o detalhe; o log sim.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let text = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            Value::String(text)
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(&locale.0, self.code(), &self.params()),
            details,
        }
    }
}

// Para os poucos pontos sem acesso ao Locale (ex: extractors), usamos o idioma padrão.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global())
            .into_response()
    }
}

// Atalho para handlers: `.map_err(localize(&locale, &state.i18n_store))`
pub fn localize<'a>(
    locale: &'a Locale,
    store: &'a I18nStore,
) -> impl Fn(AppError) -> ApiError + 'a {
    move |err| err.to_api_error(locale, store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".to_string())
    }

    #[test]
    fn not_enough_seats_is_conflict_with_counts_in_message() {
        let err = AppError::NotEnoughSeats { available: 3, requested: 10 };
        let api = err.to_api_error(&pt(), &I18nStore::new());

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains('3'));
        assert!(api.error.contains("10"));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("pool exhausted at 10.0.0.1"));
        let api = err.to_api_error(&pt(), &I18nStore::new());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.error.contains("10.0.0.1"));
    }

    #[test]
    fn invalid_transition_names_both_states() {
        let err = AppError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Cancelled,
        };
        let api = err.to_api_error(&Locale("en".into()), &I18nStore::new());

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("COMPLETED"));
        assert!(api.error.contains("CANCELLED"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut field_error = validator::ValidationError::new("length");
        field_error.message = Some("O nome é obrigatório.".into());
        errors.add("name", field_error);

        let api = AppError::ValidationError(errors).to_api_error(&pt(), &I18nStore::new());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("validation details");
        assert_eq!(details["name"][0], "O nome é obrigatório.");
    }
}
