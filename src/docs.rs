// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::get_my_tenants,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::add_member,

        // --- Events ---
        handlers::events::list_public_events,
        handlers::events::create_event,
        handlers::events::list_events,
        handlers::events::get_event,
        handlers::events::update_toggles,
        handlers::events::get_settings,
        handlers::events::update_settings,

        // --- Slots ---
        handlers::slots::generate_slots,
        handlers::slots::list_slots,
        handlers::slots::list_open_slots,
        handlers::slots::resize_slot,
        handlers::slots::delete_slot,

        // --- Bookings ---
        handlers::bookings::create_booking,
        handlers::bookings::list_my_bookings,
        handlers::bookings::get_my_booking,
        handlers::bookings::cancel_booking,
        handlers::bookings::booking_qrcode,
        handlers::bookings::list_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::update_booking_status,
        handlers::bookings::set_student_presence,
        handlers::bookings::checkin,

        // --- Blocks ---
        handlers::blocks::list_blocks,
        handlers::blocks::lift_block,

        // --- Review ---
        handlers::review::create_submission,
        handlers::review::list_submissions,
        handlers::review::create_reviewer,
        handlers::review::list_reviewers,
        handlers::review::set_reviewer_status,
        handlers::review::distribute,
        handlers::review::assign_manually,
        handlers::review::my_assignments,
        handlers::review::submit_review,

        // --- Reports ---
        handlers::reports::scheduling_report,
        handlers::reports::review_report,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::UserTenant,
            handlers::tenancy::CreateTenantPayload,
            handlers::tenancy::AddMemberPayload,

            // --- Events ---
            models::events::Event,
            models::events::EventToggles,
            models::events::CreateEventPayload,

            // --- Scheduling ---
            models::scheduling::BookingStatus,
            models::scheduling::SchedulingSettings,
            models::scheduling::SchedulingSettingsPayload,
            models::scheduling::VisitSlot,
            models::scheduling::GenerateSlotsPayload,
            models::scheduling::SlotGenerationResult,
            models::scheduling::ResizeSlotPayload,
            models::scheduling::VisitBooking,
            models::scheduling::VisitingStudent,
            models::scheduling::SpecialNeed,
            models::scheduling::SupportMaterial,
            models::scheduling::StudentWithNeeds,
            models::scheduling::BookingDetail,
            models::scheduling::TeacherBlock,
            models::scheduling::CheckinResult,
            models::scheduling::CancellationResult,
            models::scheduling::SpecialNeedPayload,
            models::scheduling::StudentPayload,
            models::scheduling::SupportMaterialPayload,
            models::scheduling::CreateBookingPayload,
            models::scheduling::UpdateBookingStatusPayload,
            models::scheduling::StudentPresencePayload,

            // --- Review ---
            models::review::SubmissionStatus,
            models::review::Author,
            models::review::Submission,
            models::review::Reviewer,
            models::review::AssignmentKind,
            models::review::ReviewAssignment,
            models::review::ReviewRecommendation,
            models::review::Review,
            models::review::PendingSubmission,
            models::review::DistributionReport,
            models::review::CreateSubmissionPayload,
            models::review::CreateReviewerPayload,
            models::review::ReviewerStatusPayload,
            models::review::DistributePayload,
            models::review::ManualAssignmentPayload,
            models::review::SubmitReviewPayload,

            // --- Reports ---
            models::reports::StatusCount,
            models::reports::SchedulingSummary,
            models::reports::ReviewerLoad,
            models::reports::ReviewSummary,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Usuário e Perfil"),
        (name = "Tenancy", description = "Clientes organizadores e sua equipe"),
        (name = "Events", description = "Eventos e configuração de agendamento"),
        (name = "Slots", description = "Horários de visitação"),
        (name = "Bookings", description = "Agendamentos de visitas escolares e check-in"),
        (name = "Blocks", description = "Bloqueios de professores por cancelamento tardio"),
        (name = "Review", description = "Trabalhos, revisores e distribuição"),
        (name = "Reports", description = "Relatórios em JSON")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/agendamentos"));
        assert!(doc.paths.paths.contains_key("/api/gestao/eventos/{event_id}/distribuicao"));
        assert!(doc.paths.paths.contains_key("/api/gestao/checkin/{token}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
