//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::auth::{auth_guard, tenant_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG manda; sem ele, nível info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Rotas públicas
    let public_routes = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/eventos/publicos", get(handlers::events::list_public_events));

    // Rotas de qualquer usuário logado (professor, revisor, organizador)
    let user_routes = Router::new()
        .route("/api/users/me", get(handlers::auth::get_me))
        .route("/api/users/me/clientes", get(handlers::auth::get_my_tenants))
        .route("/api/clientes", post(handlers::tenancy::create_tenant))
        .route("/api/eventos/{event_id}/horarios", get(handlers::slots::list_open_slots))
        .route("/api/agendamentos", post(handlers::bookings::create_booking))
        .route("/api/agendamentos/meus", get(handlers::bookings::list_my_bookings))
        .route("/api/agendamentos/{booking_id}", get(handlers::bookings::get_my_booking))
        .route("/api/agendamentos/{booking_id}/cancelar", post(handlers::bookings::cancel_booking))
        .route("/api/agendamentos/{booking_id}/qrcode", get(handlers::bookings::booking_qrcode))
        .route("/api/revisao/minhas-atribuicoes", get(handlers::review::my_assignments))
        .route(
            "/api/revisao/atribuicoes/{assignment_id}/review",
            post(handlers::review::submit_review),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Painel do cliente: exige x-tenant-id e vínculo com o cliente
    let management_routes = Router::new()
        .route("/membros", post(handlers::tenancy::add_member))
        // Eventos
        .route(
            "/eventos",
            post(handlers::events::create_event).get(handlers::events::list_events),
        )
        .route("/eventos/{event_id}", get(handlers::events::get_event))
        .route("/eventos/{event_id}/toggles", patch(handlers::events::update_toggles))
        .route(
            "/eventos/{event_id}/configuracao",
            get(handlers::events::get_settings).put(handlers::events::update_settings),
        )
        // Horários
        .route("/eventos/{event_id}/horarios", get(handlers::slots::list_slots))
        .route("/eventos/{event_id}/horarios/gerar", post(handlers::slots::generate_slots))
        .route("/horarios/{slot_id}", delete(handlers::slots::delete_slot))
        .route("/horarios/{slot_id}/capacidade", patch(handlers::slots::resize_slot))
        // Agendamentos e check-in
        .route("/agendamentos", get(handlers::bookings::list_bookings))
        .route("/agendamentos/{booking_id}", get(handlers::bookings::get_booking))
        .route(
            "/agendamentos/{booking_id}/status",
            patch(handlers::bookings::update_booking_status),
        )
        .route(
            "/agendamentos/{booking_id}/alunos/{student_id}/presenca",
            patch(handlers::bookings::set_student_presence),
        )
        .route("/checkin/{token}", post(handlers::bookings::checkin))
        // Bloqueios
        .route("/bloqueios", get(handlers::blocks::list_blocks))
        .route("/bloqueios/{block_id}/desbloquear", post(handlers::blocks::lift_block))
        // Revisão
        .route(
            "/eventos/{event_id}/submissoes",
            post(handlers::review::create_submission).get(handlers::review::list_submissions),
        )
        .route(
            "/eventos/{event_id}/revisores",
            post(handlers::review::create_reviewer).get(handlers::review::list_reviewers),
        )
        .route("/revisores/{reviewer_id}/status", patch(handlers::review::set_reviewer_status))
        .route("/eventos/{event_id}/distribuicao", post(handlers::review::distribute))
        .route("/atribuicoes", post(handlers::review::assign_manually))
        // Relatórios
        .route(
            "/eventos/{event_id}/relatorios/agendamentos",
            get(handlers::reports::scheduling_report),
        )
        .route(
            "/eventos/{event_id}/relatorios/revisao",
            get(handlers::reports::review_report),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .nest("/api/gestao", management_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Falha ao escutar em {}", config.bind_addr()))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Erro no servidor Axum")?;
    Ok(())
}
