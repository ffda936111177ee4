// src/config.rs

use std::{env, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{clock::Clock, i18n::I18nStore},
    db::{
        BookingRepository, EventRepository, ReportRepository, ReviewRepository,
        SchedulingSettingsRepository, SlotRepository, TenantRepository, UserRepository,
    },
    services::{
        auth::AuthService, booking_service::BookingService, event_service::EventService,
        report_service::ReportService, review_service::ReviewService,
        scheduling_service::SchedulingService, tenancy_service::TenantService,
    },
};

// O QR Code carrega {base}/{token}; o padrão aponta para POST /api/gestao/checkin/{token}
const DEFAULT_CHECKIN_BASE_URL: &str = "http://localhost:3000/api/gestao/checkin";

// Variáveis de ambiente lidas na inicialização
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub utc_offset_minutes: i32,
    pub checkin_base_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave/valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} deve ser definida", key))
        };

        let port = match lookup("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("APP_PORT inválida: {}", raw))?,
            None => 3000,
        };

        let db_max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválida: {}", raw))?,
            None => 5,
        };

        let utc_offset_minutes = match lookup("FUSO_HORARIO_MINUTOS") {
            Some(raw) => raw
                .parse::<i32>()
                .with_context(|| format!("FUSO_HORARIO_MINUTOS inválida: {}", raw))?,
            None => -180,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            db_max_connections,
            utc_offset_minutes,
            checkin_base_url: lookup("CHECKIN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CHECKIN_BASE_URL.to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    // Mesmo catálogo usado pelos extractors (RequireRole, AppError::into_response)
    pub i18n_store: &'static I18nStore,
    pub tenant_repo: TenantRepository,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub event_service: EventService,
    pub scheduling_service: SchedulingService,
    pub booking_service: BookingService,
    pub review_service: ReviewService,
    pub report_service: ReportService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let clock = Clock::new(config.utc_offset_minutes)?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let event_repo = EventRepository::new(db_pool.clone());
        let settings_repo = SchedulingSettingsRepository::new(db_pool.clone());
        let slot_repo = SlotRepository::new();
        let booking_repo = BookingRepository::new();
        let review_repo = ReviewRepository::new();
        let report_repo = ReportRepository::new();

        let auth_service = AuthService::new(
            user_repo.clone(),
            review_repo.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let tenant_service = TenantService::new(tenant_repo.clone(), user_repo.clone(), db_pool.clone());
        let event_service = EventService::new(
            event_repo.clone(),
            settings_repo.clone(),
            clock,
            db_pool.clone(),
        );
        let scheduling_service = SchedulingService::new(
            event_repo.clone(),
            settings_repo.clone(),
            slot_repo.clone(),
            booking_repo.clone(),
            clock,
            db_pool.clone(),
        );
        let booking_service = BookingService::new(
            booking_repo,
            slot_repo,
            event_repo.clone(),
            settings_repo,
            clock,
            config.checkin_base_url.clone(),
            db_pool.clone(),
        );
        let review_service = ReviewService::new(review_repo, event_repo.clone(), user_repo, db_pool.clone());
        let report_service = ReportService::new(report_repo, event_repo, clock, db_pool.clone());

        Ok(Self {
            db_pool,
            i18n_store: I18nStore::global(),
            tenant_repo,
            auth_service,
            tenant_service,
            event_service,
            scheduling_service,
            booking_service,
            review_service,
            report_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/eventos"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.utc_offset_minutes, -180);
        assert_eq!(config.checkin_base_url, "http://localhost:3000/api/gestao/checkin");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/eventos"),
            ("JWT_SECRET", "segredo"),
            ("APP_HOST", "127.0.0.1"),
            ("APP_PORT", "8080"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("FUSO_HORARIO_MINUTOS", "60"),
            ("CHECKIN_BASE_URL", "https://eventos.exemplo.br/checkin"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.db_max_connections, 20);
        assert_eq!(config.utc_offset_minutes, 60);
        assert_eq!(config.checkin_base_url, "https://eventos.exemplo.br/checkin");
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db/eventos")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/eventos"),
            ("JWT_SECRET", "segredo"),
            ("APP_PORT", "porta"),
        ]));
        assert!(result.is_err());
    }
}
