// src/models/events.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Feira de Ciências 2025")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "Pavilhão Central")]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(example = 40)]
    pub default_capacity: i32,
    pub is_public: bool,
    pub requires_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

// Flags ligáveis/desligáveis pelo painel. `None` = não mexe.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventToggles {
    pub is_public: Option<bool>,
    pub requires_approval: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    #[validate(length(min = 1, max = 200, message = "O nome do evento é obrigatório."))]
    #[schema(example = "Feira de Ciências 2025")]
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[schema(example = "2025-05-12")]
    pub start_date: NaiveDate,
    #[schema(example = "2025-05-16")]
    pub end_date: NaiveDate,
    #[validate(range(min = 1, message = "A capacidade padrão deve ser positiva."))]
    #[schema(example = 40)]
    pub default_capacity: i32,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub requires_approval: bool,
}
