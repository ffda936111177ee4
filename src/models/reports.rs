// src/models/reports.rs

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::scheduling::BookingStatus;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: BookingStatus,
    #[schema(example = 12)]
    pub bookings: i64,
    #[schema(example = 300)]
    pub students: i64,
}

// Resumo do agendamento de visitas de um evento
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingSummary {
    pub event_id: Uuid,
    pub slots: i64,
    pub total_capacity: i64,
    pub available_seats: i64,
    #[schema(example = 62.5)]
    pub occupancy_percent: f64,
    pub by_status: Vec<StatusCount>,
    pub checkins: i64,
    pub active_blocks: i64,
}

impl SchedulingSummary {
    pub fn occupancy(total_capacity: i64, available_seats: i64) -> f64 {
        if total_capacity <= 0 {
            return 0.0;
        }
        let occupied = (total_capacity - available_seats) as f64;
        (occupied / total_capacity as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerLoad {
    pub reviewer_id: Uuid,
    pub full_name: String,
    pub assigned: i64,
    pub completed: i64,
    pub max_assignments: i32,
}

// Resumo da revisão de trabalhos de um evento
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub event_id: Uuid,
    pub submitted: i64,
    pub under_review: i64,
    pub reviewed: i64,
    pub assignments_completed: i64,
    pub assignments_pending: i64,
    pub reviewers: Vec<ReviewerLoad>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_is_rounded_to_one_decimal() {
        assert_eq!(SchedulingSummary::occupancy(30, 20), 33.3);
        assert_eq!(SchedulingSummary::occupancy(40, 0), 100.0);
        assert_eq!(SchedulingSummary::occupancy(0, 0), 0.0);
    }
}
