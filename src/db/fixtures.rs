// src/db/fixtures.rs
//
// Dados de apoio dos testes com Postgres (`#[sqlx::test]`). Cada teste recebe
// um banco novo com as migrações aplicadas.

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::clock::Clock,
    db::{
        event_repo::NewEvent, scheduling_repo::SettingsInput, slot_repo::SlotWindow,
        BookingRepository, EventRepository, ReviewRepository, SchedulingSettingsRepository,
        SlotRepository, TenantRepository, UserRepository,
    },
    models::{
        auth::{User, UserRole},
        events::Event,
        review::{Author, CreateReviewerPayload, CreateSubmissionPayload},
        scheduling::{CreateBookingPayload, VisitSlot},
    },
    services::{
        auth::AuthService, booking_service::BookingService, event_service::EventService,
        review_service::ReviewService,
    },
};

pub const CHECKIN_BASE_URL: &str = "http://localhost:3000/api/gestao/checkin";

pub fn clock() -> Clock {
    Clock::new(-180).unwrap()
}

pub fn booking_service(pool: &PgPool) -> BookingService {
    BookingService::new(
        BookingRepository::new(),
        SlotRepository::new(),
        EventRepository::new(pool.clone()),
        SchedulingSettingsRepository::new(pool.clone()),
        clock(),
        CHECKIN_BASE_URL.to_string(),
        pool.clone(),
    )
}

pub fn event_service(pool: &PgPool) -> EventService {
    EventService::new(
        EventRepository::new(pool.clone()),
        SchedulingSettingsRepository::new(pool.clone()),
        clock(),
        pool.clone(),
    )
}

pub fn review_service(pool: &PgPool) -> ReviewService {
    ReviewService::new(
        ReviewRepository::new(),
        EventRepository::new(pool.clone()),
        UserRepository::new(pool.clone()),
        pool.clone(),
    )
}

pub fn auth_service(pool: &PgPool) -> AuthService {
    AuthService::new(
        UserRepository::new(pool.clone()),
        ReviewRepository::new(),
        "segredo-de-teste".to_string(),
        pool.clone(),
    )
}

pub async fn tenant(pool: &PgPool) -> Uuid {
    TenantRepository::new(pool.clone())
        .create_tenant(pool, "Museu de Ciências", None)
        .await
        .unwrap()
        .id
}

pub async fn user(pool: &PgPool, role: UserRole) -> User {
    let email = format!("{}@teste.br", Uuid::new_v4().simple());
    UserRepository::new(pool.clone())
        .create_user(pool, "Usuário de Teste", &email, "hash", role)
        .await
        .unwrap()
}

/// Evento público de 30 dias a partir de hoje (relógio local).
pub async fn event(pool: &PgPool, tenant_id: Uuid, requires_approval: bool) -> Event {
    let today = clock().today();
    EventRepository::new(pool.clone())
        .create_event(
            pool,
            tenant_id,
            &NewEvent {
                name: &format!("Feira {}", Uuid::new_v4().simple()),
                description: None,
                location: None,
                start_date: today,
                end_date: today + Duration::days(30),
                default_capacity: 40,
                is_public: true,
                requires_approval,
            },
        )
        .await
        .unwrap()
}

/// Horário das 10h às 11h, `days_ahead` dias depois de hoje.
pub async fn slot(pool: &PgPool, event: &Event, days_ahead: i64, capacity: i32) -> VisitSlot {
    let date: NaiveDate = clock().today() + Duration::days(days_ahead);
    let window = SlotWindow {
        date,
        start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
    };
    SlotRepository::new()
        .insert_slots(pool, event.tenant_id, event.id, capacity, &[window])
        .await
        .unwrap()
        .remove(0)
}

pub async fn penalty_policy(pool: &PgPool, event: &Event, deadline_hours: i32, block_days: i32) {
    SchedulingSettingsRepository::new(pool.clone())
        .upsert_settings(
            pool,
            event.tenant_id,
            event.id,
            &SettingsInput {
                cancellation_deadline_hours: deadline_hours,
                block_duration_days: block_days,
                default_capacity: 30,
                slot_minutes: 60,
                day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                weekdays: vec![0, 1, 2, 3, 4, 5, 6],
            },
        )
        .await
        .unwrap();
}

pub fn booking_payload(slot_id: Uuid, student_count: i32) -> CreateBookingPayload {
    CreateBookingPayload {
        slot_id,
        school_name: "E.E. Prof. João Silva".to_string(),
        school_code: None,
        class_name: "7º B".to_string(),
        education_level: "Fundamental II".to_string(),
        student_count,
        notes: None,
        students: Vec::new(),
        support_materials: Vec::new(),
    }
}

pub fn submission_payload(title: &str, author: &str) -> CreateSubmissionPayload {
    CreateSubmissionPayload {
        title: title.to_string(),
        abstract_text: None,
        thematic_area: "Astronomia".to_string(),
        keywords: vec!["astronomia".to_string()],
        authors: vec![Author { name: author.to_string(), email: None }],
    }
}

pub fn reviewer_payload(full_name: &str, email: &str, max_assignments: i32) -> CreateReviewerPayload {
    CreateReviewerPayload {
        full_name: full_name.to_string(),
        email: email.to_string(),
        areas: vec!["Astronomia".to_string()],
        max_assignments,
    }
}
