pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod event_repo;
pub use event_repo::EventRepository;
pub mod scheduling_repo;
pub use scheduling_repo::SchedulingSettingsRepository;
pub mod slot_repo;
pub use slot_repo::SlotRepository;
pub mod booking_repo;
pub use booking_repo::BookingRepository;
pub mod review_repo;
pub use review_repo::ReviewRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;

#[cfg(test)]
pub mod fixtures;
