pub mod auth;
pub mod booking_service;
pub mod distribution;
pub mod event_service;
pub mod qrcode_service;
pub mod report_service;
pub mod review_service;
pub mod scheduling_service;
pub mod slot_generator;
pub mod tenancy_service;
