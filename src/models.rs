pub mod auth;
pub mod events;
pub mod reports;
pub mod review;
pub mod scheduling;
pub mod tenancy;
