pub mod auth;
pub mod blocks;
pub mod bookings;
pub mod events;
pub mod reports;
pub mod review;
pub mod slots;
pub mod tenancy;
