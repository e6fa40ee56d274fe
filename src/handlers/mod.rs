pub mod auth;
pub mod health;
pub mod media;
pub mod payments;
pub mod plans;
pub mod upload;
pub mod user;
