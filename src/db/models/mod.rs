pub mod identity;
pub mod media;
pub mod plan;
pub mod plan_notification;
pub mod refresh_token;
pub mod user;
