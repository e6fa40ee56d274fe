pub mod identity_repository;
pub mod media_repository;
pub mod notification_repository;
pub mod plan_repository;
pub mod refresh_token_repository;
pub mod user_repository;
