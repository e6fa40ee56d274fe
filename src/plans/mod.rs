//! Storage plans: quota admission and the expiration sweep.

pub mod expiration;
pub mod notifications;
pub mod quota;
