//! # reelbox-api
//!
//! Shared API types for the reelbox media service.
//! This crate is designed to be WASM-compatible and can be used in both
//! backend (Rust) and frontend (WASM/TypeScript via wasm-bindgen) applications.
//!
//! ## Features
//!
//! - Request DTOs (`RegisterRequest`, `LoginRequest`, `UploadUrlQuery`, etc.)
//! - Response DTOs (`AuthResponse`, `MediaResponse`, `UserProfileResponse`, etc.)
//! - Error response format (`ErrorResponse`)
//! - Generic response wrapper (`AppResponse`)
//!
//! ## Example
//!
//! ```rust
//! use reelbox_api::LoginRequest;
//!
//! let request = LoginRequest {
//!     email: "user@example.com".to_string(),
//!     password: "password123".to_string(),
//! };
//! assert_eq!(request.email, "user@example.com");
//! ```

pub mod error;
pub mod requests;
pub mod responses;
pub mod result;

// Re-exports for convenient access
pub use error::ErrorResponse;
pub use requests::*;
pub use responses::*;
pub use result::{AppResponse, StatusCode};
