//! Wire types for the agency back-office REST API
//!
//! - `api`: request and response bodies of the `/api/*` endpoints
//! - `common`: types shared between endpoints and local storage

pub mod api;
pub mod common;

pub use api::auth::{ErrorBody, LoginRequest, LoginResponse, RefreshTokenResponse};
pub use common::auth::{Claims, UserProfile, UserRole};
