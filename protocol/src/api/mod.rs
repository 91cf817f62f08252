//! API DTOs module
//!
//! This module contains the data transfer objects of the session endpoints:
//! login, identity verification and token refresh.

pub mod auth;

pub use auth::*;
