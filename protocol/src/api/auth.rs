//! Authentication API DTOs
//!
//! Bodies exchanged with `/api/login`, `/api/me` and `/api/refresh`, plus the
//! error envelope the backend uses for non-2xx responses.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::common::auth::UserProfile;

// ============================================================================
// Login DTOs
// ============================================================================

/// Username/password login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

/// Login response: the session token and the signed-in profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

// ============================================================================
// Token Refresh DTOs
// ============================================================================

/// Body of a successful `POST /api/refresh`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub token: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned alongside 4xx/5xx statuses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The human-readable part of the body, `error` taking precedence.
    pub fn into_message(self) -> Option<String> {
        self.error
            .or(self.message)
            .filter(|m| !m.trim().is_empty())
    }
}
