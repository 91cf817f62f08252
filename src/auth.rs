//! Login, logout and status on top of the session manager

use agency_protocol::{ErrorBody, LoginRequest, LoginResponse, UserProfile};
use chrono::{DateTime, Utc};
use reqwest::Method;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::error::{Result, SessionError};
use crate::session::{SessionManager, TerminationReason, NO_CACHE_HEADERS};
use crate::state::SessionPhase;
use crate::token::SessionToken;
use crate::transport::HttpRequest;

/// Local view of the current session
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub authenticated: bool,
    pub user: Option<UserProfile>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub token_expired: bool,
    pub phase: SessionPhase,
}

#[derive(Debug, Clone)]
pub struct AuthService {
    manager: Arc<SessionManager>,
}

impl AuthService {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Sign in and make the returned token and profile current.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let config = self.manager.config();
        let mut http = HttpRequest::new(Method::POST, config.endpoint_url(&config.login_path))
            .header("Content-Type", "application/json");
        for (name, value) in NO_CACHE_HEADERS {
            http = http.header(name, value);
        }
        http.body = Some(serde_json::to_string(&request)?);

        let response = self.manager.transport().send(http).await?;
        if !response.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| format!("Login failed with HTTP {}", response.status));
            return Err(if response.status == 401 || response.status == 403 {
                SessionError::authentication(message)
            } else {
                SessionError::api(response.status, message)
            });
        }

        let data: LoginResponse = serde_json::from_str(&response.body).map_err(|e| {
            SessionError::invalid_response(response.status, format!("Invalid login response: {}", e))
        })?;
        let token = SessionToken::new(data.token).ok_or_else(|| {
            SessionError::invalid_response(response.status, "Login response carried an empty token")
        })?;

        let storage = self.manager.storage();
        storage.clear_all()?;
        storage.set_token(&token)?;
        storage.set_user(&data.user)?;
        self.manager.begin_session();

        info!(username = %data.user.username, role = data.user.role.as_str(), "signed in");
        Ok(data.user)
    }

    /// Drop the local session and go back to the login page.
    pub async fn logout(&self) {
        self.manager.terminate(TerminationReason::Logout).await;
    }

    pub fn status(&self) -> StatusInfo {
        let storage = self.manager.storage();
        let token = storage.token();
        let user = storage.user();
        let now = self.manager.now();

        StatusInfo {
            authenticated: token.is_some() && user.is_some(),
            token_expires_at: token.as_ref().and_then(SessionToken::expires_at),
            token_expired: token.as_ref().is_some_and(|t| t.is_expired_at(now)),
            user,
            phase: self.manager.phase(),
        }
    }
}
