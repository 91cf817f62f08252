//! Session guard: verifies the stored session once per page load

use agency_protocol::UserProfile;
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::{SessionManager, TerminationReason, NO_CACHE_HEADERS};
use crate::transport::HttpRequest;

/// Proof that the guard accepted the session. Only the guard creates it;
/// the refresh scheduler requires it to start.
#[derive(Debug)]
pub struct Verified {
    _private: (),
}

/// Why verification failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardFailure {
    MissingSession,
    InvalidProfile,
    Rejected,
}

impl From<GuardFailure> for TerminationReason {
    fn from(failure: GuardFailure) -> Self {
        match failure {
            GuardFailure::MissingSession => TerminationReason::MissingSession,
            GuardFailure::InvalidProfile => TerminationReason::InvalidProfile,
            GuardFailure::Rejected => TerminationReason::Rejected,
        }
    }
}

impl fmt::Display for GuardFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&TerminationReason::from(*self), f)
    }
}

#[derive(Debug)]
pub enum GuardOutcome {
    Verified(Verified),
    /// Login or logout page: nothing checked, scheduler must not start.
    Skipped,
    /// Session terminated; the user is being sent to the login page.
    Failed(GuardFailure),
}

impl GuardOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, GuardOutcome::Verified(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionGuard {
    manager: Arc<SessionManager>,
}

impl SessionGuard {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Verify the session for `page`. Never mutates the token.
    pub async fn verify(&self, page: &str) -> GuardOutcome {
        if self.manager.config().is_public_page(page) {
            debug!(page, "public page, session check skipped");
            return GuardOutcome::Skipped;
        }

        // Other initialisation reads the same state on load; let it settle.
        tokio::time::sleep(self.manager.timing().guard_delay).await;

        match self.check().await {
            Ok(username) => {
                self.manager.mark_verified();
                info!(%username, "session verified");
                GuardOutcome::Verified(Verified { _private: () })
            }
            Err(failure) => {
                warn!(%failure, "session verification failed");
                self.manager.terminate(failure.into()).await;
                GuardOutcome::Failed(failure)
            }
        }
    }

    async fn check(&self) -> Result<String, GuardFailure> {
        let storage = self.manager.storage();
        let (Some(token), Some(raw_user)) = (storage.token(), storage.user_raw()) else {
            return Err(GuardFailure::MissingSession);
        };

        let profile: UserProfile =
            serde_json::from_str(&raw_user).map_err(|_| GuardFailure::InvalidProfile)?;
        if profile.username.trim().is_empty() {
            return Err(GuardFailure::InvalidProfile);
        }

        let url = self.manager.config().endpoint_url(&self.manager.config().me_path);
        let mut request = HttpRequest::new(Method::GET, url).header("Authorization", token.bearer());
        for (name, value) in NO_CACHE_HEADERS {
            request = request.header(name, value);
        }

        match self.manager.transport().send(request).await {
            Ok(response) if response.is_success() => Ok(profile.username),
            Ok(response) => {
                debug!(status = response.status, "identity check refused");
                Err(GuardFailure::Rejected)
            }
            Err(e) => {
                debug!(error = %e, "identity check failed");
                Err(GuardFailure::Rejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{TOKEN_KEY, USER_KEY};
    use crate::tests::utils::test_helpers::{empty_fixture, signed_in_fixture, Fixture};

    #[tokio::test]
    async fn test_public_pages_are_skipped() {
        let Fixture {
            manager, transport, ..
        } = empty_fixture();
        let guard = SessionGuard::new(manager.clone());

        assert!(matches!(guard.verify("/login.html").await, GuardOutcome::Skipped));
        assert!(matches!(guard.verify("/logout.html").await, GuardOutcome::Skipped));
        assert_eq!(transport.total(), 0);
        assert!(!manager.is_terminated());
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_network() {
        let Fixture {
            manager,
            transport,
            navigator,
            ..
        } = empty_fixture();
        manager.storage().session().set("tab", "sales").unwrap();
        let guard = SessionGuard::new(manager.clone());

        let outcome = guard.verify("/tours.html").await;

        assert!(matches!(outcome, GuardOutcome::Failed(GuardFailure::MissingSession)));
        assert_eq!(transport.total(), 0);
        assert!(manager.storage().session().get("tab").is_none());
        assert_eq!(navigator.redirects(), vec!["/login.html".to_string()]);
    }

    #[tokio::test]
    async fn test_profile_without_type_is_invalid() {
        let Fixture {
            manager, transport, ..
        } = signed_in_fixture();
        manager
            .storage()
            .local()
            .set(USER_KEY, r#"{"username":"maria"}"#)
            .unwrap();

        let outcome = SessionGuard::new(manager.clone()).verify("/sales.html").await;

        assert!(matches!(outcome, GuardOutcome::Failed(GuardFailure::InvalidProfile)));
        assert_eq!(transport.total(), 0);
        assert!(manager.storage().local().get(TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_unparseable_profile_is_invalid() {
        let Fixture { manager, .. } = signed_in_fixture();
        manager.storage().local().set(USER_KEY, "not json").unwrap();

        let outcome = SessionGuard::new(manager.clone()).verify("/sales.html").await;
        assert!(matches!(outcome, GuardOutcome::Failed(GuardFailure::InvalidProfile)));
    }

    #[tokio::test]
    async fn test_server_rejection_terminates() {
        let Fixture {
            manager, transport, ..
        } = signed_in_fixture();
        transport.on(Method::GET, "/api/me", 401, "");

        let outcome = SessionGuard::new(manager.clone()).verify("/index.html").await;

        assert!(matches!(outcome, GuardOutcome::Failed(GuardFailure::Rejected)));
        assert!(manager.is_terminated());
        assert!(manager.token().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_counts_as_rejection() {
        let Fixture {
            manager, transport, ..
        } = signed_in_fixture();
        transport.fail(Method::GET, "/api/me");

        let outcome = SessionGuard::new(manager.clone()).verify("/index.html").await;
        assert!(matches!(outcome, GuardOutcome::Failed(GuardFailure::Rejected)));
    }

    #[tokio::test]
    async fn test_accepted_session_is_verified() {
        let Fixture {
            manager, transport, ..
        } = signed_in_fixture();
        transport.on(Method::GET, "/api/me", 200, r#"{"username":"maria"}"#);

        let outcome = SessionGuard::new(manager.clone()).verify("/index.html").await;

        assert!(outcome.is_verified());
        assert!(manager.is_verified());
        assert_eq!(manager.token().unwrap().as_str(), "old-token");
        let sent = transport.requests_to("/api/me");
        assert_eq!(sent[0].header_value("Authorization"), Some("Bearer old-token"));
        assert_eq!(sent[0].header_value("Pragma"), Some("no-cache"));
    }
}
