//! Session manager: owns the session state and the single refresh path.
//!
//! One `SessionManager` exists per process ("page load"). The guard, the
//! refresh scheduler and the API client all hold an `Arc` to it; none of them
//! keeps session state of its own.

use agency_protocol::{ErrorBody, RefreshTokenResponse};
use chrono::{DateTime, Utc};
use reqwest::Method;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::state::{ActivityEvent, SessionPhase, SessionState, Timing};
use crate::store::SessionStorage;
use crate::token::SessionToken;
use crate::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::ui::{Navigator, TerminalNavigator};

/// Headers that keep intermediaries and the browser cache out of API traffic
pub(crate) const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-cache, no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

/// Why a session was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// No token or no profile in local storage.
    MissingSession,
    /// The stored profile is malformed or lacks `username`/`type`.
    InvalidProfile,
    /// The identity endpoint rejected the token.
    Rejected,
    /// No interaction for longer than the inactivity timeout.
    Inactivity,
    /// The refresh endpoint answered 401 or 403.
    RefreshRejected,
    /// A call stayed unauthorized after the forced refresh and retry.
    Unauthorized,
    /// The user signed out.
    Logout,
}

impl TerminationReason {
    /// Message shown to the user before the redirect. Logout shows none.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::MissingSession | Self::InvalidProfile => {
                Some("Your session could not be found. Please sign in again.")
            }
            Self::Rejected | Self::RefreshRejected | Self::Unauthorized => {
                Some("Your session has expired. Please sign in again.")
            }
            Self::Inactivity => {
                Some("You were signed out after 30 minutes of inactivity.")
            }
            Self::Logout => None,
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingSession => "missing session",
            Self::InvalidProfile => "invalid user profile",
            Self::Rejected => "session rejected by server",
            Self::Inactivity => "inactivity timeout",
            Self::RefreshRejected => "refresh rejected",
            Self::Unauthorized => "unauthorized after retry",
            Self::Logout => "logout",
        };
        f.write_str(text)
    }
}

enum RefreshOutcome {
    Renewed,
    Rejected(u16),
}

/// Owner of the session state, storage, transport and navigation.
#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    timing: Timing,
    storage: SessionStorage,
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    state: Mutex<SessionState>,
    refresh_lock: tokio::sync::Mutex<()>,
    terminated_tx: watch::Sender<bool>,
}

impl SessionManager {
    pub fn builder(config: SessionConfig) -> SessionManagerBuilder {
        SessionManagerBuilder::new(config)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.storage.token()
    }

    /// Snapshot of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase(self.now(), &self.timing)
    }

    pub fn inactivity_exceeded(&self) -> bool {
        self.state().inactivity_exceeded(self.now(), &self.timing)
    }

    pub fn is_verified(&self) -> bool {
        self.state().verified
    }

    pub fn is_terminated(&self) -> bool {
        self.state().terminated
    }

    /// Receiver that flips to `true` when the session is terminated.
    pub fn termination_signal(&self) -> watch::Receiver<bool> {
        self.terminated_tx.subscribe()
    }

    /// Every event counts; there is no debounce.
    pub fn record_activity(&self, event: ActivityEvent) {
        let now = self.now();
        trace!(?event, "activity");
        self.state().last_activity = now;
    }

    pub(crate) fn mark_verified(&self) {
        self.state().verified = true;
    }

    /// Reset both clocks after a fresh login and lift a previous termination.
    pub(crate) fn begin_session(&self) {
        let now = self.now();
        {
            let mut state = self.state();
            *state = SessionState::new(now);
            state.verified = true;
        }
        self.terminated_tx.send_replace(false);
    }

    /// Renew the token when forced or when the last refresh is older than the
    /// threshold. Returns whether a refresh happened.
    ///
    /// A 401/403 from the refresh endpoint terminates the session and returns
    /// `Ok(false)`. Other failures are returned as errors and leave the state
    /// untouched. Refreshes are serialised: a caller that waited for another
    /// refresh re-checks the threshold before sending its own.
    pub async fn refresh_token_if_needed(&self, force: bool) -> Result<bool> {
        let outcome = {
            let _in_flight = self.refresh_lock.lock().await;

            if !force && !self.state().refresh_due(self.now(), &self.timing) {
                return Ok(false);
            }

            let Some(token) = self.storage.token() else {
                debug!("no token stored, skipping refresh");
                return Ok(false);
            };

            self.request_refresh(&token).await?
        };

        match outcome {
            RefreshOutcome::Renewed => Ok(true),
            RefreshOutcome::Rejected(status) => {
                warn!(status, "token refresh rejected");
                self.terminate(TerminationReason::RefreshRejected).await;
                Ok(false)
            }
        }
    }

    async fn request_refresh(&self, token: &SessionToken) -> Result<RefreshOutcome> {
        let url = self.config.endpoint_url(&self.config.refresh_path);
        let mut request = HttpRequest::new(Method::POST, url)
            .header("Authorization", token.bearer())
            .header("Content-Type", "application/json");
        for (name, value) in NO_CACHE_HEADERS {
            request = request.header(name, value);
        }

        let response = self.transport.send(request).await?;

        if response.status == 401 || response.status == 403 {
            return Ok(RefreshOutcome::Rejected(response.status));
        }

        if !response.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(ErrorBody::into_message)
                .unwrap_or_else(|| format!("Token refresh failed with HTTP {}", response.status));
            return Err(SessionError::api(response.status, message));
        }

        let body: RefreshTokenResponse = serde_json::from_str(&response.body).map_err(|e| {
            SessionError::invalid_response(response.status, format!("Invalid refresh response: {}", e))
        })?;
        let new_token = SessionToken::new(body.token).ok_or_else(|| {
            SessionError::invalid_response(response.status, "Refresh response carried an empty token")
        })?;

        self.storage.set_token(&new_token)?;
        let now = self.now();
        self.state().last_refresh = now;
        info!(expires_at = ?new_token.expires_at(), "session token refreshed");

        Ok(RefreshOutcome::Renewed)
    }

    /// Clear local and session storage, tell the user, then redirect to login.
    ///
    /// Safe to call any number of times from any path. Storage is cleared on
    /// every call; the message and the redirect happen once per session.
    pub async fn terminate(&self, reason: TerminationReason) {
        if let Err(e) = self.storage.clear_all() {
            warn!(error = %e, "failed to clear session storage");
        }

        let first = {
            let mut state = self.state();
            let first = !state.terminated;
            state.terminated = true;
            state.verified = false;
            first
        };
        if !first {
            debug!(%reason, "session already terminated");
            return;
        }

        info!(%reason, "terminating session");
        if let Some(message) = reason.user_message() {
            self.navigator.notify(message);
            tokio::time::sleep(self.timing.redirect_delay).await;
        }
        self.navigator.redirect(&self.config.login_page);

        // Observers may tear the timers down, so signal only once navigation is done.
        self.terminated_tx.send_replace(true);
    }
}

/// Builder for SessionManager; unset parts default to the production ones.
#[derive(Debug)]
pub struct SessionManagerBuilder {
    config: SessionConfig,
    storage: Option<SessionStorage>,
    transport: Option<Arc<dyn Transport>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionManagerBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            storage: None,
            transport: None,
            navigator: None,
            clock: None,
        }
    }

    pub fn storage(mut self, storage: SessionStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Arc<SessionManager>> {
        self.config.validate()?;

        let storage = match self.storage {
            Some(storage) => storage,
            None => SessionStorage::open(self.config.local_storage_path())?,
        };
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config)?),
        };
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(TerminalNavigator::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let now = clock.now();
        let (terminated_tx, _) = watch::channel(false);

        Ok(Arc::new(SessionManager {
            timing: self.config.timing(),
            config: self.config,
            storage,
            transport,
            navigator,
            clock,
            state: Mutex::new(SessionState::new(now)),
            refresh_lock: tokio::sync::Mutex::new(()),
            terminated_tx,
        }))
    }
}
