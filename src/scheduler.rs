//! Background token refresh and inactivity timers

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::guard::Verified;
use crate::session::{SessionManager, TerminationReason};
use crate::state::SessionPhase;

/// What a refresh tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session already over; nothing to do.
    Inactive,
    /// Inactivity timeout exceeded; the session was terminated.
    Terminated,
    /// User idle; no network call.
    SkippedIdle,
    /// Token renewed.
    Refreshed,
    /// Refresh attempted and failed; retried on the next tick.
    Failed,
}

/// One run of the periodic refresh timer.
pub async fn refresh_tick(manager: &SessionManager) -> TickOutcome {
    if manager.is_terminated() {
        return TickOutcome::Inactive;
    }

    match manager.phase() {
        SessionPhase::Expired => {
            manager.terminate(TerminationReason::Inactivity).await;
            TickOutcome::Terminated
        }
        SessionPhase::Idle => {
            debug!("user idle, skipping scheduled refresh");
            TickOutcome::SkippedIdle
        }
        SessionPhase::Fresh | SessionPhase::StaleToken => {
            match manager.refresh_token_if_needed(true).await {
                Ok(true) => TickOutcome::Refreshed,
                Ok(false) if manager.is_terminated() => TickOutcome::Terminated,
                Ok(false) => TickOutcome::Inactive,
                Err(e) => {
                    warn!(error = %e, "scheduled token refresh failed");
                    TickOutcome::Failed
                }
            }
        }
    }
}

/// One run of the inactivity trip-wire. Returns whether it terminated the session.
pub async fn inactivity_tick(manager: &SessionManager) -> bool {
    if manager.is_terminated() || !manager.inactivity_exceeded() {
        return false;
    }
    manager.terminate(TerminationReason::Inactivity).await;
    true
}

/// Owns the two timer tasks. Stopped explicitly or on drop.
#[derive(Debug)]
pub struct RefreshScheduler {
    manager: Arc<SessionManager>,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            manager,
            tasks: Vec::new(),
        }
    }

    /// Start both timers. Restarts them if already running.
    pub fn start(&mut self, _verified: &Verified) {
        self.stop();

        let timing = *self.manager.timing();
        info!(
            refresh_every = ?timing.refresh_interval,
            inactivity_check_every = ?timing.inactivity_check,
            "starting session timers"
        );

        let manager = Arc::clone(&self.manager);
        self.tasks.push(tokio::spawn(async move {
            let period = timing.refresh_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = refresh_tick(&manager).await;
                debug!(?outcome, "refresh tick");
            }
        }));

        let manager = Arc::clone(&self.manager);
        self.tasks.push(tokio::spawn(async move {
            let period = timing.inactivity_check;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inactivity_tick(&manager).await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        debug!("stopping session timers");
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
