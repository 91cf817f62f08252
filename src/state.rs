//! Session state: activity clock, refresh clock and phase classification

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

use crate::config::TimingConfig;

/// Resolved session timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// No interaction for longer than this terminates the session.
    pub inactivity_timeout: Duration,
    /// Period of the proactive refresh timer.
    pub refresh_interval: Duration,
    /// Period of the inactivity trip-wire timer.
    pub inactivity_check: Duration,
    /// Age after which a non-forced refresh check renews the token.
    pub refresh_threshold: Duration,
    /// No interaction for this long makes the refresh tick skip the network.
    pub idle_after: Duration,
    /// Pause between the termination message and the redirect.
    pub redirect_delay: Duration,
    /// Pause before the guard reads local state on page load.
    pub guard_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_secs),
            refresh_interval: Duration::from_secs(config.refresh_interval_secs),
            inactivity_check: Duration::from_secs(config.inactivity_check_secs),
            refresh_threshold: Duration::from_secs(config.refresh_threshold_secs),
            idle_after: Duration::from_secs(config.idle_after_secs),
            redirect_delay: Duration::from_millis(config.redirect_delay_ms),
            guard_delay: Duration::from_millis(config.guard_delay_ms),
        }
    }
}

/// Where the session stands at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Recent activity, token renewed within the threshold.
    Fresh,
    /// Recent activity, token older than the threshold.
    StaleToken,
    /// No activity within the idle window; periodic refresh is skipped.
    Idle,
    /// No activity within the inactivity timeout; the session must end.
    Expired,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Fresh => "fresh",
            SessionPhase::StaleToken => "stale-token",
            SessionPhase::Idle => "idle",
            SessionPhase::Expired => "expired",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time elapsed from `since` to `now`; zero if `since` lies in the future.
pub fn elapsed(now: DateTime<Utc>, since: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

/// Classify the session from its two clocks.
pub fn classify(
    now: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    last_refresh: DateTime<Utc>,
    timing: &Timing,
) -> SessionPhase {
    let idle_for = elapsed(now, last_activity);
    if idle_for > timing.inactivity_timeout {
        SessionPhase::Expired
    } else if idle_for >= timing.idle_after {
        SessionPhase::Idle
    } else if elapsed(now, last_refresh) >= timing.refresh_threshold {
        SessionPhase::StaleToken
    } else {
        SessionPhase::Fresh
    }
}

/// Kinds of interaction that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Pointer,
    Keyboard,
    Scroll,
    Touch,
    /// An outgoing call through the API client.
    ApiCall,
}

/// Mutable per-process session state. Not persisted.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub last_activity: DateTime<Utc>,
    pub last_refresh: DateTime<Utc>,
    pub verified: bool,
    pub terminated: bool,
}

impl SessionState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            last_refresh: now,
            verified: false,
            terminated: false,
        }
    }

    pub fn phase(&self, now: DateTime<Utc>, timing: &Timing) -> SessionPhase {
        classify(now, self.last_activity, self.last_refresh, timing)
    }

    pub fn refresh_due(&self, now: DateTime<Utc>, timing: &Timing) -> bool {
        elapsed(now, self.last_refresh) >= timing.refresh_threshold
    }

    pub fn inactivity_exceeded(&self, now: DateTime<Utc>, timing: &Timing) -> bool {
        elapsed(now, self.last_activity) > timing.inactivity_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn mins(m: i64) -> ChronoDuration {
        ChronoDuration::minutes(m)
    }

    #[test]
    fn test_classify_fresh() {
        let timing = Timing::default();
        let now = t0();
        assert_eq!(
            classify(now, now - mins(1), now - mins(2), &timing),
            SessionPhase::Fresh
        );
    }

    #[test]
    fn test_classify_stale_token() {
        let timing = Timing::default();
        let now = t0();
        assert_eq!(
            classify(now, now - mins(1), now - mins(10), &timing),
            SessionPhase::StaleToken
        );
    }

    #[test]
    fn test_classify_idle_between_windows() {
        let timing = Timing::default();
        let now = t0();
        for idle in [5, 12, 30] {
            assert_eq!(
                classify(now, now - mins(idle), now - mins(20), &timing),
                SessionPhase::Idle,
                "idle for {idle} minutes"
            );
        }
    }

    #[test]
    fn test_classify_expired_after_timeout() {
        let timing = Timing::default();
        let now = t0();
        assert_eq!(
            classify(now, now - mins(31), now, &timing),
            SessionPhase::Expired
        );
        assert_eq!(
            classify(now, now - mins(30) - ChronoDuration::seconds(1), now, &timing),
            SessionPhase::Expired
        );
    }

    #[test]
    fn test_refresh_threshold_boundary() {
        let timing = Timing::default();
        let mut state = SessionState::new(t0());

        let just_before = t0() + mins(9) + ChronoDuration::seconds(59);
        assert!(!state.refresh_due(just_before, &timing));

        let just_after = t0() + mins(10) + ChronoDuration::seconds(1);
        assert!(state.refresh_due(just_after, &timing));

        state.last_refresh = just_after;
        assert!(!state.refresh_due(just_after, &timing));
    }

    #[test]
    fn test_future_timestamps_count_as_zero() {
        let now = t0();
        assert_eq!(elapsed(now, now + mins(3)), Duration::ZERO);
    }
}
