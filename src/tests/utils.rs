//! Test utilities and helpers for unit tests
//!
//! This module provides common testing utilities including:
//! - Session fixtures wired to the mocks
//! - Test data generators

#[cfg(test)]
pub mod test_helpers {
    use agency_protocol::UserProfile;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::config::{SessionConfig, TimingConfig};
    use crate::session::SessionManager;
    use crate::store::SessionStorage;
    use crate::tests::mocks::{ManualClock, MockTransport, RecordingNavigator};
    use crate::token::SessionToken;

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// Build an unsigned JWT whose payload carries `exp`
    pub fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"42","exp":{}}}"#, exp));
        format!("{}.{}.signature", header, payload)
    }

    pub fn sample_profile() -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "username": "maria",
            "name": "Maria Rossi",
            "type": "semiadmin",
        }))
        .expect("valid profile")
    }

    /// Default configuration with the waits removed
    pub fn test_config() -> SessionConfig {
        SessionConfig {
            timing: TimingConfig {
                redirect_delay_ms: 0,
                guard_delay_ms: 0,
                ..TimingConfig::default()
            },
            ..SessionConfig::default()
        }
    }

    pub struct Fixture {
        pub manager: Arc<SessionManager>,
        pub transport: Arc<MockTransport>,
        pub navigator: Arc<RecordingNavigator>,
        pub clock: Arc<ManualClock>,
    }

    /// Manager with empty in-memory storage
    pub fn empty_fixture() -> Fixture {
        fixture_with(test_config())
    }

    pub fn fixture_with(config: SessionConfig) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let clock = Arc::new(ManualClock::default());

        let manager = SessionManager::builder(config)
            .storage(SessionStorage::in_memory())
            .transport(transport.clone())
            .navigator(navigator.clone())
            .clock(clock.clone())
            .build()
            .expect("manager builds");

        Fixture {
            manager,
            transport,
            navigator,
            clock,
        }
    }

    /// Manager holding token `old-token` and the sample profile
    pub fn signed_in_fixture() -> Fixture {
        sign_in(empty_fixture())
    }

    pub fn signed_in_fixture_with(config: SessionConfig) -> Fixture {
        sign_in(fixture_with(config))
    }

    fn sign_in(fixture: Fixture) -> Fixture {
        let storage = fixture.manager.storage();
        storage
            .set_token(&SessionToken::new("old-token").expect("token"))
            .expect("store token");
        storage.set_user(&sample_profile()).expect("store user");
        fixture
    }
}
