//! Configuration management for the agency session layer

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SessionError};
use crate::state::Timing;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Session timing, in seconds unless the field says otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub inactivity_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub inactivity_check_secs: u64,
    pub refresh_threshold_secs: u64,
    pub idle_after_secs: u64,
    pub redirect_delay_ms: u64,
    pub guard_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 30 * 60,
            refresh_interval_secs: 5 * 60,
            inactivity_check_secs: 60,
            refresh_threshold_secs: 10 * 60,
            idle_after_secs: 5 * 60,
            redirect_delay_ms: 1500,
            guard_delay_ms: 100,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub base_url: String,
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
    pub login_page: String,
    pub logout_page: String,
    pub me_path: String,
    pub refresh_path: String,
    pub login_path: String,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: 30,
            verbose: false,
            storage_dir: default_storage_dir(),
            login_page: "/login.html".to_string(),
            logout_page: "/logout.html".to_string(),
            me_path: "/api/me".to_string(),
            refresh_path: "/api/refresh".to_string(),
            login_path: "/api/login".to_string(),
            timing: TimingConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Load from the default config file (if present) and `AGENCY_*` env vars.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        Self::from_file_and_env(Some(path))
    }

    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let defaults = Self::default();
        let timing = &defaults.timing;

        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url.clone())?
            .set_default("timeout", defaults.timeout)?
            .set_default("verbose", defaults.verbose)?
            .set_default(
                "storage_dir",
                defaults.storage_dir.to_string_lossy().to_string(),
            )?
            .set_default("login_page", defaults.login_page.clone())?
            .set_default("logout_page", defaults.logout_page.clone())?
            .set_default("me_path", defaults.me_path.clone())?
            .set_default("refresh_path", defaults.refresh_path.clone())?
            .set_default("login_path", defaults.login_path.clone())?
            .set_default("timing.inactivity_timeout_secs", timing.inactivity_timeout_secs)?
            .set_default("timing.refresh_interval_secs", timing.refresh_interval_secs)?
            .set_default("timing.inactivity_check_secs", timing.inactivity_check_secs)?
            .set_default("timing.refresh_threshold_secs", timing.refresh_threshold_secs)?
            .set_default("timing.idle_after_secs", timing.idle_after_secs)?
            .set_default("timing.redirect_delay_ms", timing.redirect_delay_ms)?
            .set_default("timing.guard_delay_ms", timing.guard_delay_ms)?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(
            Environment::with_prefix("AGENCY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(SessionError::invalid_endpoint("Base URL cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(SessionError::invalid_endpoint(format!(
                "Base URL must start with http:// or https://: {}",
                self.base_url
            )));
        }
        let t = &self.timing;
        if t.refresh_interval_secs == 0 || t.inactivity_check_secs == 0 {
            return Err(SessionError::config("Timer periods must be greater than zero"));
        }
        if t.idle_after_secs > t.inactivity_timeout_secs {
            return Err(SessionError::config(
                "idle_after_secs cannot exceed inactivity_timeout_secs",
            ));
        }
        Ok(())
    }

    /// Resolve `endpoint` against the base URL. Absolute URLs pass through.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint)
    }

    /// True for the refresh and login endpoints, which never trigger a refresh themselves.
    /// Classified on the resolved URL, so `api/login` and `/api/login` agree.
    pub fn is_auth_endpoint(&self, endpoint: &str) -> bool {
        let resolved = self.endpoint_url(endpoint);
        let path = resolved
            .split(['?', '#'])
            .next()
            .unwrap_or(&resolved)
            .trim_end_matches('/');
        [&self.refresh_path, &self.login_path].iter().any(|p| {
            let p = p.trim_start_matches('/').trim_end_matches('/');
            path.ends_with(&format!("/{}", p))
        })
    }

    /// True for pages on which the session guard does not run.
    pub fn is_public_page(&self, page: &str) -> bool {
        let page = page.split(['?', '#']).next().unwrap_or(page);
        [&self.login_page, &self.logout_page]
            .iter()
            .any(|p| page == p.as_str() || page.ends_with(p.as_str()))
    }

    pub fn timing(&self) -> Timing {
        Timing::from(&self.timing)
    }

    pub fn local_storage_path(&self) -> PathBuf {
        self.storage_dir.join("local.json")
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agency")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agency")
}

/// Builder for SessionConfig
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    storage_dir: Option<PathBuf>,
    timing: Option<TimingConfig>,
    config_file: Option<PathBuf>,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn storage_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.storage_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        let mut config = SessionConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(storage_dir) = self.storage_dir {
            config.storage_dir = storage_dir;
        }
        if let Some(timing) = self.timing {
            config.timing = timing;
        }

        config.validate()?;
        Ok(config)
    }
}
