use agency_session::auth::AuthService;
use agency_session::client::{ApiClient, CallOptions};
use agency_session::config::SessionConfig;
use agency_session::error::{Result, SessionError};
use agency_session::guard::{GuardOutcome, SessionGuard};
use agency_session::scheduler::RefreshScheduler;
use agency_session::session::SessionManager;
use agency_session::state::ActivityEvent;
use agency_session::ui::UI;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::{CallArgs, Commands, LoginArgs};

/// Page the CLI stands in for when the guard runs
const CLI_PAGE: &str = "/index.html";

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    ui: UI,
}

impl CliHandler {
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            ui: UI::new(),
        }
    }

    fn load_config(&self) -> Result<SessionConfig> {
        SessionConfig::load(self.config_path.as_deref())
    }

    fn manager(&self) -> Result<Arc<SessionManager>> {
        SessionManager::builder(self.load_config()?).build()
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status(),
            Commands::Call(args) => self.handle_call(args).await,
            Commands::Watch => self.handle_watch().await,
        }
    }

    /// Run the guard the way a dashboard page does on load.
    async fn guarded_manager(&self) -> Result<(Arc<SessionManager>, GuardOutcome)> {
        let manager = self.manager()?;
        let outcome = SessionGuard::new(manager.clone()).verify(CLI_PAGE).await;
        match outcome {
            GuardOutcome::Failed(failure) => Err(SessionError::session_not_found(format!(
                "Session check failed: {}",
                failure
            ))),
            outcome => Ok((manager, outcome)),
        }
    }

    /// Handle login command
    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let theme = ColorfulTheme::default();
        let username = match args.username {
            Some(username) => username,
            None => Input::<String>::with_theme(&theme)
                .with_prompt("Username")
                .interact_text()?,
        };
        let password = match args.password {
            Some(password) => password,
            None => Password::with_theme(&theme)
                .with_prompt("Password")
                .interact()?,
        };

        let service = AuthService::new(self.manager()?);
        let user = service.login(&username, &password).await?;
        self.ui.success(&format!(
            "Signed in as {} ({})",
            user.display_name(),
            user.role.as_str()
        ));
        Ok(())
    }

    /// Handle logout command
    async fn handle_logout(&mut self) -> Result<()> {
        AuthService::new(self.manager()?).logout().await;
        Ok(())
    }

    /// Handle status command
    fn handle_status(&mut self) -> Result<()> {
        let manager = self.manager()?;
        let base_url = manager.config().base_url.clone();
        let status = AuthService::new(manager).status();

        let mut rows = vec![(
            "Authentication",
            self.ui
                .format_auth_status(status.authenticated && !status.token_expired, status.token_expired),
        )];

        if let Some(user) = &status.user {
            rows.push(("Username", user.username.clone()));
            rows.push(("Name", self.ui.format_user_field(user.name.clone())));
            rows.push(("Role", user.role.as_str().to_string()));
        }
        rows.push((
            "Token expires",
            self.ui
                .format_user_field(status.token_expires_at.map(|t| t.to_rfc3339())),
        ));
        rows.push(("Session", self.ui.format_phase(status.phase)));
        rows.push(("Server", base_url));

        self.ui.card("Status", rows);
        Ok(())
    }

    /// Handle call command
    async fn handle_call(&mut self, args: CallArgs) -> Result<()> {
        let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| SessionError::invalid_input(format!("Unknown HTTP method: {}", args.method)))?;

        let mut options = CallOptions::method(method);
        if let Some(data) = &args.data {
            let value: serde_json::Value = serde_json::from_str(data)
                .map_err(|e| SessionError::validation_field(e.to_string(), "data"))?;
            options = options.json(&value)?;
        }

        let (manager, _) = self.guarded_manager().await?;
        let body = ApiClient::new(manager).call(&args.path, options).await?;

        match body {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => self.ui.info("(empty response)"),
        }
        Ok(())
    }

    /// Handle watch command: keep the session alive until Ctrl-C or termination.
    async fn handle_watch(&mut self) -> Result<()> {
        let (manager, outcome) = self.guarded_manager().await?;
        let GuardOutcome::Verified(verified) = outcome else {
            return Err(SessionError::internal("CLI page is not guarded"));
        };

        let mut scheduler = RefreshScheduler::new(manager.clone());
        scheduler.start(&verified);
        self.ui
            .info("Session active. Each line typed counts as activity; Ctrl-C to stop.");

        let mut terminated = manager.termination_signal();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = terminated.wait_for(|t| *t) => break,
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(_)) => manager.record_activity(ActivityEvent::Keyboard),
                    Ok(None) | Err(_) => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                },
            }
        }

        scheduler.stop();
        Ok(())
    }
}
