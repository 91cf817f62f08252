use console::{strip_ansi_codes, Term};
use owo_colors::OwoColorize;
use std::fmt::Debug;
use unicode_width::UnicodeWidthStr;

use crate::state::SessionPhase;

/// Where session termination shows its message and sends the user.
///
/// A browser shell would raise a toast and change `location`; the terminal
/// implementation prints both.
pub trait Navigator: Send + Sync + Debug {
    /// Show a user-visible message before leaving the page.
    fn notify(&self, message: &str);
    /// Navigate to `location`.
    fn redirect(&self, location: &str);
}

/// Navigator for the `agency` binary
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    ui: UI,
}

impl TerminalNavigator {
    pub fn new() -> Self {
        Self { ui: UI::new() }
    }
}

impl Navigator for TerminalNavigator {
    fn notify(&self, message: &str) {
        self.ui.warning(message);
    }

    fn redirect(&self, location: &str) {
        self.ui.info(&format!(
            "Signed out ({}). Run `agency login` to start a new session.",
            location
        ));
    }
}

/// Terminal output helpers
#[derive(Debug)]
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print an error message (color only if supported)
    pub fn error(&self, message: &str) {
        let output = self.colorize(message, |m| m.red().bold().to_string());
        eprintln!("{}", output);
    }

    /// Print a warning message (color only if supported)
    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    /// Print an info message (color only if supported)
    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Format authentication status with appropriate color (if supported)
    pub fn format_auth_status(&self, authenticated: bool, expired: bool) -> String {
        let text = if authenticated {
            "Authenticated"
        } else if expired {
            "Token expired"
        } else {
            "Not authenticated"
        };

        if self.supports_color() {
            if authenticated {
                text.green().to_string()
            } else if expired {
                text.yellow().to_string()
            } else {
                text.red().to_string()
            }
        } else {
            text.to_string()
        }
    }

    pub fn format_phase(&self, phase: SessionPhase) -> String {
        let text = phase.as_str();
        if !self.supports_color() {
            return text.to_string();
        }
        match phase {
            SessionPhase::Fresh => text.green().to_string(),
            SessionPhase::StaleToken | SessionPhase::Idle => text.yellow().to_string(),
            SessionPhase::Expired => text.red().to_string(),
        }
    }

    /// Format user field with fallback for missing data
    pub fn format_user_field(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| "-".to_string())
    }

    /// Create a card-style display for information
    pub fn card(&self, title: &str, content: Vec<(&str, String)>) {
        let term_width = self.width();
        let card_width = term_width.saturating_sub(4).clamp(50, 80);

        let supports_color = self.supports_color();

        println!("╭{}╮", "─".repeat(card_width - 2));
        let title_width = title.width();
        let title_spaces = card_width.saturating_sub(title_width + 4);
        if supports_color {
            println!("│ {} {}│", title.cyan().bold(), " ".repeat(title_spaces));
        } else {
            println!("│ {} {}│", title, " ".repeat(title_spaces));
        }
        println!("├{}┤", "─".repeat(card_width - 2));

        for (label, value) in content {
            // Strip ANSI codes for width calculations
            let label_width = strip_ansi_codes(label).width();
            let value_width = strip_ansi_codes(&value).width();
            let content_width = label_width + value_width + 4;

            let spaces = if content_width < card_width - 1 {
                card_width - content_width - 1
            } else {
                1
            };

            if supports_color {
                println!("│ {}: {}{}│", label.dimmed(), value, " ".repeat(spaces));
            } else {
                println!("│ {}: {}{}│", label, value, " ".repeat(spaces));
            }
        }

        println!("╰{}╯", "─".repeat(card_width - 2));
        println!();
    }

    /// Get terminal width for responsive layout
    pub fn width(&self) -> usize {
        self.term.size().1 as usize
    }

    /// Check if terminal supports color
    pub fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}
