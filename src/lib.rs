//! Session layer of the agency back-office.
//!
//! - [`guard::SessionGuard`] verifies the stored session once per page load.
//! - [`scheduler::RefreshScheduler`] keeps the token fresh while the user is
//!   active and ends the session after sustained inactivity.
//! - [`client::ApiClient`] is the single way dashboards talk to `/api/*`.
//!
//! All three share one [`session::SessionManager`].

pub mod auth;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod store;
pub mod token;
pub mod transport;
pub mod ui;
pub mod version;

#[cfg(test)]
mod tests;

pub use client::{ApiClient, CallOptions, RequestBody};
pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use guard::{GuardOutcome, SessionGuard};
pub use scheduler::RefreshScheduler;
pub use session::{SessionManager, TerminationReason};
pub use state::{ActivityEvent, SessionPhase};
