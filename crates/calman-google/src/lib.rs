//! Google Calendar backend for calman.
//!
//! This crate owns everything that talks to Google:
//!
//! - [`GoogleSession`] - Token lifecycle plus the [`CalendarApi`] impl
//! - [`CalendarApi`] - The async trait the command dispatcher consumes
//! - [`CalendarClient`] - Thin REST client over the Calendar v3 API
//! - [`OAuthClient`] - Installed-app OAuth flow with PKCE
//! - [`ApiError`] - Error types for backend operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   calman-cli     │  menu commands
//! └────────┬─────────┘
//!          │  &dyn CalendarApi
//!          ▼
//! ┌──────────────────┐     ┌───────────────┐
//! │  GoogleSession   │────▶│ TokenStorage  │
//! └────────┬─────────┘     └───────┬───────┘
//!          │                       │ refresh
//!          ▼                       ▼
//! ┌──────────────────┐     ┌───────────────┐
//! │  CalendarClient  │     │  OAuthClient  │
//! └────────┬─────────┘     └───────────────┘
//!          │ HTTPS
//!          ▼
//!   Google Calendar v3
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calman_google::{CalendarApi, GoogleConfig, GoogleSession, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let session = GoogleSession::connect(GoogleConfig::new(credentials))?;
//! if session.needs_reauth() {
//!     session.authenticate().await?;
//! }
//! let events = session.list_events("primary", from, to, Some(10)).await?;
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod tokens;

// Re-export main types at crate root
pub use batch::{BatchRequest, BatchResponsePart};
pub use client::{BatchOutcome, CalendarClient};
pub use config::{GoogleConfig, OAuthCredentials};
pub use error::{ApiError, ApiErrorKind, ApiResult};
pub use oauth::OAuthClient;
pub use session::{BoxFuture, CalendarApi, GoogleSession};
pub use tokens::{TokenInfo, TokenStorage};
