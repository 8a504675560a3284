//! # campus-server
//!
//! HTTP backend for the campus rentals marketplace.
//!
//! - **REST API** (axum) for users, items, wishlists, rentals and chats
//! - **OTP verifier** for campus email sign-up
//! - **Identity bridge** hook that creates profiles for new accounts
//! - **Notification dispatcher** draining a durable outbox to SMTP or an
//!   HTTP email API
//! - **Daily sweep** sending return reminders and flagging overdue rentals
//! - **Per-IP rate limiting**

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod notify;
pub mod otp;
pub mod rate_limit;
pub mod routes;
pub mod sweep;

pub use api::{build_router, serve, AppState};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ServerConfig;
pub use error::ApiError;
