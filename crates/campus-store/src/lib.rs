//! # campus-store
//!
//! Persistent document store for the campus rentals backend, backed by
//! SQLite.
//!
//! The crate exposes a [`Database`] handle that guards a single
//! `rusqlite::Connection` and provides typed operations per collection:
//! users, items, rentals, OTP records, wishlists, chats, the trust-score
//! audit trail and the notification outbox. Rental lifecycle transitions
//! run as single transactions with conditional updates.

pub mod chats;
pub mod database;
pub mod items;
pub mod migrations;
pub mod models;
pub mod otp;
pub mod outbox;
pub mod rentals;
pub mod trust;
pub mod users;
pub mod wishlist;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
