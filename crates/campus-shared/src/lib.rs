//! # campus-shared
//!
//! Types and constants shared by the store and the HTTP server.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseEnumError;
pub use types::{chat_id_for, DeliveryStatus, ListingType, RentalStatus, TrustReason};
