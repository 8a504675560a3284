//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so handlers can return it directly as
//! JSON. Field names are camelCase on the wire to match the mobile client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_shared::{DeliveryStatus, ListingType, RentalStatus, TrustReason};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user profile. The primary key is the identity provider's opaque uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    /// Reputation, adjusted only through [`Database::adjust_trust_score`].
    ///
    /// [`Database::adjust_trust_score`]: crate::Database::adjust_trust_score
    pub trust_score: i64,
    pub listed_items: i64,
    pub borrowed_items: i64,
    pub created_at: DateTime<Utc>,
}

/// Incoming profile fields from the identity provider or a profile edit.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpsert {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A listed item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    /// Currency units per day.
    pub price: f64,
    pub image_url: Option<String>,
    pub available: bool,
    pub listing_type: ListingType,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to list a new item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub available: bool,
    pub listing_type: ListingType,
    pub category: String,
}

/// Partial update of an item; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub available: Option<bool>,
    pub listing_type: Option<ListingType>,
    pub category: Option<String>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.available.is_none()
            && self.listing_type.is_none()
            && self.category.is_none()
    }
}

/// Optional filters for listing items. Empty filter lists everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub owner_id: Option<String>,
    pub category: Option<String>,
    pub listing_type: Option<ListingType>,
    pub available: Option<bool>,
}

// ---------------------------------------------------------------------------
// Rental
// ---------------------------------------------------------------------------

/// A rental agreement between a lender and a borrower.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Uuid,
    pub item_id: Uuid,
    pub borrower_id: String,
    pub lender_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub return_deadline: DateTime<Utc>,
    pub status: RentalStatus,
    pub borrower_marked_return: bool,
    pub return_confirmed: bool,
    pub reminder_sent: bool,
    pub penalty_applied: bool,
    /// Stamped when the borrower marks the item returned.
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Rental {
    /// A return counts as on time when it was stamped at or before the deadline.
    pub fn returned_on_time(&self) -> bool {
        self.return_date
            .map(|returned| returned <= self.return_deadline)
            .unwrap_or(false)
    }
}

/// Fields needed to open a rental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub item_id: Uuid,
    pub borrower_id: String,
    pub lender_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub return_deadline: DateTime<Utc>,
}

/// Which side of a rental a user is on, for listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RentalRole {
    Borrower,
    Lender,
}

/// Result of a lender confirming a return.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOutcome {
    pub rental: Rental,
    pub on_time: bool,
    pub trust_delta: i64,
}

/// Counters produced by one reminder/overdue sweep.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub scanned: usize,
    pub reminders_queued: usize,
    pub marked_overdue: usize,
    pub penalties_applied: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// OTP
// ---------------------------------------------------------------------------

/// Email verification code; one row per email address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

// ---------------------------------------------------------------------------
// Wishlist
// ---------------------------------------------------------------------------

/// Snapshot of an item saved to a user's wishlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub uid: String,
    pub item_id: Uuid,
    pub title: String,
    pub price: f64,
    pub image_url: Option<String>,
    pub listing_type: ListingType,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A conversation between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub user_a: String,
    pub user_b: String,
    pub last_message: Option<String>,
    pub last_sender_id: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub unread_a: i64,
    pub unread_b: i64,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Unread counter for one participant; zero for outsiders.
    pub fn unread_for(&self, uid: &str) -> i64 {
        if uid == self.user_a {
            self.unread_a
        } else if uid == self.user_b {
            self.unread_b
        } else {
            0
        }
    }
}

/// A single chat message. Messages are never edited, only their status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
}

// ---------------------------------------------------------------------------
// Trust audit
// ---------------------------------------------------------------------------

/// One trust-score adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrustEvent {
    pub id: Uuid,
    pub uid: String,
    pub delta: i64,
    pub reason: TrustReason,
    pub rental_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Rental proposal details forwarded to the item owner by email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalNotice {
    pub recipient_id: Option<String>,
    pub recipient_email: Option<String>,
    pub sender_id: String,
    pub sender_name: String,
    pub item_title: String,
    pub start_date: String,
    pub end_date: String,
    pub text: String,
    pub item_image: Option<String>,
    pub chat_id: String,
}

/// A notification waiting to be delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboxEvent {
    OtpCode {
        email: String,
        code: String,
        expires_at: DateTime<Utc>,
    },
    RentalProposal(ProposalNotice),
    ReturnReminder {
        rental_id: Uuid,
        borrower_id: String,
        item_id: Uuid,
        return_deadline: DateTime<Utc>,
    },
    ReturnConfirmed {
        rental_id: Uuid,
        borrower_id: String,
        lender_id: String,
        item_id: Uuid,
        on_time: bool,
        trust_delta: i64,
    },
}

impl OutboxEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OtpCode { .. } => "otp_code",
            Self::RentalProposal(_) => "rental_proposal",
            Self::ReturnReminder { .. } => "return_reminder",
            Self::ReturnConfirmed { .. } => "return_confirmed",
        }
    }
}

/// A stored outbox row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub id: i64,
    pub event: OutboxEvent,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}
