use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseEnumError;

/// How an item is offered.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Rent,
    Share,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Share => "share",
        }
    }
}

impl FromStr for ListingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rent" => Ok(Self::Rent),
            "share" => Ok(Self::Share),
            other => Err(ParseEnumError::new("listing type", other)),
        }
    }
}

/// Rental status. `ongoing` is the legacy spelling of `active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    #[serde(alias = "ongoing")]
    Active,
    Overdue,
    Returned,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Overdue => "overdue",
            Self::Returned => "returned",
        }
    }
}

impl FromStr for RentalStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "ongoing" => Ok(Self::Active),
            "overdue" => Ok(Self::Overdue),
            "returned" => Ok(Self::Returned),
            other => Err(ParseEnumError::new("rental status", other)),
        }
    }
}

/// Delivery state of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Seen,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Seen => "seen",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "seen" => Ok(Self::Seen),
            other => Err(ParseEnumError::new("delivery status", other)),
        }
    }
}

/// Why a trust score changed. Every adjustment carries one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrustReason {
    OnTimeReturn,
    OverduePenalty,
}

impl TrustReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTimeReturn => "on_time_return",
            Self::OverduePenalty => "overdue_penalty",
        }
    }
}

impl FromStr for TrustReason {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_time_return" => Ok(Self::OnTimeReturn),
            "overdue_penalty" => Ok(Self::OverduePenalty),
            other => Err(ParseEnumError::new("trust reason", other)),
        }
    }
}

/// Chat identifier for a pair of users, independent of who wrote first.
///
/// The two uids are joined with `_`. Any `%` or `_` inside a uid is
/// percent-encoded first, so distinct pairs never share an id.
pub fn chat_id_for(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{}", escape_uid(first), escape_uid(second))
}

fn escape_uid(uid: &str) -> String {
    uid.replace('%', "%25").replace('_', "%5F")
}
