/// Application name, used in email subjects and the health endpoint.
pub const APP_NAME: &str = "Campus Rentals";

/// Trust score every new profile starts with.
pub const DEFAULT_TRUST_SCORE: i64 = 5;

/// Awarded to the borrower when the lender confirms an on-time return.
pub const ON_TIME_RETURN_REWARD: i64 = 5;

/// Applied (once) when the sweep finds a rental past its deadline.
pub const OVERDUE_PENALTY: i64 = -5;

/// Number of digits in an email verification code.
pub const OTP_DIGITS: u32 = 6;

/// Lifetime of an email verification code in seconds (5 minutes).
pub const OTP_TTL_SECS: i64 = 300;

/// Reminders go out when a deadline falls within this many hours.
pub const REMINDER_WINDOW_HOURS: i64 = 24;

/// Default UTC offset of the campus (IST, +05:30) in minutes.
pub const DEFAULT_CAMPUS_UTC_OFFSET_MINUTES: i32 = 330;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Date format used for rental start/end dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
