//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server starts with zero configuration
//! for local development: mail goes to the log and the database lands in
//! the working directory.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};

use campus_shared::constants::{DEFAULT_CAMPUS_UTC_OFFSET_MINUTES, DEFAULT_HTTP_PORT};

/// Credentials for the HTTP transactional-email API.
#[derive(Clone)]
pub struct EmailApiConfig {
    pub api_url: String,
    pub api_key: String,
}

/// SMTP relay credentials.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

// Secrets stay out of the startup log.
impl std::fmt::Debug for EmailApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailApiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `./campus-rentals.db`
    pub database_path: PathBuf,

    /// Public base URL of the app, used for deep links in emails.
    /// Env: `APP_BASE_URL`
    pub app_base_url: String,

    /// Env: `EMAIL_API_KEY`, `EMAIL_API_URL`
    pub email_api: Option<EmailApiConfig>,

    /// Env: `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`
    pub smtp: Option<SmtpConfig>,

    /// Sender address and display name for every outgoing email.
    /// Env: `EMAIL_FROM`, `EMAIL_FROM_NAME`
    pub email_from: String,
    pub email_from_name: String,

    /// Only addresses ending in `@<domain>` may request a code.
    /// Env: `ALLOWED_EMAIL_DOMAIN`
    /// Default: unset (any domain).
    pub allowed_email_domain: Option<String>,

    /// Bearer token the identity provider presents on the account hook.
    /// Env: `HOOK_TOKEN`
    /// Default: unset (hook disabled).
    pub hook_token: Option<String>,

    /// Wall-clock time of the daily rental sweep, in campus local time.
    /// Env: `SWEEP_TIME` (`HH:MM`)
    /// Default: `09:00`
    pub sweep_time: NaiveTime,

    /// Campus offset from UTC in minutes.
    /// Env: `CAMPUS_UTC_OFFSET_MINUTES`
    /// Default: `330`
    pub campus_offset: FixedOffset,

    /// Env: `OUTBOX_MAX_ATTEMPTS`
    /// Default: `5`
    pub outbox_max_attempts: u32,

    /// Seconds between outbox polls when nothing wakes the dispatcher.
    /// Env: `OUTBOX_POLL_SECS`
    /// Default: `30`
    pub outbox_poll_secs: u64,

    /// Per-IP token bucket.
    /// Env: `RATE_LIMIT_PER_SEC`, `RATE_LIMIT_BURST`
    /// Default: 10 req/s sustained, burst of 30
    pub rate_limit_per_sec: f64,
    pub rate_limit_burst: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./campus-rentals.db"),
            app_base_url: "http://localhost:3000".to_string(),
            email_api: None,
            smtp: None,
            email_from: "no-reply@campus-rentals.local".to_string(),
            email_from_name: campus_shared::constants::APP_NAME.to_string(),
            allowed_email_domain: None,
            hook_token: None,
            sweep_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            campus_offset: default_offset(),
            outbox_max_attempts: 5,
            outbox_poll_secs: 30,
            rate_limit_per_sec: 10.0,
            rate_limit_burst: 30.0,
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("app_base_url", &self.app_base_url)
            .field("email_api", &self.email_api)
            .field("smtp", &self.smtp)
            .field("email_from", &self.email_from)
            .field("allowed_email_domain", &self.allowed_email_domain)
            .field("hook_enabled", &self.hook_token.is_some())
            .field("sweep_time", &self.sweep_time)
            .field("campus_offset", &self.campus_offset)
            .field("outbox_max_attempts", &self.outbox_max_attempts)
            .finish_non_exhaustive()
    }
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_CAMPUS_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix())
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(url) = var("APP_BASE_URL") {
            config.app_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(from) = var("EMAIL_FROM") {
            config.email_from = from;
        }
        if let Some(name) = var("EMAIL_FROM_NAME") {
            config.email_from_name = name;
        }

        if let (Some(api_url), Some(api_key)) = (var("EMAIL_API_URL"), var("EMAIL_API_KEY")) {
            config.email_api = Some(EmailApiConfig { api_url, api_key });
        }

        if let Some(host) = var("SMTP_HOST") {
            let port = var("SMTP_PORT")
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        tracing::warn!(value = %raw, "Invalid SMTP_PORT, using 465");
                        None
                    }
                })
                .unwrap_or(465);
            config.smtp = Some(SmtpConfig {
                host,
                port,
                username: var("SMTP_USERNAME").unwrap_or_default(),
                password: var("SMTP_PASSWORD").unwrap_or_default(),
            });
        }

        if let Some(domain) = var("ALLOWED_EMAIL_DOMAIN") {
            config.allowed_email_domain =
                Some(domain.trim().trim_start_matches('@').to_ascii_lowercase());
        }

        config.hook_token = var("HOOK_TOKEN");

        if let Some(raw) = var("SWEEP_TIME") {
            match NaiveTime::parse_from_str(raw.trim(), "%H:%M") {
                Ok(time) => config.sweep_time = time,
                Err(_) => tracing::warn!(value = %raw, "Invalid SWEEP_TIME, using 09:00"),
            }
        }

        if let Some(raw) = var("CAMPUS_UTC_OFFSET_MINUTES") {
            match raw
                .trim()
                .parse::<i32>()
                .ok()
                .and_then(|minutes| FixedOffset::east_opt(minutes.checked_mul(60)?))
            {
                Some(offset) => config.campus_offset = offset,
                None => tracing::warn!(value = %raw, "Invalid CAMPUS_UTC_OFFSET_MINUTES, using default"),
            }
        }

        if let Some(raw) = var("OUTBOX_MAX_ATTEMPTS") {
            match raw.parse::<u32>() {
                Ok(n) if n > 0 => config.outbox_max_attempts = n,
                _ => tracing::warn!(value = %raw, "Invalid OUTBOX_MAX_ATTEMPTS, using default"),
            }
        }

        if let Some(raw) = var("OUTBOX_POLL_SECS") {
            match raw.parse::<u64>() {
                Ok(n) if n > 0 => config.outbox_poll_secs = n,
                _ => tracing::warn!(value = %raw, "Invalid OUTBOX_POLL_SECS, using default"),
            }
        }

        if let Some(raw) = var("RATE_LIMIT_PER_SEC") {
            match raw.parse::<f64>() {
                Ok(n) if n > 0.0 => config.rate_limit_per_sec = n,
                _ => tracing::warn!(value = %raw, "Invalid RATE_LIMIT_PER_SEC, using default"),
            }
        }

        if let Some(raw) = var("RATE_LIMIT_BURST") {
            match raw.parse::<f64>() {
                Ok(n) if n >= 1.0 => config.rate_limit_burst = n,
                _ => tracing::warn!(value = %raw, "Invalid RATE_LIMIT_BURST, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.campus_offset.local_minus_utc(), 330 * 60);
        assert_eq!(config.sweep_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(config.smtp.is_none());
        assert!(config.hook_token.is_none());
    }

    #[test]
    fn test_reads_values() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("SMTP_HOST", "smtp.example.org"),
            ("SMTP_USERNAME", "mailer"),
            ("ALLOWED_EMAIL_DOMAIN", "@Campus.EDU"),
            ("SWEEP_TIME", "07:30"),
            ("CAMPUS_UTC_OFFSET_MINUTES", "-300"),
            ("APP_BASE_URL", "https://rent.campus.edu/"),
            ("HOOK_TOKEN", "s3cret"),
        ]);

        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.username, "mailer");
        assert_eq!(config.allowed_email_domain.as_deref(), Some("campus.edu"));
        assert_eq!(config.sweep_time, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.campus_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.app_base_url, "https://rent.campus.edu");
        assert_eq!(config.hook_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("SWEEP_TIME", "25:99"),
            ("CAMPUS_UTC_OFFSET_MINUTES", "99999"),
            ("OUTBOX_MAX_ATTEMPTS", "0"),
            ("HOOK_TOKEN", "   "),
        ]);
        let defaults = ServerConfig::default();

        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.sweep_time, defaults.sweep_time);
        assert_eq!(config.campus_offset, defaults.campus_offset);
        assert_eq!(config.outbox_max_attempts, 5);
        assert!(config.hook_token.is_none());
    }

    #[test]
    fn test_email_api_needs_both_values() {
        let partial = from_pairs(&[("EMAIL_API_KEY", "key")]);
        assert!(partial.email_api.is_none());

        let full = from_pairs(&[
            ("EMAIL_API_KEY", "key"),
            ("EMAIL_API_URL", "https://api.mail.example/v3/mail/send"),
        ]);
        assert!(full.email_api.is_some());
        assert!(format!("{:?}", full).contains("<redacted>"));
    }
}
