//! Email verification code records.

use rusqlite::{params, OptionalExtension};

use crate::database::{parse_timestamp, Database};
use crate::error::Result;
use crate::models::{OtpRecord, OutboxEvent};
use crate::outbox::enqueue_in;

impl Database {
    /// Persist a fresh code, replacing any earlier record for the email,
    /// and queue the email that delivers it.
    ///
    /// Both writes commit together; delivery happens later and may fail
    /// without affecting the stored code.
    pub fn store_otp(&self, record: &OtpRecord) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO otp_verifications (email, code, created_at, expires_at, verified)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.email,
                record.code,
                record.created_at.to_rfc3339(),
                record.expires_at.to_rfc3339(),
                record.verified,
            ],
        )?;
        enqueue_in(
            &tx,
            &OutboxEvent::OtpCode {
                email: record.email.clone(),
                code: record.code.clone(),
                expires_at: record.expires_at,
            },
            record.created_at,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_otp(&self, email: &str) -> Result<Option<OtpRecord>> {
        let record = self
            .conn()?
            .query_row(
                "SELECT email, code, created_at, expires_at, verified
                 FROM otp_verifications WHERE email = ?1",
                params![email],
                |row| {
                    let created_str: String = row.get(2)?;
                    let expires_str: String = row.get(3)?;
                    Ok(OtpRecord {
                        email: row.get(0)?,
                        code: row.get(1)?,
                        created_at: parse_timestamp(2, &created_str)?,
                        expires_at: parse_timestamp(3, &expires_str)?,
                        verified: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Flip the verified flag if it is still clear.
    ///
    /// Returns `false` when another request verified the code first.
    pub fn mark_otp_verified(&self, email: &str, code: &str) -> Result<bool> {
        let affected = self.conn()?.execute(
            "UPDATE otp_verifications SET verified = 1
             WHERE email = ?1 AND code = ?2 AND verified = 0",
            params![email, code],
        )?;
        Ok(affected == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(email: &str, code: &str) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            email: email.to_string(),
            code: code.to_string(),
            created_at: now,
            expires_at: now + Duration::minutes(5),
            verified: false,
        }
    }

    #[test]
    fn store_overwrites_and_queues_email() {
        let db = Database::open_in_memory().unwrap();
        db.store_otp(&record("x@iitrpr.ac.in", "111111")).unwrap();
        db.store_otp(&record("x@iitrpr.ac.in", "222222")).unwrap();

        let stored = db.get_otp("x@iitrpr.ac.in").unwrap().unwrap();
        assert_eq!(stored.code, "222222");
        assert!(!stored.verified);

        let pending = db.pending_outbox(10, 5).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].event.kind(), "otp_code");
    }

    #[test]
    fn verify_flag_flips_once() {
        let db = Database::open_in_memory().unwrap();
        db.store_otp(&record("y@iitrpr.ac.in", "123456")).unwrap();

        assert!(!db.mark_otp_verified("y@iitrpr.ac.in", "000000").unwrap());
        assert!(db.mark_otp_verified("y@iitrpr.ac.in", "123456").unwrap());
        assert!(!db.mark_otp_verified("y@iitrpr.ac.in", "123456").unwrap());
        assert!(db.get_otp("y@iitrpr.ac.in").unwrap().unwrap().verified);
    }

    #[test]
    fn missing_email_reads_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_otp("nobody@iitrpr.ac.in").unwrap().is_none());
    }
}
