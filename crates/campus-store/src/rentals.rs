//! Rental lifecycle.
//!
//! ```text
//! active --(borrower marks, lender confirms)--> returned
//!   |                                              ^
//!   +--(sweep: deadline passed, unconfirmed)--> overdue
//! ```
//!
//! Each transition is one SQLite transaction. Flag changes are conditional
//! updates, so two concurrent confirmations cannot both award trust.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use campus_shared::constants::{ON_TIME_RETURN_REWARD, OVERDUE_PENALTY};
use campus_shared::{RentalStatus, TrustReason};

use crate::database::{
    not_found, parse_date, parse_enum, parse_opt_timestamp, parse_timestamp, parse_uuid, Database,
};
use crate::error::{Result, StoreError};
use crate::models::{ConfirmOutcome, NewRental, OutboxEvent, Rental, RentalRole, SweepReport};
use crate::outbox::enqueue_in;
use crate::trust::adjust_trust_score_in;
use crate::users::{bump_counter, Counter};

const RENTAL_COLUMNS: &str = "id, item_id, borrower_id, lender_id, start_date, end_date, \
                              return_deadline, status, borrower_marked_return, return_confirmed, \
                              reminder_sent, penalty_applied, return_date, created_at";

/// Statuses the sweep looks at. `ongoing` rows come from older clients.
const OPEN_STATUSES: &str = "('active', 'ongoing')";

impl Database {
    // ------------------------------------------------------------------
    // Create / read
    // ------------------------------------------------------------------

    /// Open a rental in the `active` state and bump the borrower's counter.
    pub fn create_rental(&self, new: &NewRental, now: DateTime<Utc>) -> Result<Rental> {
        let rental = Rental {
            id: Uuid::new_v4(),
            item_id: new.item_id,
            borrower_id: new.borrower_id.clone(),
            lender_id: new.lender_id.clone(),
            start_date: new.start_date,
            end_date: new.end_date,
            return_deadline: new.return_deadline,
            status: RentalStatus::Active,
            borrower_marked_return: false,
            return_confirmed: false,
            reminder_sent: false,
            penalty_applied: false,
            return_date: None,
            created_at: now,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO rentals (id, item_id, borrower_id, lender_id, start_date, end_date,
                                  return_deadline, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rental.id.to_string(),
                rental.item_id.to_string(),
                rental.borrower_id,
                rental.lender_id,
                rental.start_date.to_string(),
                rental.end_date.to_string(),
                rental.return_deadline.to_rfc3339(),
                rental.status.as_str(),
                rental.created_at.to_rfc3339(),
            ],
        )?;
        bump_counter(&tx, &rental.borrower_id, Counter::BorrowedItems, 1)?;
        tx.commit()?;

        tracing::info!(
            rental = %rental.id,
            borrower = %rental.borrower_id,
            lender = %rental.lender_id,
            deadline = %rental.return_deadline,
            "rental created"
        );
        Ok(rental)
    }

    pub fn get_rental(&self, id: Uuid) -> Result<Rental> {
        get_rental_in(&*self.conn()?, id)
    }

    /// Rentals involving `uid`, newest first. `role` narrows to one side.
    pub fn list_rentals(&self, uid: &str, role: Option<RentalRole>) -> Result<Vec<Rental>> {
        let condition = match role {
            Some(RentalRole::Borrower) => "borrower_id = ?1",
            Some(RentalRole::Lender) => "lender_id = ?1",
            None => "(borrower_id = ?1 OR lender_id = ?1)",
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RENTAL_COLUMNS} FROM rentals WHERE {condition} ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![uid], row_to_rental)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Borrower reports the item returned; stamps `return_date = now`.
    ///
    /// Calling it again re-stamps the time. Rejected once the lender has
    /// confirmed.
    pub fn mark_returned(&self, id: Uuid, now: DateTime<Utc>) -> Result<Rental> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        get_rental_in(&tx, id)?;

        let affected = tx.execute(
            "UPDATE rentals SET borrower_marked_return = 1, return_date = ?2
             WHERE id = ?1 AND return_confirmed = 0",
            params![id.to_string(), now.to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::PreconditionFailed(
                "return already confirmed by the lender".to_string(),
            ));
        }

        let rental = get_rental_in(&tx, id)?;
        tx.commit()?;
        tracing::info!(rental = %id, returned_at = %now, "borrower marked return");
        Ok(rental)
    }

    /// Lender confirms the return.
    ///
    /// Requires the borrower to have marked the return. Awards the borrower
    /// trust when the stamped return is not later than the deadline; late
    /// returns get no adjustment here (the sweep already penalised them).
    pub fn confirm_return(&self, id: Uuid, now: DateTime<Utc>) -> Result<ConfirmOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let before = get_rental_in(&tx, id)?;

        let affected = tx.execute(
            "UPDATE rentals SET return_confirmed = 1, status = 'returned'
             WHERE id = ?1 AND borrower_marked_return = 1 AND return_confirmed = 0",
            params![id.to_string()],
        )?;
        if affected == 0 {
            let reason = if before.borrower_marked_return {
                "return already confirmed"
            } else {
                "borrower has not marked the item as returned"
            };
            return Err(StoreError::PreconditionFailed(reason.to_string()));
        }

        let rental = get_rental_in(&tx, id)?;
        let on_time = rental.returned_on_time();
        let trust_delta = if on_time { ON_TIME_RETURN_REWARD } else { 0 };
        if on_time {
            adjust_trust_score_in(
                &tx,
                &rental.borrower_id,
                trust_delta,
                TrustReason::OnTimeReturn,
                Some(rental.id),
                now,
            )?;
        }

        enqueue_in(
            &tx,
            &OutboxEvent::ReturnConfirmed {
                rental_id: rental.id,
                borrower_id: rental.borrower_id.clone(),
                lender_id: rental.lender_id.clone(),
                item_id: rental.item_id,
                on_time,
                trust_delta,
            },
            now,
        )?;
        tx.commit()?;

        tracing::info!(rental = %id, on_time, trust_delta, "return confirmed");
        Ok(ConfirmOutcome {
            rental,
            on_time,
            trust_delta,
        })
    }

    // ------------------------------------------------------------------
    // Sweep
    // ------------------------------------------------------------------

    /// Scan open rentals: queue reminders for deadlines inside
    /// `reminder_window`, and mark unconfirmed rentals whose deadline has
    /// been reached (`deadline <= now`) overdue.
    ///
    /// The overdue penalty is applied once per rental. Repeat runs do not
    /// penalize again: an overdue rental leaves the candidate set and the
    /// `penalty_applied` flag guards the deduction. Reminders are sent
    /// once. Rows with an unreadable deadline are skipped.
    pub fn sweep_rentals(&self, now: DateTime<Utc>, reminder_window: Duration) -> Result<SweepReport> {
        let mut conn = self.conn()?;
        let candidates = load_sweep_candidates(&conn)?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            let (deadline, item_id) = match (
                DateTime::parse_from_rfc3339(&candidate.deadline_raw),
                Uuid::parse_str(&candidate.item_raw),
            ) {
                (Ok(deadline), Ok(item_id)) => (deadline.with_timezone(&Utc), item_id),
                (deadline, item) => {
                    tracing::warn!(
                        rental = %candidate.id,
                        deadline = %candidate.deadline_raw,
                        deadline_ok = deadline.is_ok(),
                        item_ok = item.is_ok(),
                        "skipping rental with unreadable fields"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            let tx = conn.transaction()?;
            let id = candidate.id.to_string();

            if deadline > now && deadline <= now + reminder_window {
                let claimed = tx.execute(
                    "UPDATE rentals SET reminder_sent = 1 WHERE id = ?1 AND reminder_sent = 0",
                    params![id],
                )?;
                if claimed == 1 {
                    enqueue_in(
                        &tx,
                        &OutboxEvent::ReturnReminder {
                            rental_id: candidate.id,
                            borrower_id: candidate.borrower_id.clone(),
                            item_id,
                            return_deadline: deadline,
                        },
                        now,
                    )?;
                    report.reminders_queued += 1;
                }
            }

            if deadline <= now {
                let flagged = tx.execute(
                    &format!(
                        "UPDATE rentals SET status = 'overdue'
                         WHERE id = ?1 AND return_confirmed = 0 AND status IN {OPEN_STATUSES}"
                    ),
                    params![id],
                )?;
                if flagged == 1 {
                    report.marked_overdue += 1;
                    let first_time = tx.execute(
                        "UPDATE rentals SET penalty_applied = 1 WHERE id = ?1 AND penalty_applied = 0",
                        params![id],
                    )?;
                    if first_time == 1 {
                        adjust_trust_score_in(
                            &tx,
                            &candidate.borrower_id,
                            OVERDUE_PENALTY,
                            TrustReason::OverduePenalty,
                            Some(candidate.id),
                            now,
                        )?;
                        report.penalties_applied += 1;
                    }
                }
            }

            tx.commit()?;
        }

        Ok(report)
    }
}

struct SweepCandidate {
    id: Uuid,
    item_raw: String,
    borrower_id: String,
    deadline_raw: String,
}

fn load_sweep_candidates(conn: &Connection) -> Result<Vec<SweepCandidate>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, item_id, borrower_id, return_deadline
         FROM rentals
         WHERE status IN {OPEN_STATUSES}
         ORDER BY return_deadline ASC"
    ))?;
    let rows = stmt.query_map([], |row| {
        let id_str: String = row.get(0)?;
        Ok(SweepCandidate {
            id: parse_uuid(0, &id_str)?,
            item_raw: row.get(1)?,
            borrower_id: row.get(2)?,
            deadline_raw: row.get(3)?,
        })
    })?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::Sqlite)
}

pub(crate) fn get_rental_in(conn: &Connection, id: Uuid) -> Result<Rental> {
    conn.query_row(
        &format!("SELECT {RENTAL_COLUMNS} FROM rentals WHERE id = ?1"),
        params![id.to_string()],
        row_to_rental,
    )
    .map_err(not_found)
}

fn row_to_rental(row: &rusqlite::Row<'_>) -> rusqlite::Result<Rental> {
    let id_str: String = row.get(0)?;
    let item_str: String = row.get(1)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let deadline_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let returned_str: Option<String> = row.get(12)?;
    let created_str: String = row.get(13)?;

    Ok(Rental {
        id: parse_uuid(0, &id_str)?,
        item_id: parse_uuid(1, &item_str)?,
        borrower_id: row.get(2)?,
        lender_id: row.get(3)?,
        start_date: parse_date(4, &start_str)?,
        end_date: parse_date(5, &end_str)?,
        return_deadline: parse_timestamp(6, &deadline_str)?,
        status: parse_enum(7, &status_str)?,
        borrower_marked_return: row.get(8)?,
        return_confirmed: row.get(9)?,
        reminder_sent: row.get(10)?,
        penalty_applied: row.get(11)?,
        return_date: parse_opt_timestamp(12, returned_str)?,
        created_at: parse_timestamp(13, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileUpsert;
    use chrono::{NaiveDate, TimeZone};

    fn db_with_borrower() -> Database {
        let db = Database::open_in_memory().unwrap();
        for uid in ["borrower", "lender"] {
            db.upsert_profile(
                &ProfileUpsert {
                    uid: uid.into(),
                    email: Some(format!("{uid}@iitrpr.ac.in")),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        }
        db
    }

    fn new_rental(deadline: DateTime<Utc>) -> NewRental {
        NewRental {
            item_id: Uuid::new_v4(),
            borrower_id: "borrower".into(),
            lender_id: "lender".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            return_deadline: deadline,
        }
    }

    fn score(db: &Database) -> i64 {
        db.get_user("borrower").unwrap().trust_score
    }

    #[test]
    fn on_time_return_awards_trust() {
        let db = db_with_borrower();
        let deadline = Utc.with_ymd_and_hms(2024, 1, 8, 18, 29, 59).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let rental = db.create_rental(&new_rental(deadline), created).unwrap();
        assert_eq!(db.get_user("borrower").unwrap().borrowed_items, 1);

        let returned_at = created + Duration::hours(1);
        db.mark_returned(rental.id, returned_at).unwrap();
        let outcome = db.confirm_return(rental.id, returned_at).unwrap();

        assert!(outcome.on_time);
        assert_eq!(outcome.trust_delta, 5);
        assert_eq!(outcome.rental.status, RentalStatus::Returned);
        assert!(outcome.rental.return_confirmed);
        assert_eq!(score(&db), 10);
    }

    #[test]
    fn late_return_leaves_score_unchanged() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now - Duration::days(1)), now).unwrap();

        db.mark_returned(rental.id, now).unwrap();
        let outcome = db.confirm_return(rental.id, now).unwrap();

        assert!(!outcome.on_time);
        assert_eq!(outcome.trust_delta, 0);
        assert_eq!(score(&db), 5);
    }

    #[test]
    fn confirm_before_mark_fails_without_writes() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now + Duration::days(3)), now).unwrap();

        let err = db.confirm_return(rental.id, now).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed(_)));
        assert_eq!(db.get_rental(rental.id).unwrap(), rental);
        assert_eq!(score(&db), 5);
        assert!(db.trust_history("borrower").unwrap().is_empty());
    }

    #[test]
    fn second_confirm_is_rejected() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now + Duration::days(3)), now).unwrap();
        db.mark_returned(rental.id, now).unwrap();
        db.confirm_return(rental.id, now).unwrap();

        assert!(matches!(
            db.confirm_return(rental.id, now),
            Err(StoreError::PreconditionFailed(_))
        ));
        assert!(matches!(
            db.mark_returned(rental.id, now),
            Err(StoreError::PreconditionFailed(_))
        ));
        assert_eq!(score(&db), 10);
    }

    #[test]
    fn unknown_rental_is_not_found() {
        let db = db_with_borrower();
        assert!(matches!(
            db.mark_returned(Uuid::new_v4(), Utc::now()),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            db.confirm_return(Uuid::new_v4(), Utc::now()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn sweep_reminds_once_inside_window() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now + Duration::hours(2)), now).unwrap();

        let first = db.sweep_rentals(now, Duration::hours(24)).unwrap();
        assert_eq!(first.reminders_queued, 1);
        assert!(db.get_rental(rental.id).unwrap().reminder_sent);

        let second = db.sweep_rentals(now + Duration::minutes(30), Duration::hours(24)).unwrap();
        assert_eq!(second.reminders_queued, 0);
        assert_eq!(db.pending_outbox(10, 5).unwrap().len(), 1);
    }

    #[test]
    fn sweep_ignores_far_deadlines() {
        let db = db_with_borrower();
        let now = Utc::now();
        db.create_rental(&new_rental(now + Duration::days(3)), now).unwrap();

        let report = db.sweep_rentals(now, Duration::hours(24)).unwrap();
        assert_eq!(report, SweepReport { scanned: 1, ..Default::default() });
    }

    #[test]
    fn overdue_penalty_applies_once() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now - Duration::hours(1)), now).unwrap();

        let report = db.sweep_rentals(now, Duration::hours(24)).unwrap();
        assert_eq!(report.marked_overdue, 1);
        assert_eq!(report.penalties_applied, 1);
        assert_eq!(score(&db), 0);

        let stored = db.get_rental(rental.id).unwrap();
        assert_eq!(stored.status, RentalStatus::Overdue);
        assert!(stored.penalty_applied);

        // Overdue rentals are no longer open, so the next day's run skips them.
        let next_day = db.sweep_rentals(now + Duration::days(1), Duration::hours(24)).unwrap();
        assert_eq!(next_day.scanned, 0);
        assert_eq!(score(&db), 0);
    }

    #[test]
    fn deadline_reached_exactly_counts_as_overdue() {
        let db = db_with_borrower();
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 18, 29, 59).unwrap();
        let rental = db.create_rental(&new_rental(now), now - Duration::days(7)).unwrap();

        let report = db.sweep_rentals(now, Duration::hours(24)).unwrap();
        assert_eq!(report.reminders_queued, 0);
        assert_eq!(report.marked_overdue, 1);
        assert_eq!(report.penalties_applied, 1);
        assert_eq!(db.get_rental(rental.id).unwrap().status, RentalStatus::Overdue);
        assert_eq!(score(&db), 0);
    }

    #[test]
    fn overdue_rental_can_still_be_confirmed() {
        let db = db_with_borrower();
        let now = Utc::now();
        let rental = db.create_rental(&new_rental(now - Duration::hours(1)), now).unwrap();
        db.sweep_rentals(now, Duration::hours(24)).unwrap();

        db.mark_returned(rental.id, now).unwrap();
        let outcome = db.confirm_return(rental.id, now).unwrap();
        assert_eq!(outcome.rental.status, RentalStatus::Returned);
        assert!(!outcome.on_time);
        assert_eq!(score(&db), 0);
    }

    #[test]
    fn legacy_ongoing_rows_are_swept_and_bad_deadlines_skipped() {
        let db = db_with_borrower();
        let now = Utc::now();
        let good = db.create_rental(&new_rental(now - Duration::hours(1)), now).unwrap();
        let bad = db.create_rental(&new_rental(now - Duration::hours(1)), now).unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute(
                "UPDATE rentals SET status = 'ongoing' WHERE id = ?1",
                params![good.id.to_string()],
            )
            .unwrap();
            conn.execute(
                "UPDATE rentals SET return_deadline = 'next friday' WHERE id = ?1",
                params![bad.id.to_string()],
            )
            .unwrap();
        }

        let report = db.sweep_rentals(now, Duration::hours(24)).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.marked_overdue, 1);
        assert_eq!(db.get_rental(good.id).unwrap().status, RentalStatus::Overdue);
    }

    #[test]
    fn list_by_role() {
        let db = db_with_borrower();
        let now = Utc::now();
        db.create_rental(&new_rental(now + Duration::days(1)), now).unwrap();

        assert_eq!(db.list_rentals("borrower", Some(RentalRole::Borrower)).unwrap().len(), 1);
        assert!(db.list_rentals("borrower", Some(RentalRole::Lender)).unwrap().is_empty());
        assert_eq!(db.list_rentals("lender", None).unwrap().len(), 1);
    }
}
