use axum::{extract::State, Json};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use campus_shared::constants::DATE_FORMAT;
use campus_store::{NewRental, Rental, RentalRole, SweepReport};

use crate::api::AppState;
use crate::error::{ApiError, StoreResultExt};
use crate::extract::{require, Validate, ValidJson, ValidQuery};
use crate::sweep::{local_to_utc, run_sweep};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRentalRequest {
    pub item_id: Uuid,
    pub borrower_id: String,
    pub lender_id: String,
    pub start_date: String,
    pub end_date: String,
    /// Overrides the end-of-day default.
    #[serde(default)]
    pub return_deadline: Option<DateTime<Utc>>,
}

impl CreateRentalRequest {
    fn dates(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
        let parse = |field: &str, raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
                ApiError::Validation(format!("{field} must be a YYYY-MM-DD date, got {raw:?}"))
            })
        };
        let start = parse("startDate", &self.start_date)?;
        let end = parse("endDate", &self.end_date)?;
        if end < start {
            return Err(ApiError::Validation("endDate is before startDate".into()));
        }
        Ok((start, end))
    }
}

impl Validate for CreateRentalRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require("borrowerId", &self.borrower_id)?;
        require("lenderId", &self.lender_id)?;
        if self.borrower_id == self.lender_id {
            return Err(ApiError::Validation("borrower and lender must differ".into()));
        }
        self.dates().map(|_| ())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalResponse {
    pub rental_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RentalIdRequest {
    pub rental_id: Uuid,
}

impl Validate for RentalIdRequest {
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListRentalsQuery {
    pub uid: String,
    #[serde(default)]
    pub role: Option<RentalRole>,
}

impl Validate for ListRentalsQuery {
    fn validate(&self) -> Result<(), ApiError> {
        require("uid", &self.uid)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    pub message: String,
    pub rental: Rental,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub message: String,
    pub on_time: bool,
    pub trust_delta: i64,
    pub rental: Rental,
}

/// 23:59:59 campus time on the last rental day.
pub fn default_deadline(end_date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    local_to_utc(end_date.and_time(last_second), offset)
}

pub async fn create_rental(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CreateRentalRequest>,
) -> Result<Json<CreateRentalResponse>, ApiError> {
    let (start_date, end_date) = req.dates()?;
    let return_deadline = req
        .return_deadline
        .unwrap_or_else(|| default_deadline(end_date, state.config.campus_offset));

    let rental = state.db.create_rental(
        &NewRental {
            item_id: req.item_id,
            borrower_id: req.borrower_id,
            lender_id: req.lender_id,
            start_date,
            end_date,
            return_deadline,
        },
        state.clock.now(),
    )?;

    Ok(Json(CreateRentalResponse { rental_id: rental.id }))
}

pub async fn get_rental(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<RentalIdRequest>,
) -> Result<Json<Rental>, ApiError> {
    Ok(Json(state.db.get_rental(query.rental_id).or_not_found("Rental")?))
}

pub async fn list_rentals(
    State(state): State<AppState>,
    ValidQuery(query): ValidQuery<ListRentalsQuery>,
) -> Result<Json<Vec<Rental>>, ApiError> {
    Ok(Json(state.db.list_rentals(&query.uid, query.role)?))
}

pub async fn mark_returned(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RentalIdRequest>,
) -> Result<Json<ReturnResponse>, ApiError> {
    let rental = state
        .db
        .mark_returned(req.rental_id, state.clock.now())
        .or_not_found("Rental")?;
    Ok(Json(ReturnResponse {
        message: "Item marked as returned".to_string(),
        rental,
    }))
}

pub async fn confirm_return(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RentalIdRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let outcome = state
        .db
        .confirm_return(req.rental_id, state.clock.now())
        .or_not_found("Rental")?;
    state.dispatcher.wake();

    let message = if outcome.on_time {
        "Return confirmed, trust score updated"
    } else {
        "Return confirmed"
    };
    Ok(Json(ConfirmResponse {
        message: message.to_string(),
        on_time: outcome.on_time,
        trust_delta: outcome.trust_delta,
        rental: outcome.rental,
    }))
}

/// Run the reminder/overdue sweep now and report what it did.
pub async fn trigger_rental_reminders(
    State(state): State<AppState>,
) -> Result<Json<SweepReport>, ApiError> {
    Ok(Json(run_sweep(&state).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(start: &str, end: &str, borrower: &str) -> CreateRentalRequest {
        CreateRentalRequest {
            item_id: Uuid::new_v4(),
            borrower_id: borrower.into(),
            lender_id: "lender".into(),
            start_date: start.into(),
            end_date: end.into(),
            return_deadline: None,
        }
    }

    #[test]
    fn default_deadline_is_end_of_campus_day() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(
            default_deadline(end, ist),
            Utc.with_ymd_and_hms(2024, 1, 8, 18, 29, 59).unwrap()
        );
    }

    #[test]
    fn rental_request_validation() {
        assert!(request("2024-01-01", "2024-01-08", "amir").validate().is_ok());
        assert!(request("2024-01-08", "2024-01-08", "amir").validate().is_ok());
        assert!(request("2024-01-08", "2024-01-01", "amir").validate().is_err());
        assert!(request("01/01/2024", "2024-01-08", "amir").validate().is_err());
        assert!(request("2024-01-01", "2024-01-08", "lender").validate().is_err());
        assert!(request("2024-01-01", "2024-01-08", " ").validate().is_err());
    }
}
