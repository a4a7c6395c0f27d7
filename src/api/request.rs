//! Request types for the reconciler API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PayPeriod;

/// Body of `POST /reconcile` and `POST /compare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearRequest {
    /// The year to reconcile.
    pub year: i32,
    /// Run as if today were this date. Defaults to the server's local date.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Body of `POST /ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// First day of the range (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the range (inclusive).
    pub end_date: NaiveDate,
}

impl IngestRequest {
    /// The requested range, or a message explaining why it is invalid.
    pub fn period(&self) -> Result<PayPeriod, String> {
        if self.start_date > self.end_date {
            return Err(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            ));
        }
        Ok(PayPeriod::new(self.start_date, self.end_date))
    }
}
