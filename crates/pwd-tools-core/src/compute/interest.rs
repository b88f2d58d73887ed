use chrono::NaiveDate;
use serde::Serialize;

use super::delay::elapsed_days;
use super::round2;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Simple interest earned on a deposit and the amount refunded with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DepositInterest {
    pub principal: f64,
    pub annual_rate: f64,
    /// Days the deposit was held, never negative.
    pub days_held: i64,
    pub interest: f64,
    pub refund: f64,
}

impl DepositInterest {
    /// Interest on `principal` at `annual_rate` percent for `days`. A
    /// negative day count earns nothing.
    pub fn for_days(principal: f64, annual_rate: f64, days: i64) -> Self {
        let days_held = days.max(0);
        let interest = principal * annual_rate / 100.0 * days_held as f64 / DAYS_PER_YEAR;
        Self {
            principal,
            annual_rate,
            days_held,
            interest,
            refund: principal + interest,
        }
    }

    pub fn between(
        principal: f64,
        annual_rate: f64,
        deposit_date: NaiveDate,
        refund_date: NaiveDate,
    ) -> Self {
        Self::for_days(principal, annual_rate, elapsed_days(deposit_date, refund_date))
    }

    /// Same values rounded to paise, as printed on certificates.
    pub fn rounded(&self) -> Self {
        Self {
            interest: round2(self.interest),
            refund: round2(self.refund),
            ..*self
        }
    }
}
