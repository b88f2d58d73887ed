use chrono::NaiveDate;
use serde::Serialize;

/// Whole calendar days from `from` to `to`; negative when `to` is earlier.
pub fn elapsed_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DelayReport {
    pub scheduled_completion: NaiveDate,
    pub actual_completion: NaiveDate,
    /// Signed difference, actual minus scheduled.
    pub variance_days: i64,
    /// Days late; early completion counts as zero.
    pub delay_days: i64,
}

impl DelayReport {
    pub fn new(scheduled_completion: NaiveDate, actual_completion: NaiveDate) -> Self {
        let variance_days = elapsed_days(scheduled_completion, actual_completion);
        Self {
            scheduled_completion,
            actual_completion,
            variance_days,
            delay_days: variance_days.max(0),
        }
    }

    pub fn is_delayed(&self) -> bool {
        self.delay_days > 0
    }
}

/// Share of the contract period elapsed at `as_of`, in percent, clamped to
/// 0..=100. A zero-length period counts as complete once started.
pub fn time_progress(start: NaiveDate, completion: NaiveDate, as_of: NaiveDate) -> f64 {
    let total = elapsed_days(start, completion);
    let done = elapsed_days(start, as_of);
    if total <= 0 {
        return if done >= 0 { 100.0 } else { 0.0 };
    }
    (done as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_elapsed_days_crosses_leap_day() {
        assert_eq!(elapsed_days(date("2024-02-28"), date("2024-03-01")), 2);
        assert_eq!(elapsed_days(date("2024-03-01"), date("2024-02-28")), -2);
    }

    #[test]
    fn test_delay_report() {
        let late = DelayReport::new(date("2024-12-31"), date("2025-01-30"));
        assert_eq!(late.delay_days, 30);
        assert!(late.is_delayed());

        let early = DelayReport::new(date("2024-12-31"), date("2024-12-01"));
        assert_eq!(early.variance_days, -30);
        assert_eq!(early.delay_days, 0);
        assert!(!early.is_delayed());
    }

    #[test]
    fn test_time_progress() {
        let start = date("2024-01-01");
        let end = date("2024-01-11");
        assert_eq!(time_progress(start, end, date("2024-01-06")), 50.0);
        assert_eq!(time_progress(start, end, date("2023-12-01")), 0.0);
        assert_eq!(time_progress(start, end, date("2025-01-01")), 100.0);
    }
}
