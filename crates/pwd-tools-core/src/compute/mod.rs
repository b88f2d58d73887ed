//! Closed-form calculators used by the bill, refund and duty tools.
//!
//! Everything here is pure: no I/O, no shared state.

pub mod bill;
pub mod deductions;
pub mod delay;
pub mod interest;
pub mod stamp_duty;

/// Round half away from zero to two decimals (paise).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(254.794520), 254.79);
        assert_eq!(round2(0.005), 0.01);
        assert_eq!(round2(-1.239), -1.24);
    }
}
