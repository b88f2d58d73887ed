use chrono::{DateTime, Local};

pub const RUPEE: &str = "₹";

/// `1234567.891` → `1,234,567.89`.
pub fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0');
    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

pub fn format_money(symbol: &str, value: f64) -> String {
    format!("{}{}", symbol, group_thousands(value))
}

pub fn format_inr(value: f64) -> String {
    format_money(RUPEE, value)
}

/// Human-readable timestamp printed on every exported document.
pub fn generated_on(now: DateTime<Local>) -> String {
    now.format("%d/%m/%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0.0), "0.00");
        assert_eq!(group_thousands(999.999), "1,000.00");
        assert_eq!(group_thousands(470_000.0), "470,000.00");
        assert_eq!(group_thousands(1_234_567.891), "1,234,567.89");
        assert_eq!(group_thousands(-2_500.5), "-2,500.50");
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(50_254.79), "₹50,254.79");
    }

    #[test]
    fn test_generated_on() {
        let now = Local.with_ymd_and_hms(2024, 2, 10, 9, 5, 0).unwrap();
        assert_eq!(generated_on(now), "10/02/2024 09:05:00");
    }
}
