use serde::{Deserialize, Serialize};

/// One deduction to apply to a bill: either a fixed amount or a percentage
/// of the bill amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionSpec {
    #[serde(alias = "type")]
    pub deduction_type: String,
    /// Percent of the base. Informational when `fixed_amount` is set.
    #[serde(default)]
    pub rate: f64,
    #[serde(default, alias = "amount")]
    pub fixed_amount: Option<f64>,
    #[serde(default)]
    pub statutory: bool,
}

impl DeductionSpec {
    pub fn percent(deduction_type: &str, rate: f64, statutory: bool) -> Self {
        Self {
            deduction_type: deduction_type.to_string(),
            rate,
            fixed_amount: None,
            statutory,
        }
    }

    pub fn fixed(deduction_type: &str, amount: f64, statutory: bool) -> Self {
        Self {
            deduction_type: deduction_type.to_string(),
            rate: 0.0,
            fixed_amount: Some(amount),
            statutory,
        }
    }

    pub fn amount_on(&self, base: f64) -> f64 {
        self.fixed_amount.unwrap_or(base * self.rate / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionLine {
    pub deduction_type: String,
    pub rate: f64,
    pub amount: f64,
    pub statutory: bool,
}

impl DeductionLine {
    /// Label for the rate column: the percentage, or `Fixed`.
    pub fn rate_label(&self) -> String {
        if self.rate > 0.0 {
            format!("{:.2}%", self.rate)
        } else {
            "Fixed".to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionBreakdown {
    pub base: f64,
    pub lines: Vec<DeductionLine>,
    pub total: f64,
    pub net: f64,
}

impl DeductionBreakdown {
    pub fn compute(base: f64, specs: &[DeductionSpec]) -> Self {
        let lines: Vec<DeductionLine> = specs
            .iter()
            .map(|spec| DeductionLine {
                deduction_type: spec.deduction_type.clone(),
                rate: spec.rate,
                amount: spec.amount_on(base),
                statutory: spec.statutory,
            })
            .collect();
        let total = lines.iter().map(|l| l.amount).sum();
        Self {
            base,
            lines,
            total,
            net: base - total,
        }
    }

    pub fn statutory_total(&self) -> f64 {
        self.lines
            .iter()
            .filter(|l| l.statutory)
            .map(|l| l.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_and_percent() {
        let specs = vec![
            DeductionSpec::fixed("Income Tax", 5_000.0, true),
            DeductionSpec::percent("Security Deposit", 5.0, false),
        ];
        let breakdown = DeductionBreakdown::compute(500_000.0, &specs);
        assert_eq!(breakdown.lines[1].amount, 25_000.0);
        assert_eq!(breakdown.total, 30_000.0);
        assert_eq!(breakdown.net, 470_000.0);
        assert_eq!(breakdown.statutory_total(), 5_000.0);
    }

    #[test]
    fn test_empty_list() {
        let breakdown = DeductionBreakdown::compute(1_234.5, &[]);
        assert_eq!(breakdown.total, 0.0);
        assert_eq!(breakdown.net, 1_234.5);
    }

    #[test]
    fn test_fixed_amount_wins_over_rate() {
        let mut spec = DeductionSpec::percent("Royalty", 2.0, false);
        spec.fixed_amount = Some(10.0);
        assert_eq!(spec.amount_on(1_000.0), 10.0);
    }

    #[test]
    fn test_rate_label() {
        let breakdown = DeductionBreakdown::compute(
            100.0,
            &[
                DeductionSpec::percent("GST TDS", 2.0, true),
                DeductionSpec::fixed("Cess", 1.0, false),
            ],
        );
        assert_eq!(breakdown.lines[0].rate_label(), "2.00%");
        assert_eq!(breakdown.lines[1].rate_label(), "Fixed");
    }

    #[test]
    fn test_deserialize_original_shape() {
        let spec: DeductionSpec =
            serde_json::from_str(r#"{"type": "Income Tax", "amount": 5000, "rate": 1.0, "statutory": true}"#)
                .unwrap();
        assert_eq!(spec.fixed_amount, Some(5_000.0));
        assert_eq!(spec.amount_on(500_000.0), 5_000.0);
    }
}
