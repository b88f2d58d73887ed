use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One tier of a stamp-duty table. Amounts below `upper_bound` (exclusive)
/// pay `rate` percent; `None` marks the open-ended top tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    #[serde(default)]
    pub upper_bound: Option<f64>,
    pub rate: f64,
}

impl Bracket {
    pub const fn new(upper_bound: f64, rate: f64) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    pub const fn open(rate: f64) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }

    fn contains(&self, amount: f64) -> bool {
        self.upper_bound.map_or(true, |bound| amount < bound)
    }
}

const DEFAULT_BRACKETS: [Bracket; 4] = [
    Bracket::new(100_000.0, 0.10),
    Bracket::new(1_000_000.0, 0.25),
    Bracket::new(10_000_000.0, 0.40),
    Bracket::open(0.50),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StampDuty {
    pub amount: f64,
    pub rate: f64,
    pub duty: f64,
}

/// Ordered bracket table. Bounds strictly increase, rates never decrease
/// and the last bracket is open-ended, so duty is monotone in the amount.
#[derive(Debug, Clone, PartialEq)]
pub struct StampDutyTable {
    brackets: Vec<Bracket>,
}

impl Default for StampDutyTable {
    fn default() -> Self {
        Self {
            brackets: DEFAULT_BRACKETS.to_vec(),
        }
    }
}

impl StampDutyTable {
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, Error> {
        let Some(last) = brackets.last() else {
            return Err(Error::Validation("stamp duty table is empty".to_string()));
        };
        if last.upper_bound.is_some() {
            return Err(Error::Validation(
                "last stamp duty bracket must have no upper bound".to_string(),
            ));
        }
        let bounded = &brackets[..brackets.len() - 1];
        if bounded.iter().any(|b| b.upper_bound.is_none()) {
            return Err(Error::Validation(
                "only the last stamp duty bracket may be open-ended".to_string(),
            ));
        }
        if brackets.iter().any(|b| !b.rate.is_finite() || b.rate < 0.0) {
            return Err(Error::Validation(
                "stamp duty rates must be non-negative".to_string(),
            ));
        }
        for pair in brackets.windows(2) {
            if let (Some(a), Some(b)) = (pair[0].upper_bound, pair[1].upper_bound) {
                if b <= a {
                    return Err(Error::Validation(format!(
                        "stamp duty bounds must increase ({} then {})",
                        a, b
                    )));
                }
            }
            if pair[1].rate < pair[0].rate {
                return Err(Error::Validation(format!(
                    "stamp duty rates must not decrease ({}% then {}%)",
                    pair[0].rate, pair[1].rate
                )));
            }
        }
        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// The first bracket whose upper bound exceeds `amount`. An amount equal
    /// to a bound falls in the next bracket up.
    pub fn bracket_for(&self, amount: f64) -> Result<&Bracket, Error> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(Error::Validation(format!(
                "stamp duty amount must be a non-negative number, got {}",
                amount
            )));
        }
        self.brackets
            .iter()
            .find(|b| b.contains(amount))
            .ok_or_else(|| Error::Validation("stamp duty table has no open bracket".to_string()))
    }

    pub fn duty(&self, amount: f64) -> Result<StampDuty, Error> {
        let bracket = self.bracket_for(amount)?;
        Ok(StampDuty {
            amount,
            rate: bracket.rate,
            duty: amount * bracket.rate / 100.0,
        })
    }
}
