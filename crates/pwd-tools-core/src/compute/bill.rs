use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::deductions::{DeductionBreakdown, DeductionSpec};
use crate::storage::models::{BillRecord, DeductionRecord, Stored};

/// A measured line of work on a bill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillItem {
    pub description: String,
    pub unit: String,
    pub quantity: f64,
    pub rate: f64,
}

impl BillItem {
    pub fn total(&self) -> f64 {
        self.quantity * self.rate
    }
}

/// Everything collected for one bill before it is stored or rendered.
/// Optional header fields print as `N/A`; a missing `bill_amount` is taken
/// from the item totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillDraft {
    pub bill_number: String,
    pub bill_date: Option<NaiveDate>,
    pub contractor_name: Option<String>,
    pub project_name: Option<String>,
    pub work_order_no: Option<String>,
    pub agreement_amount: Option<f64>,
    pub work_description: Option<String>,
    pub bill_amount: Option<f64>,
    pub status: Option<String>,
    pub items: Vec<BillItem>,
    pub deductions: Vec<DeductionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillSummary {
    pub gross_amount: f64,
    pub deductions: DeductionBreakdown,
}

impl BillSummary {
    pub fn total_deductions(&self) -> f64 {
        self.deductions.total
    }

    pub fn net_payable(&self) -> f64 {
        self.deductions.net
    }
}

impl BillDraft {
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(BillItem::total).sum()
    }

    pub fn gross_amount(&self) -> f64 {
        self.bill_amount.unwrap_or_else(|| self.items_total())
    }

    pub fn summary(&self) -> BillSummary {
        let gross_amount = self.gross_amount();
        BillSummary {
            gross_amount,
            deductions: DeductionBreakdown::compute(gross_amount, &self.deductions),
        }
    }

    pub fn to_record(&self) -> BillRecord {
        let mut record = BillRecord::new(&self.bill_number);
        record.bill_date = self.bill_date;
        record.contractor_name = self.contractor_name.clone();
        record.project_name = self.project_name.clone();
        record.bill_amount = Some(self.gross_amount());
        if let Some(status) = &self.status {
            record.status = status.clone();
        }
        record
    }

    /// Rebuild a draft from a stored bill. Stored deductions become fixed
    /// amounts carrying their original rate.
    pub fn from_stored(bill: &Stored<BillRecord>, deductions: &[Stored<DeductionRecord>]) -> Self {
        Self {
            bill_number: bill.record.bill_number.clone(),
            bill_date: bill.record.bill_date,
            contractor_name: bill.record.contractor_name.clone(),
            project_name: bill.record.project_name.clone(),
            bill_amount: bill.record.bill_amount,
            status: Some(bill.record.status.clone()),
            deductions: deductions
                .iter()
                .map(|d| DeductionSpec {
                    deduction_type: d.record.deduction_type.clone(),
                    rate: d.record.rate,
                    fixed_amount: Some(d.record.amount),
                    statutory: d.record.is_statutory,
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BillDraft {
        BillDraft {
            bill_number: "B001/2024".to_string(),
            items: vec![
                BillItem {
                    description: "Earthwork".to_string(),
                    unit: "cum".to_string(),
                    quantity: 100.0,
                    rate: 250.0,
                },
                BillItem {
                    description: "PCC".to_string(),
                    unit: "cum".to_string(),
                    quantity: 10.0,
                    rate: 5_000.0,
                },
            ],
            deductions: vec![DeductionSpec::percent("Security Deposit", 10.0, false)],
            ..Default::default()
        }
    }

    #[test]
    fn test_gross_from_items() {
        let draft = sample();
        assert_eq!(draft.items_total(), 75_000.0);
        let summary = draft.summary();
        assert_eq!(summary.gross_amount, 75_000.0);
        assert_eq!(summary.total_deductions(), 7_500.0);
        assert_eq!(summary.net_payable(), 67_500.0);
    }

    #[test]
    fn test_explicit_amount_overrides_items() {
        let mut draft = sample();
        draft.bill_amount = Some(80_000.0);
        assert_eq!(draft.summary().gross_amount, 80_000.0);
        assert_eq!(draft.to_record().bill_amount, Some(80_000.0));
        assert_eq!(draft.to_record().status, "Active");
    }
}
