use chrono::NaiveDate;
use serde::Serialize;

use crate::compute::delay::time_progress;
use crate::compute::interest::DepositInterest;
use crate::compute::round2;
use crate::error::Error;
use crate::storage::models::{
    BillRecord, DeductionRecord, EmdRefundRecord, ProjectRecord, Record, Stored,
};
use crate::storage::Database;

/// Deduction type whose amounts are held and later refunded.
pub const SECURITY_DEPOSIT: &str = "Security Deposit";

/// Data printed on an EMD refund certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmdCertificate {
    pub tender_number: String,
    pub contractor_name: Option<String>,
    pub deposit_date: Option<NaiveDate>,
    pub refund_date: Option<NaiveDate>,
    pub calculation: DepositInterest,
}

impl EmdCertificate {
    /// Recompute interest from a stored refund. Requires amount, rate and
    /// both dates.
    pub fn from_record(record: &EmdRefundRecord) -> Result<Self, Error> {
        let missing = |field: &str| {
            Error::Validation(format!(
                "EMD refund {} has no {}",
                record.tender_number, field
            ))
        };
        let amount = record.emd_amount.ok_or_else(|| missing("emd_amount"))?;
        let rate = record.interest_rate.ok_or_else(|| missing("interest_rate"))?;
        let deposit = record.deposit_date.ok_or_else(|| missing("deposit_date"))?;
        let refund = record.refund_date.ok_or_else(|| missing("refund_date"))?;
        Ok(Self {
            tender_number: record.tender_number.clone(),
            contractor_name: record.contractor_name.clone(),
            deposit_date: Some(deposit),
            refund_date: Some(refund),
            calculation: DepositInterest::between(amount, rate, deposit, refund).rounded(),
        })
    }
}

/// Security deposit withheld from one bill and released to the contractor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityRefund {
    pub bill_id: i64,
    pub bill: BillRecord,
    pub deposits: Vec<DeductionRecord>,
    pub recoveries: f64,
    pub refund_date: NaiveDate,
}

impl SecurityRefund {
    /// Collect the `Security Deposit` deductions held against a bill. Fails
    /// when the bill holds none.
    pub fn from_bill(
        bill: &Stored<BillRecord>,
        deductions: &[Stored<DeductionRecord>],
        refund_date: NaiveDate,
    ) -> Result<Self, Error> {
        let deposits: Vec<DeductionRecord> = deductions
            .iter()
            .filter(|d| {
                d.record
                    .deduction_type
                    .trim()
                    .eq_ignore_ascii_case(SECURITY_DEPOSIT)
            })
            .map(|d| d.record.clone())
            .collect();
        if deposits.is_empty() {
            return Err(Error::Validation(format!(
                "bill {} holds no security deposit",
                bill.record.bill_number
            )));
        }
        Ok(Self {
            bill_id: bill.id,
            bill: bill.record.clone(),
            deposits,
            recoveries: 0.0,
            refund_date,
        })
    }

    /// Amounts recovered from the deposit before release, such as penalties.
    pub fn with_recoveries(mut self, recoveries: f64) -> Result<Self, Error> {
        if !recoveries.is_finite() || recoveries < 0.0 {
            return Err(Error::Validation(format!(
                "recoveries must be a non-negative amount, got {}",
                recoveries
            )));
        }
        if recoveries > self.total_held() {
            return Err(Error::Validation(format!(
                "recoveries of {:.2} exceed the {:.2} held",
                recoveries,
                self.total_held()
            )));
        }
        self.recoveries = recoveries;
        Ok(self)
    }

    pub fn total_held(&self) -> f64 {
        round2(self.deposits.iter().map(|d| d.amount).sum())
    }

    pub fn refund_amount(&self) -> f64 {
        round2(self.total_held() - self.recoveries)
    }
}

impl Database {
    /// Load a bill with its deductions and total the security deposit held.
    pub fn security_refund(
        &self,
        bill_id: i64,
        refund_date: NaiveDate,
    ) -> Result<SecurityRefund, Error> {
        let (bill, deductions) = self.bill_with_deductions(bill_id)?;
        SecurityRefund::from_bill(&bill, &deductions, refund_date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub physical: f64,
    pub financial: f64,
    pub time: f64,
}

/// Financial position of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectReport {
    pub project: ProjectRecord,
    pub work_done_amount: f64,
    pub payments_made: f64,
    pub progress: Option<ProgressSummary>,
}

impl ProjectReport {
    pub fn new(project: ProjectRecord, work_done_amount: f64, payments_made: f64) -> Self {
        Self {
            project,
            work_done_amount,
            payments_made,
            progress: None,
        }
    }

    /// Attach progress percentages. Financial progress is work done against
    /// the agreement amount; time progress is measured at `as_of`.
    pub fn with_progress(mut self, physical: f64, as_of: NaiveDate) -> Self {
        let financial = match self.project.agreement_amount {
            Some(agreement) if agreement > 0.0 => self.work_done_amount / agreement * 100.0,
            _ => 0.0,
        };
        let time = match (self.project.start_date, self.project.completion_date) {
            (Some(start), Some(end)) => time_progress(start, end, as_of),
            _ => 0.0,
        };
        self.progress = Some(ProgressSummary {
            physical,
            financial,
            time,
        });
        self
    }

    pub fn outstanding_amount(&self) -> f64 {
        self.work_done_amount - self.payments_made
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A header row plus data rows, ready for a tabular report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl TableData {
    /// One row per stored record, columns in table order.
    pub fn from_records<R: Record + Serialize>(records: &[Stored<R>]) -> Result<Self, Error> {
        let mut headers = vec!["id".to_string()];
        headers.extend(R::KIND.columns().iter().map(|c| c.name.to_string()));
        headers.push("created_at".to_string());

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let value = serde_json::to_value(record)
                .map_err(|e| Error::Validation(format!("cannot tabulate record: {}", e)))?;
            let row = headers
                .iter()
                .map(|h| match value.get(h) {
                    Some(serde_json::Value::Number(n)) => {
                        n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty)
                    }
                    Some(serde_json::Value::String(s)) => Cell::Text(s.clone()),
                    Some(serde_json::Value::Bool(b)) => Cell::Text(b.to_string()),
                    _ => Cell::Empty,
                })
                .collect();
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_certificate_from_record() {
        let mut record = EmdRefundRecord::new("T001/2024");
        record.emd_amount = Some(50_000.0);
        record.interest_rate = Some(6.0);
        record.deposit_date = Some(date("2024-01-10"));
        record.refund_date = Some(date("2024-02-10"));
        let cert = EmdCertificate::from_record(&record).unwrap();
        assert_eq!(cert.calculation.days_held, 31);
        assert_eq!(cert.calculation.refund, 50_254.79);
    }

    #[test]
    fn test_certificate_requires_dates() {
        let mut record = EmdRefundRecord::new("T002/2024");
        record.emd_amount = Some(1_000.0);
        record.interest_rate = Some(6.0);
        let err = EmdCertificate::from_record(&record).unwrap_err();
        assert!(err.to_string().contains("deposit_date"));
    }

    fn stored<T>(id: i64, record: T) -> Stored<T> {
        Stored {
            id,
            created_at: "2024-06-01 10:00:00".to_string(),
            record,
        }
    }

    fn deduction(deduction_type: &str, amount: f64) -> Stored<DeductionRecord> {
        stored(
            0,
            DeductionRecord {
                bill_id: 7,
                deduction_type: deduction_type.to_string(),
                amount,
                rate: 0.0,
                is_statutory: false,
            },
        )
    }

    #[test]
    fn test_security_refund_sums_only_security_deposits() {
        let bill = stored(7, BillRecord::new("B007/2024"));
        let deductions = [
            deduction("Income Tax", 5_000.0),
            deduction("Security Deposit", 20_000.0),
            deduction(" security deposit", 5_000.5),
        ];
        let refund = SecurityRefund::from_bill(&bill, &deductions, date("2024-06-30")).unwrap();
        assert_eq!(refund.bill_id, 7);
        assert_eq!(refund.deposits.len(), 2);
        assert_eq!(refund.total_held(), 25_000.5);
        assert_eq!(refund.refund_amount(), 25_000.5);

        let refund = refund.with_recoveries(1_000.0).unwrap();
        assert_eq!(refund.refund_amount(), 24_000.5);
    }

    #[test]
    fn test_security_refund_rejects_bad_input() {
        let bill = stored(3, BillRecord::new("B003/2024"));
        let on = date("2024-06-30");
        let err = SecurityRefund::from_bill(&bill, &[deduction("Income Tax", 10.0)], on).unwrap_err();
        assert!(err.to_string().contains("holds no security deposit"));

        let refund =
            SecurityRefund::from_bill(&bill, &[deduction("Security Deposit", 100.0)], on).unwrap();
        assert!(refund.clone().with_recoveries(-1.0).is_err());
        assert!(refund.clone().with_recoveries(f64::NAN).is_err());
        assert!(refund.with_recoveries(100.01).is_err());
    }

    #[test]
    fn test_project_progress() {
        let mut project = ProjectRecord::new("Bridge Construction");
        project.agreement_amount = Some(2_000_000.0);
        project.start_date = Some(date("2024-01-01"));
        project.completion_date = Some(date("2024-01-11"));
        let report = ProjectReport::new(project, 500_000.0, 300_000.0)
            .with_progress(30.0, date("2024-01-06"));
        let progress = report.progress.unwrap();
        assert_eq!(progress.financial, 25.0);
        assert_eq!(progress.time, 50.0);
        assert_eq!(report.outstanding_amount(), 200_000.0);
    }
}
