use chrono::NaiveDate;
use tracing::info;

use super::models::{EmdRefundRecord, ProjectRecord};
use super::sqlite::Database;
use crate::compute::bill::BillDraft;
use crate::compute::deductions::DeductionSpec;
use crate::compute::interest::DepositInterest;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleIds {
    pub bill_id: i64,
    pub emd_id: i64,
    pub project_id: i64,
}

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

impl Database {
    /// Insert one bill (with two deductions), one EMD refund and one project
    /// for demonstration and manual testing.
    pub fn seed_sample_data(&self) -> Result<SampleIds, Error> {
        let bill = BillDraft {
            bill_number: "B001/2024".to_string(),
            bill_date: ymd(2024, 1, 15),
            contractor_name: Some("ABC Construction".to_string()),
            project_name: Some("Road Construction Project".to_string()),
            bill_amount: Some(500_000.0),
            status: Some("Active".to_string()),
            deductions: vec![
                DeductionSpec {
                    deduction_type: "Income Tax".to_string(),
                    rate: 1.0,
                    fixed_amount: Some(5_000.0),
                    statutory: true,
                },
                DeductionSpec {
                    deduction_type: "Security Deposit".to_string(),
                    rate: 5.0,
                    fixed_amount: Some(25_000.0),
                    statutory: false,
                },
            ],
            ..Default::default()
        };
        let bill_id = self.save_bill_draft(&bill)?;

        let mut emd = EmdRefundRecord::new("T001/2024");
        emd.contractor_name = Some("XYZ Builders".to_string());
        emd.emd_amount = Some(50_000.0);
        emd.deposit_date = ymd(2024, 1, 10);
        emd.refund_date = ymd(2024, 2, 10);
        emd.interest_rate = Some(6.0);
        emd.refund_amount = emd.deposit_date.zip(emd.refund_date).map(|(deposit, refund)| {
            DepositInterest::between(50_000.0, 6.0, deposit, refund)
                .rounded()
                .refund
        });
        let emd_id = self.save_emd_refund(&emd)?;

        let mut project = ProjectRecord::new("Bridge Construction");
        project.project_code = Some("PWD/BRG/001".to_string());
        project.contractor_name = Some("PQR Infrastructure".to_string());
        project.agreement_amount = Some(2_000_000.0);
        project.start_date = ymd(2024, 1, 1);
        project.completion_date = ymd(2024, 12, 31);
        let project_id = self.save_project(&project)?;

        info!(
            "Seeded sample data: bill {}, EMD refund {}, project {}",
            bill_id, emd_id, project_id
        );
        Ok(SampleIds {
            bill_id,
            emd_id,
            project_id,
        })
    }
}
