//! Plain-text reports. Always available; used when a document renderer is
//! not compiled in.

use std::fmt::Write;

use super::currency::format_inr;
use super::reports::{EmdCertificate, ProjectReport, SecurityRefund};
use crate::compute::bill::BillDraft;

fn or_na<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn bill_report(draft: &BillDraft, generated_on: &str) -> String {
    let summary = draft.summary();
    let mut out = String::new();
    let _ = writeln!(out, "PWD BILL REPORT");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out);
    let _ = writeln!(out, "Bill Number: {}", draft.bill_number);
    let _ = writeln!(out, "Bill Date: {}", or_na(&draft.bill_date));
    let _ = writeln!(out, "Contractor: {}", or_na(&draft.contractor_name));
    let _ = writeln!(out, "Project: {}", or_na(&draft.project_name));
    let _ = writeln!(out);

    if !summary.deductions.lines.is_empty() {
        let _ = writeln!(out, "DEDUCTIONS:");
        for line in &summary.deductions.lines {
            let _ = writeln!(
                out,
                "  {:<24} {:>8}  {}",
                line.deduction_type,
                line.rate_label(),
                format_inr(line.amount)
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "FINANCIAL DETAILS:");
    let _ = writeln!(out, "Bill Amount: {}", format_inr(summary.gross_amount));
    let _ = writeln!(
        out,
        "Total Deductions: {}",
        format_inr(summary.total_deductions())
    );
    let _ = writeln!(out, "Net Payable: {}", format_inr(summary.net_payable()));
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated on: {}", generated_on);
    let _ = writeln!(out, "PWD Tools - Bill Generator");
    out
}

pub fn emd_report(cert: &EmdCertificate, generated_on: &str) -> String {
    let calc = &cert.calculation;
    let mut out = String::new();
    let _ = writeln!(out, "EMD REFUND CERTIFICATE");
    let _ = writeln!(out, "======================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Tender Number: {}", cert.tender_number);
    let _ = writeln!(out, "Contractor: {}", or_na(&cert.contractor_name));
    let _ = writeln!(out, "EMD Amount: {}", format_inr(calc.principal));
    let _ = writeln!(out, "Deposit Date: {}", or_na(&cert.deposit_date));
    let _ = writeln!(out, "Refund Date: {}", or_na(&cert.refund_date));
    let _ = writeln!(out, "Days Held: {}", calc.days_held);
    let _ = writeln!(out, "Interest Rate: {:.2}% per annum", calc.annual_rate);
    let _ = writeln!(out, "Interest Amount: {}", format_inr(calc.interest));
    let _ = writeln!(out, "Total Refund: {}", format_inr(calc.refund));
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated on: {}", generated_on);
    let _ = writeln!(out, "PWD Tools - EMD Refund Calculator");
    out
}

pub fn security_refund_report(refund: &SecurityRefund, generated_on: &str) -> String {
    let bill = &refund.bill;
    let mut out = String::new();
    let _ = writeln!(out, "SECURITY DEPOSIT REFUND");
    let _ = writeln!(out, "=======================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Bill Number: {}", bill.bill_number);
    let _ = writeln!(out, "Bill Date: {}", or_na(&bill.bill_date));
    let _ = writeln!(out, "Contractor: {}", or_na(&bill.contractor_name));
    let _ = writeln!(out, "Project: {}", or_na(&bill.project_name));
    let _ = writeln!(
        out,
        "Bill Amount: {}",
        format_inr(bill.bill_amount.unwrap_or(0.0))
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "DEPOSITS HELD:");
    for deposit in &refund.deposits {
        let _ = writeln!(
            out,
            "  {:<24} {:>8}  {}",
            deposit.deduction_type,
            format!("{:.2}%", deposit.rate),
            format_inr(deposit.amount)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Held: {}", format_inr(refund.total_held()));
    let _ = writeln!(out, "Recoveries: {}", format_inr(refund.recoveries));
    let _ = writeln!(out, "Amount Refundable: {}", format_inr(refund.refund_amount()));
    let _ = writeln!(out, "Refund Date: {}", refund.refund_date);
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated on: {}", generated_on);
    let _ = writeln!(out, "PWD Tools - Security Refund");
    out
}

pub fn project_report(report: &ProjectReport, generated_on: &str) -> String {
    let project = &report.project;
    let mut out = String::new();
    let _ = writeln!(out, "PROJECT FINANCIAL REPORT");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Project Name: {}", project.project_name);
    let _ = writeln!(out, "Project Code: {}", or_na(&project.project_code));
    let _ = writeln!(out, "Contractor: {}", or_na(&project.contractor_name));
    let _ = writeln!(
        out,
        "Agreement Amount: {}",
        format_inr(project.agreement_amount.unwrap_or(0.0))
    );
    let _ = writeln!(out, "Work Done: {}", format_inr(report.work_done_amount));
    let _ = writeln!(out, "Payments Made: {}", format_inr(report.payments_made));
    let _ = writeln!(out, "Outstanding: {}", format_inr(report.outstanding_amount()));
    if let Some(progress) = report.progress {
        let _ = writeln!(out);
        let _ = writeln!(out, "Physical Progress: {:.1}%", progress.physical);
        let _ = writeln!(out, "Financial Progress: {:.1}%", progress.financial);
        let _ = writeln!(out, "Time Progress: {:.1}%", progress.time);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Generated on: {}", generated_on);
    let _ = writeln!(out, "PWD Tools - Financial Analysis Module");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::deductions::DeductionSpec;

    #[test]
    fn test_bill_report_totals() {
        let draft = BillDraft {
            bill_number: "B9".to_string(),
            bill_amount: Some(500_000.0),
            deductions: vec![
                DeductionSpec::fixed("Income Tax", 5_000.0, true),
                DeductionSpec::percent("Security Deposit", 5.0, false),
            ],
            ..Default::default()
        };
        let report = bill_report(&draft, "01/01/2024 00:00:00");
        assert!(report.contains("Bill Number: B9"));
        assert!(report.contains("Bill Date: N/A"));
        assert!(report.contains("Total Deductions: ₹30,000.00"));
        assert!(report.contains("Net Payable: ₹470,000.00"));
        assert!(report.contains("Generated on: 01/01/2024 00:00:00"));
    }
}
