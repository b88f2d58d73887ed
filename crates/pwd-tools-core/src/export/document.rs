use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::currency::format_money;
use super::reports::{EmdCertificate, ProjectReport, SecurityRefund};
use crate::compute::bill::BillDraft;
use crate::error::Error;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;

/// The built-in PDF fonts have no rupee glyph.
const PDF_RUPEE: &str = "Rs. ";

fn money(value: f64) -> String {
    format_money(PDF_RUPEE, value)
}

fn na(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

fn doc_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Document(e.to_string())
}

/// Top-down text cursor over A4 pages.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, Error> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(doc_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(doc_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM * 1.5
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        self.layer
            .use_text(text, size, Mm(x), Mm(self.y), self.font(bold));
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        self.text_at(text, size, MARGIN, bold);
        self.y -= height;
    }

    /// Approximate centring; Helvetica averages about half an em per glyph.
    fn centered(&mut self, text: &str, size: f32, bold: bool) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        let width = text.chars().count() as f32 * size * 0.5 * PT_TO_MM;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.text_at(text, size, x, bold);
        self.y -= height;
    }

    /// One table row; `widths` are column widths in mm from the left margin.
    fn row(&mut self, cells: &[String], widths: &[f32], size: f32, bold: bool) {
        let height = Self::line_height(size);
        self.ensure_space(height);
        let mut x = MARGIN;
        for (cell, width) in cells.iter().zip(widths) {
            self.text_at(cell, size, x, bold);
            x += width;
        }
        self.y -= height;
    }

    fn rule(&mut self) {
        self.line(&"-".repeat(95), 8.0, false);
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn footer(&mut self, generated_on: &str, module: &str) {
        self.gap(8.0);
        self.line(&format!("Generated on: {}", generated_on), 9.0, false);
        self.line(module, 9.0, false);
    }

    fn finish(self) -> Result<Vec<u8>, Error> {
        self.doc.save_to_bytes().map_err(doc_err)
    }
}

/// Bill: header block, details, items, deductions, summary and signatures.
pub fn bill_document(draft: &BillDraft, generated_on: &str) -> Result<Vec<u8>, Error> {
    let summary = draft.summary();
    let mut w = PageWriter::new(&format!("Bill {}", draft.bill_number))?;

    w.centered("Government of Rajasthan", 16.0, true);
    w.centered("Public Works Department", 16.0, true);
    w.gap(4.0);
    w.centered(&format!("BILL NO: {}", draft.bill_number), 13.0, true);
    w.gap(4.0);

    let details = [
        ("Bill Date:", na(draft.bill_date.map(|d| d.to_string()))),
        ("Contractor Name:", na(draft.contractor_name.clone())),
        ("Project Name:", na(draft.project_name.clone())),
        ("Work Order No.:", na(draft.work_order_no.clone())),
        ("Agreement Amount:", money(draft.agreement_amount.unwrap_or(0.0))),
        ("Bill Amount:", money(summary.gross_amount)),
    ];
    for (label, value) in details {
        w.row(&[label.to_string(), value], &[50.0, 120.0], 10.0, false);
    }
    w.gap(4.0);

    if let Some(description) = &draft.work_description {
        w.line("Work Description:", 10.0, true);
        w.line(description, 10.0, false);
        w.gap(4.0);
    }

    if !draft.items.is_empty() {
        let widths = [12.0, 68.0, 18.0, 22.0, 25.0, 25.0];
        w.line("Bill Items", 12.0, true);
        w.row(
            &[
                "S.No.".to_string(),
                "Description".to_string(),
                "Unit".to_string(),
                "Quantity".to_string(),
                "Rate".to_string(),
                "Amount".to_string(),
            ],
            &widths,
            9.0,
            true,
        );
        w.rule();
        for (i, item) in draft.items.iter().enumerate() {
            w.row(
                &[
                    (i + 1).to_string(),
                    item.description.clone(),
                    item.unit.clone(),
                    format!("{:.2}", item.quantity),
                    money(item.rate),
                    money(item.total()),
                ],
                &widths,
                9.0,
                false,
            );
        }
        w.gap(4.0);
    }

    if !summary.deductions.lines.is_empty() {
        let widths = [80.0, 35.0, 50.0];
        w.line("Deductions", 12.0, true);
        w.row(
            &[
                "Deduction Type".to_string(),
                "Rate (%)".to_string(),
                "Amount".to_string(),
            ],
            &widths,
            9.0,
            true,
        );
        w.rule();
        for line in &summary.deductions.lines {
            w.row(
                &[line.deduction_type.clone(), line.rate_label(), money(line.amount)],
                &widths,
                9.0,
                false,
            );
        }
        w.row(
            &[
                "Total Deductions".to_string(),
                String::new(),
                money(summary.total_deductions()),
            ],
            &widths,
            9.0,
            true,
        );
        w.gap(4.0);
    }

    w.row(
        &["Bill Amount:".to_string(), money(summary.gross_amount)],
        &[70.0, 60.0],
        10.0,
        false,
    );
    w.row(
        &["Total Deductions:".to_string(), money(summary.total_deductions())],
        &[70.0, 60.0],
        10.0,
        false,
    );
    w.row(
        &["Net Payable Amount:".to_string(), money(summary.net_payable())],
        &[70.0, 60.0],
        10.0,
        true,
    );
    w.gap(12.0);

    let sig = [56.0, 56.0, 56.0];
    w.row(
        &[
            "Contractor Signature".to_string(),
            "Assistant Engineer".to_string(),
            "Executive Engineer".to_string(),
        ],
        &sig,
        10.0,
        false,
    );
    w.row(&["_".repeat(20), "_".repeat(20), "_".repeat(20)], &sig, 10.0, false);

    w.footer(generated_on, "PWD Tools - Bill Generator");
    w.finish()
}

pub fn emd_certificate(cert: &EmdCertificate, generated_on: &str) -> Result<Vec<u8>, Error> {
    let calc = &cert.calculation;
    let mut w = PageWriter::new(&format!("EMD Refund {}", cert.tender_number))?;

    w.centered("Government of Rajasthan", 16.0, true);
    w.centered("Public Works Department", 16.0, true);
    w.centered("EMD REFUND CERTIFICATE", 14.0, true);
    w.gap(6.0);

    let details = [
        ("Tender Number:", cert.tender_number.clone()),
        ("Contractor/Bidder Name:", na(cert.contractor_name.clone())),
        ("EMD Amount:", money(calc.principal)),
        ("Deposit Date:", na(cert.deposit_date.map(|d| d.to_string()))),
        ("Refund Date:", na(cert.refund_date.map(|d| d.to_string()))),
        ("Interest Rate:", format!("{:.2}% per annum", calc.annual_rate)),
        ("Interest Amount:", money(calc.interest)),
    ];
    for (label, value) in details {
        w.row(&[label.to_string(), value], &[60.0, 110.0], 10.0, false);
    }
    w.row(
        &["Total Refund Amount:".to_string(), money(calc.refund)],
        &[60.0, 110.0],
        10.0,
        true,
    );
    w.gap(6.0);

    if calc.days_held > 0 {
        w.line("Calculation Details:", 11.0, true);
        w.line(&format!("Days Held: {} days", calc.days_held), 10.0, false);
        w.line(
            &format!(
                "Interest Calculation: {} x {:.2}% x {}/365",
                money(calc.principal),
                calc.annual_rate,
                calc.days_held
            ),
            10.0,
            false,
        );
        w.gap(6.0);
    }

    w.line(
        "This is to certify that the above EMD refund has been calculated correctly",
        10.0,
        false,
    );
    w.line("and is approved for payment.", 10.0, false);
    w.gap(14.0);

    let sig = [56.0, 56.0, 56.0];
    w.row(
        &[
            "Accounts Officer".to_string(),
            "Assistant Engineer".to_string(),
            "Executive Engineer".to_string(),
        ],
        &sig,
        9.0,
        false,
    );
    w.row(&["_".repeat(15), "_".repeat(15), "_".repeat(15)], &sig, 9.0, false);
    w.row(
        &[
            "Date: _________".to_string(),
            "Date: _________".to_string(),
            "Date: _________".to_string(),
        ],
        &sig,
        9.0,
        false,
    );

    w.footer(generated_on, "PWD Tools - EMD Refund Calculator");
    w.finish()
}

pub fn security_refund(refund: &SecurityRefund, generated_on: &str) -> Result<Vec<u8>, Error> {
    let bill = &refund.bill;
    let mut w = PageWriter::new(&format!("Security Refund {}", bill.bill_number))?;

    w.centered("Government of Rajasthan", 16.0, true);
    w.centered("Public Works Department", 16.0, true);
    w.centered("SECURITY DEPOSIT REFUND", 14.0, true);
    w.gap(6.0);

    let details = [
        ("Bill Number:", bill.bill_number.clone()),
        ("Bill Date:", na(bill.bill_date.map(|d| d.to_string()))),
        ("Contractor Name:", na(bill.contractor_name.clone())),
        ("Project Name:", na(bill.project_name.clone())),
        ("Bill Amount:", money(bill.bill_amount.unwrap_or(0.0))),
        ("Refund Date:", refund.refund_date.to_string()),
    ];
    for (label, value) in details {
        w.row(&[label.to_string(), value], &[60.0, 110.0], 10.0, false);
    }
    w.gap(6.0);

    let widths = [15.0, 85.0, 30.0, 40.0];
    w.row(
        &[
            "S.No.".to_string(),
            "Deposit".to_string(),
            "Rate".to_string(),
            "Amount".to_string(),
        ],
        &widths,
        10.0,
        true,
    );
    w.rule();
    for (i, deposit) in refund.deposits.iter().enumerate() {
        w.row(
            &[
                (i + 1).to_string(),
                deposit.deduction_type.clone(),
                format!("{:.2}%", deposit.rate),
                money(deposit.amount),
            ],
            &widths,
            10.0,
            false,
        );
    }
    w.rule();
    w.gap(4.0);

    let totals = [
        ("Total Held:", money(refund.total_held()), false),
        ("Less Recoveries:", money(refund.recoveries), false),
        ("Amount Refundable:", money(refund.refund_amount()), true),
    ];
    for (label, value, bold) in totals {
        w.row(&[label.to_string(), value], &[60.0, 110.0], 10.0, bold);
    }
    w.gap(6.0);

    w.line(
        "Certified that the work has been completed and the defect liability period",
        10.0,
        false,
    );
    w.line("has expired. The above security deposit may be released.", 10.0, false);
    w.gap(14.0);

    let sig = [56.0, 56.0, 56.0];
    w.row(
        &[
            "Accounts Officer".to_string(),
            "Assistant Engineer".to_string(),
            "Executive Engineer".to_string(),
        ],
        &sig,
        9.0,
        false,
    );
    w.row(&["_".repeat(15), "_".repeat(15), "_".repeat(15)], &sig, 9.0, false);

    w.footer(generated_on, "PWD Tools - Security Refund");
    w.finish()
}

pub fn project_report(report: &ProjectReport, generated_on: &str) -> Result<Vec<u8>, Error> {
    let project = &report.project;
    let mut w = PageWriter::new(&format!("Project {}", project.project_name))?;

    w.centered("PROJECT FINANCIAL REPORT", 16.0, true);
    w.centered("PWD - Public Works Department", 12.0, false);
    w.gap(6.0);

    let details = [
        ("Project Name:", project.project_name.clone()),
        ("Project Code:", na(project.project_code.clone())),
        ("Contractor Name:", na(project.contractor_name.clone())),
        ("Agreement Amount:", money(project.agreement_amount.unwrap_or(0.0))),
        ("Work Done Amount:", money(report.work_done_amount)),
        ("Payments Made:", money(report.payments_made)),
        ("Outstanding Amount:", money(report.outstanding_amount())),
    ];
    for (label, value) in details {
        w.row(&[label.to_string(), value], &[60.0, 110.0], 10.0, false);
    }
    w.gap(6.0);

    if let Some(progress) = report.progress {
        w.line("Progress Summary", 12.0, true);
        for (label, pct) in [
            ("Physical Progress:", progress.physical),
            ("Financial Progress:", progress.financial),
            ("Time Progress:", progress.time),
        ] {
            w.row(
                &[label.to_string(), format!("{:.1}%", pct)],
                &[60.0, 110.0],
                10.0,
                false,
            );
        }
        w.gap(6.0);
    }

    w.footer(generated_on, "PWD Tools - Financial Analysis Module");
    w.finish()
}
