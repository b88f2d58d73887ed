use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};

use super::currency::format_inr;
use super::reports::{Cell, TableData};
use crate::compute::bill::{BillDraft, BillItem, BillSummary};
use crate::compute::deductions::DeductionLine;

const PWD_BLUE: u32 = 0x004E89;
const PWD_ORANGE: u32 = 0xFF6B35;
const PWD_GREEN: u32 = 0x1A8A16;
const MONEY_FORMAT: &str = "#,##0.00";

fn title_format(size: u8) -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(size)
        .set_bold()
        .set_font_color(Color::RGB(PWD_BLUE))
        .set_align(FormatAlign::Center)
}

fn header_format(fill: u32) -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(11)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(fill))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
}

fn cell_format() -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_border(FormatBorder::Thin)
}

fn stamp_format() -> Format {
    Format::new()
        .set_font_name("Arial")
        .set_font_size(10)
        .set_italic()
}

/// Bill workbook: a summary sheet, plus item and deduction sheets when the
/// bill has any.
pub fn bill_workbook(draft: &BillDraft, generated_on: &str) -> Result<Vec<u8>, XlsxError> {
    let summary = draft.summary();
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Bill Summary")?;
    write_bill_summary(sheet, draft, &summary, generated_on)?;

    if !draft.items.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Bill Items")?;
        write_items(sheet, &draft.items)?;
    }

    if !summary.deductions.lines.is_empty() {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Deductions")?;
        write_deductions(sheet, &summary.deductions.lines, summary.total_deductions())?;
    }

    workbook.save_to_buffer()
}

fn write_bill_summary(
    sheet: &mut Worksheet,
    draft: &BillDraft,
    summary: &BillSummary,
    generated_on: &str,
) -> Result<(), XlsxError> {
    sheet.merge_range(0, 0, 0, 1, "PWD BILL SUMMARY", &title_format(16))?;
    sheet.write_string_with_format(1, 0, format!("Generated on: {}", generated_on), &stamp_format())?;

    let na = |v: Option<String>| v.unwrap_or_else(|| "N/A".to_string());
    let details = [
        ("Bill Number:", draft.bill_number.clone()),
        ("Bill Date:", na(draft.bill_date.map(|d| d.to_string()))),
        ("Contractor Name:", na(draft.contractor_name.clone())),
        ("Project Name:", na(draft.project_name.clone())),
        ("Work Order No.:", na(draft.work_order_no.clone())),
        ("Agreement Amount:", format_inr(draft.agreement_amount.unwrap_or(0.0))),
        ("Bill Amount:", format_inr(summary.gross_amount)),
        ("Total Deductions:", format_inr(summary.total_deductions())),
        ("Net Payable Amount:", format_inr(summary.net_payable())),
    ];

    let label = Format::new().set_font_name("Arial").set_font_size(11).set_bold();
    let value = Format::new().set_font_name("Arial").set_font_size(11);
    for (i, (name, text)) in details.iter().enumerate() {
        let row = 3 + i as u32;
        sheet.write_string_with_format(row, 0, *name, &label)?;
        sheet.write_string_with_format(row, 1, text.as_str(), &value)?;
    }

    sheet.set_column_width(0, 25)?;
    sheet.set_column_width(1, 30)?;
    Ok(())
}

fn write_items(sheet: &mut Worksheet, items: &[BillItem]) -> Result<(), XlsxError> {
    sheet.merge_range(0, 0, 0, 5, "BILL ITEMS", &title_format(14))?;

    let header = header_format(PWD_ORANGE);
    for (col, name) in ["S.No.", "Description", "Unit", "Quantity", "Rate", "Amount"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(2, col as u16, *name, &header)?;
    }

    let text = cell_format();
    let money = cell_format().set_num_format(MONEY_FORMAT);
    let mut row = 3u32;
    for (i, item) in items.iter().enumerate() {
        sheet.write_number_with_format(row, 0, (i + 1) as f64, &text)?;
        sheet.write_string_with_format(row, 1, item.description.as_str(), &text)?;
        sheet.write_string_with_format(row, 2, item.unit.as_str(), &text)?;
        sheet.write_number_with_format(row, 3, item.quantity, &money)?;
        sheet.write_number_with_format(row, 4, item.rate, &money)?;
        sheet.write_number_with_format(row, 5, item.total(), &money)?;
        row += 1;
    }
    let total: f64 = items.iter().map(BillItem::total).sum();
    sheet.write_string_with_format(row, 4, "Total", &text.clone().set_bold())?;
    sheet.write_number_with_format(row, 5, total, &money.clone().set_bold())?;

    sheet.set_column_width(1, 40)?;
    for col in [3u16, 4, 5] {
        sheet.set_column_width(col, 15)?;
    }
    Ok(())
}

fn write_deductions(
    sheet: &mut Worksheet,
    lines: &[DeductionLine],
    total: f64,
) -> Result<(), XlsxError> {
    sheet.merge_range(0, 0, 0, 4, "DEDUCTIONS", &title_format(14))?;

    let header = header_format(PWD_GREEN);
    for (col, name) in ["S.No.", "Deduction Type", "Rate (%)", "Amount", "Statutory"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(2, col as u16, *name, &header)?;
    }

    let text = cell_format();
    let money = cell_format().set_num_format(MONEY_FORMAT);
    let mut row = 3u32;
    for (i, line) in lines.iter().enumerate() {
        sheet.write_number_with_format(row, 0, (i + 1) as f64, &text)?;
        sheet.write_string_with_format(row, 1, line.deduction_type.as_str(), &text)?;
        sheet.write_string_with_format(row, 2, line.rate_label(), &text)?;
        sheet.write_number_with_format(row, 3, line.amount, &money)?;
        sheet.write_string_with_format(row, 4, if line.statutory { "Yes" } else { "No" }, &text)?;
        row += 1;
    }
    sheet.write_string_with_format(row, 1, "Total Deductions", &text.clone().set_bold())?;
    sheet.write_number_with_format(row, 3, total, &money.clone().set_bold())?;

    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(3, 15)?;
    Ok(())
}

/// EMD import template: an `EMD_Data` sheet with the expected headers and two
/// sample rows, and an `Instructions` sheet.
pub fn emd_template(generated_on: &str) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("EMD_Data")?;
    let header = header_format(PWD_BLUE);
    for (col, name) in [
        "Tender Number",
        "Contractor Name",
        "EMD Amount",
        "Deposit Date",
        "Status",
    ]
    .iter()
    .enumerate()
    {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
        sheet.set_column_width(col as u16, 20)?;
    }
    let samples = [
        ("T001/2024", "ABC Construction", 50_000.0, "2024-01-15"),
        ("T002/2024", "XYZ Builders", 75_000.0, "2024-01-20"),
    ];
    for (i, (tender, contractor, amount, date)) in samples.iter().enumerate() {
        let row = 1 + i as u32;
        sheet.write_string(row, 0, *tender)?;
        sheet.write_string(row, 1, *contractor)?;
        sheet.write_number(row, 2, *amount)?;
        sheet.write_string(row, 3, *date)?;
        sheet.write_string(row, 4, "Pending")?;
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("Instructions")?;
    sheet.write_string_with_format(0, 0, "EMD Import Template Instructions", &title_format(14))?;
    let lines = [
        "Each row of the EMD_Data sheet is one Earnest Money Deposit.",
        "",
        "Required columns:",
        "- Tender Number: unique identifier of the tender",
        "- Contractor Name: name of the bidder",
        "- EMD Amount: amount in rupees",
        "- Deposit Date: YYYY-MM-DD, DD/MM/YYYY or DD-MM-YYYY",
        "- Status: e.g. Pending or Processed",
        "",
        "Optional columns: Refund Date, Interest Rate, Refund Amount.",
        "",
        "Rows without a tender number or amount are skipped.",
        "A malformed amount or date rejects the whole file.",
    ];
    for (i, line) in lines.iter().enumerate() {
        sheet.write_string(2 + i as u32, 0, *line)?;
    }
    sheet.write_string_with_format(
        3 + lines.len() as u32,
        0,
        format!("Template created: {}", generated_on),
        &stamp_format(),
    )?;
    sheet.set_column_width(0, 70)?;

    workbook.save_to_buffer()
}

/// Single-sheet report: title, timestamp, header row, data rows. Numbers
/// above 1000 get thousands separators.
pub fn table_workbook(
    title: &str,
    table: &TableData,
    generated_on: &str,
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Report")?;

    let last_col = table.headers.len().max(5) as u16 - 1;
    sheet.merge_range(0, 0, 0, last_col, title, &title_format(16))?;
    sheet.merge_range(
        1,
        0,
        1,
        last_col,
        &format!("Generated on: {}", generated_on),
        &stamp_format(),
    )?;

    let header = header_format(PWD_ORANGE);
    for (col, name) in table.headers.iter().enumerate() {
        sheet.write_string_with_format(3, col as u16, name.as_str(), &header)?;
    }

    let text = cell_format();
    let large = cell_format().set_num_format(MONEY_FORMAT);
    let small = cell_format().set_num_format("0.00");
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();

    for (r, cells) in table.rows.iter().enumerate() {
        let row = 4 + r as u32;
        for (c, cell) in cells.iter().enumerate() {
            let col = c as u16;
            match cell {
                Cell::Number(n) if c > 0 => {
                    let format = if *n > 1000.0 { &large } else { &small };
                    sheet.write_number_with_format(row, col, *n, format)?;
                }
                Cell::Number(n) => {
                    sheet.write_number_with_format(row, col, *n, &text)?;
                }
                Cell::Text(s) => {
                    sheet.write_string_with_format(row, col, s.as_str(), &text)?;
                }
                Cell::Empty => {
                    sheet.write_blank(row, col, &text)?;
                }
            }
            if let Some(w) = widths.get_mut(c) {
                *w = (*w).max(cell.display().chars().count());
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, (width + 2).min(50) as f64)?;
    }

    workbook.save_to_buffer()
}
