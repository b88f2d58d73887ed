//! EMD deposit import from CSV files and, with the `xlsx` feature, Excel
//! workbooks. Both formats go through the same header normalisation and row
//! validation.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[cfg(feature = "xlsx")]
use calamine::{open_workbook_auto, Data, DataType, Reader};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::storage::{Database, EmdRefundRecord};

pub const REQUIRED_COLUMNS: [&str; 5] = [
    "tender_number",
    "contractor_name",
    "emd_amount",
    "deposit_date",
    "status",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Rows parsed from one file, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub records: Vec<EmdRefundRecord>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub ids: Vec<i64>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

/// `"Tender Number "` -> `tender_number`.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '₹' | ',' | '$') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// True when the path names a spreadsheet rather than a CSV file.
pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn get<'r>(&self, record: &'r [String], name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

fn invalid(row: usize, column: &str, what: &str, raw: &str) -> Error {
    Error::Validation(format!(
        "row {}, column {}: expected {}, got '{}'",
        row, column, what, raw
    ))
}

/// Parse and validate an EMD CSV. `refund_date`, `interest_rate` and
/// `refund_amount` are read when present. Any row with a malformed amount or date
/// fails the whole read.
pub fn read_emd_csv<R: Read>(reader: R) -> Result<ImportReport> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    validate_rows(&headers, &rows)
}

/// Parse and validate the first sheet of an EMD workbook, or the named one.
/// The first row holds the headers.
#[cfg(feature = "xlsx")]
pub fn read_emd_workbook<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<ImportReport> {
    let mut workbook = open_workbook_auto(path.as_ref())?;
    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::Validation("workbook has no sheets".to_string()))??,
    };

    let mut cells = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = cells.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = cells.collect();
    validate_rows(&headers, &rows)
}

/// Cell text as the CSV reader would see it. Date cells become `YYYY-MM-DD`.
#[cfg(feature = "xlsx")]
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

fn validate_rows(raw_headers: &[String], rows: &[Vec<String>]) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut index = HashMap::new();
    let headers: Vec<String> = raw_headers.iter().map(|h| normalize_header(h)).collect();
    for (i, name) in headers.iter().enumerate() {
        if index.contains_key(name) {
            report
                .warnings
                .push(format!("Duplicate column '{}'; using the first", name));
            continue;
        }
        index.insert(name.clone(), i);
    }

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !index.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    for (i, name) in headers.iter().enumerate() {
        let first = index.get(name) == Some(&i);
        let empty = rows
            .iter()
            .all(|r| r.get(i).map(|v| v.is_empty()).unwrap_or(true));
        if first && !rows.is_empty() && empty {
            report.warnings.push(format!("Column '{}' is empty", name));
        }
    }

    let columns = Columns { index };
    for (n, record) in rows.iter().enumerate() {
        // Header is line 1.
        let row = n + 2;
        let tender = columns.get(record, "tender_number");
        let amount_raw = columns.get(record, "emd_amount");
        if tender.is_empty() || amount_raw.is_empty() {
            warn!("Skipping row {}: missing tender number or amount", row);
            report.skipped += 1;
            continue;
        }

        let mut emd = EmdRefundRecord::new(tender);
        emd.emd_amount = Some(
            parse_amount(amount_raw)
                .ok_or_else(|| invalid(row, "emd_amount", "a number", amount_raw))?,
        );

        let contractor = columns.get(record, "contractor_name");
        if !contractor.is_empty() {
            emd.contractor_name = Some(contractor.to_string());
        }
        let status = columns.get(record, "status");
        if !status.is_empty() {
            emd.status = status.to_string();
        }

        for name in ["deposit_date", "refund_date"] {
            let raw = columns.get(record, name);
            if raw.is_empty() {
                continue;
            }
            let date = parse_date(raw).ok_or_else(|| invalid(row, name, "a date", raw))?;
            match name {
                "deposit_date" => emd.deposit_date = Some(date),
                _ => emd.refund_date = Some(date),
            }
        }

        for name in ["interest_rate", "refund_amount"] {
            let raw = columns.get(record, name);
            if raw.is_empty() {
                continue;
            }
            let value = parse_amount(raw).ok_or_else(|| invalid(row, name, "a number", raw))?;
            match name {
                "interest_rate" => emd.interest_rate = Some(value),
                _ => emd.refund_amount = Some(value),
            }
        }

        report.records.push(emd);
    }

    for w in &report.warnings {
        warn!("{}", w);
    }
    Ok(report)
}

/// Read an EMD file, choosing the reader by extension: `.xlsx`, `.xlsm`,
/// `.xls` and `.ods` are workbooks, anything else is CSV.
pub fn read_emd_file<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<ImportReport> {
    let path = path.as_ref();
    if !is_workbook_path(path) {
        return read_emd_csv(File::open(path)?);
    }
    #[cfg(feature = "xlsx")]
    {
        read_emd_workbook(path, sheet)
    }
    #[cfg(not(feature = "xlsx"))]
    {
        let _ = sheet;
        Err(Error::Validation(format!(
            "{} is a workbook; this build reads CSV only",
            path.display()
        )))
    }
}

impl Database {
    /// Import an EMD CSV or workbook in one transaction.
    pub fn import_emd_file<P: AsRef<Path>>(
        &self,
        path: P,
        sheet: Option<&str>,
    ) -> Result<ImportSummary> {
        let path = path.as_ref();
        let report = read_emd_file(path, sheet)?;
        let ids = self.save_emd_refunds(&report.records)?;
        info!(
            "Imported {} EMD records from {} ({} skipped)",
            ids.len(),
            path.display(),
            report.skipped
        );
        Ok(ImportSummary {
            ids,
            skipped: report.skipped,
            warnings: report.warnings,
        })
    }
}

/// Write a sample import file with the expected headers and two rows. A
/// workbook path gets an `EMD_Data` sheet and an `Instructions` sheet.
pub fn write_emd_template<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if is_workbook_path(&path) {
        #[cfg(feature = "xlsx")]
        {
            let stamp = crate::export::currency::generated_on(chrono::Local::now());
            std::fs::write(&path, crate::export::workbook::emd_template(&stamp)?)?;
        }
        #[cfg(not(feature = "xlsx"))]
        {
            return Err(Error::Validation(format!(
                "{} is a workbook; this build writes CSV only",
                path.display()
            )));
        }
    } else {
        let mut wtr = WriterBuilder::new().from_path(&path)?;
        wtr.write_record(REQUIRED_COLUMNS)?;
        wtr.write_record(["T001/2024", "ABC Construction", "50000", "2024-01-15", "Pending"])?;
        wtr.write_record(["T002/2024", "XYZ Builders", "75000", "2024-02-01", "Pending"])?;
        wtr.flush()?;
    }
    info!("Wrote EMD import template to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Tender  Number "), "tender_number");
        assert_eq!(normalize_header("EMD_Amount"), "emd_amount");
    }

    #[test]
    fn test_parse_amount_strips_symbols() {
        assert_eq!(parse_amount("₹1,50,000.50"), Some(150_000.5));
        assert_eq!(parse_amount("$ 2,000"), Some(2_000.0));
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount("NaN"), None);
        assert_eq!(parse_amount("infinity"), None);
    }

    #[test]
    fn test_workbook_paths_by_extension() {
        assert!(is_workbook_path(Path::new("emd.xlsx")));
        assert!(is_workbook_path(Path::new("EMD.XLS")));
        assert!(!is_workbook_path(Path::new("emd.csv")));
        assert!(!is_workbook_path(Path::new("emd")));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_date("2024-01-15"), expected);
        assert_eq!(parse_date("15/01/2024"), expected);
        assert_eq!(parse_date("Jan 15"), None);
    }

    #[test]
    fn test_read_valid_file() {
        let data = "Tender Number,Contractor Name,EMD Amount,Deposit Date,Status,Interest Rate\n\
                    T1,ABC,\"₹50,000\",2024-01-10,Pending,6\n\
                    ,XYZ,1000,2024-01-11,Pending,\n\
                    T3,PQR,2500,,Pending,\n";
        let report = read_emd_csv(data.as_bytes()).unwrap();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.records[0].emd_amount, Some(50_000.0));
        assert_eq!(report.records[0].interest_rate, Some(6.0));
        assert_eq!(report.records[0].status, "Pending");
        assert_eq!(report.records[1].deposit_date, None);
    }

    #[test]
    fn test_missing_columns_are_named() {
        let data = "tender_number,emd_amount\nT1,100\n";
        match read_emd_csv(data.as_bytes()) {
            Err(Error::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["contractor_name", "deposit_date", "status"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_bad_amount_names_row_and_column() {
        let data = "tender_number,contractor_name,emd_amount,deposit_date,status\n\
                    T1,A,100,2024-01-01,Pending\n\
                    T2,B,lots,2024-01-01,Pending\n";
        let err = read_emd_csv(data.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("row 3"));
        assert!(err.contains("emd_amount"));
    }

    #[test]
    fn test_warnings_for_duplicate_and_empty_columns() {
        let data = "tender_number,contractor_name,emd_amount,deposit_date,status,Status\n\
                    T1,,100,2024-01-01,Pending,Done\n";
        let report = read_emd_csv(data.as_bytes()).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("Duplicate column 'status'")));
        assert!(report.warnings.iter().any(|w| w.contains("'contractor_name' is empty")));
        assert_eq!(report.records[0].status, "Pending");
    }
}
