use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The four record tables of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    Bill,
    Deduction,
    EmdRefund,
    Project,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Date,
    Real,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

const BILL_COLUMNS: &[Column] = &[
    col("bill_number", ColumnType::Text),
    col("bill_date", ColumnType::Date),
    col("contractor_name", ColumnType::Text),
    col("project_name", ColumnType::Text),
    col("bill_amount", ColumnType::Real),
    col("status", ColumnType::Text),
];

const DEDUCTION_COLUMNS: &[Column] = &[
    col("bill_id", ColumnType::Integer),
    col("deduction_type", ColumnType::Text),
    col("amount", ColumnType::Real),
    col("rate", ColumnType::Real),
    col("is_statutory", ColumnType::Boolean),
];

const EMD_REFUND_COLUMNS: &[Column] = &[
    col("tender_number", ColumnType::Text),
    col("contractor_name", ColumnType::Text),
    col("emd_amount", ColumnType::Real),
    col("deposit_date", ColumnType::Date),
    col("refund_date", ColumnType::Date),
    col("interest_rate", ColumnType::Real),
    col("refund_amount", ColumnType::Real),
    col("status", ColumnType::Text),
];

const PROJECT_COLUMNS: &[Column] = &[
    col("project_name", ColumnType::Text),
    col("project_code", ColumnType::Text),
    col("contractor_name", ColumnType::Text),
    col("agreement_amount", ColumnType::Real),
    col("start_date", ColumnType::Date),
    col("completion_date", ColumnType::Date),
    col("status", ColumnType::Text),
];

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Bill,
        RecordKind::Deduction,
        RecordKind::EmdRefund,
        RecordKind::Project,
    ];

    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Bill => "bills",
            RecordKind::Deduction => "deductions",
            RecordKind::EmdRefund => "emd_refunds",
            RecordKind::Project => "projects",
        }
    }

    /// Writable columns, excluding `id` and `created_at`.
    pub fn columns(self) -> &'static [Column] {
        match self {
            RecordKind::Bill => BILL_COLUMNS,
            RecordKind::Deduction => DEDUCTION_COLUMNS,
            RecordKind::EmdRefund => EMD_REFUND_COLUMNS,
            RecordKind::Project => PROJECT_COLUMNS,
        }
    }

    /// Columns matched by substring search.
    pub fn search_columns(self) -> &'static [&'static str] {
        match self {
            RecordKind::Bill => &["bill_number", "contractor_name", "project_name"],
            RecordKind::Deduction => &[],
            RecordKind::EmdRefund => &["tender_number", "contractor_name"],
            RecordKind::Project => &["project_name", "project_code", "contractor_name"],
        }
    }

    pub fn column(self, name: &str) -> Option<&'static Column> {
        self.columns().iter().find(|c| c.name == name)
    }

    pub fn select_list(self) -> String {
        let mut cols = vec!["id"];
        cols.extend(self.columns().iter().map(|c| c.name));
        cols.push("created_at");
        cols.join(", ")
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "bill" | "bills" => Ok(RecordKind::Bill),
            "deduction" | "deductions" => Ok(RecordKind::Deduction),
            "emd" | "emd_refund" | "emd_refunds" => Ok(RecordKind::EmdRefund),
            "project" | "projects" => Ok(RecordKind::Project),
            _ => Err(Error::UnknownKind(s.to_string())),
        }
    }
}

/// A dynamically typed column value used by field updates.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Real(f64),
    Integer(i64),
}

impl FieldValue {
    /// Parse raw text input for a column of the given type. Empty input and
    /// `null` clear the field.
    pub fn parse(column: &Column, raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return Ok(FieldValue::Null);
        }
        let invalid = |what: &str| {
            Error::Validation(format!("{} expects {}, got '{}'", column.name, what, raw))
        };
        match column.ty {
            ColumnType::Text => Ok(FieldValue::Text(raw.to_string())),
            ColumnType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| FieldValue::Text(d.format("%Y-%m-%d").to_string()))
                .map_err(|_| invalid("a YYYY-MM-DD date")),
            ColumnType::Real => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Real)
                .ok_or_else(|| invalid("a number")),
            ColumnType::Integer => raw
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| invalid("an integer")),
            ColumnType::Boolean => match raw.to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(FieldValue::Integer(1)),
                "false" | "no" | "0" => Ok(FieldValue::Integer(0)),
                _ => Err(invalid("true or false")),
            },
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            FieldValue::Null => Ok(ToSqlOutput::Owned(Value::Null)),
            FieldValue::Text(s) => s.to_sql(),
            FieldValue::Real(v) => v.to_sql(),
            FieldValue::Integer(v) => v.to_sql(),
        }
    }
}

/// A row read back from the ledger: generated id and timestamp plus the
/// record as it was saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: i64,
    pub created_at: String,
    #[serde(flatten)]
    pub record: T,
}

/// Implemented by every record type that maps onto one ledger table.
pub trait Record: Sized {
    const KIND: RecordKind;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub(crate) fn stored_from_row<T: Record>(row: &Row<'_>) -> rusqlite::Result<Stored<T>> {
    Ok(Stored {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        record: T::from_row(row)?,
    })
}

fn default_active() -> String {
    "Active".to_string()
}

fn default_processed() -> String {
    "Processed".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRecord {
    pub bill_number: String,
    pub bill_date: Option<NaiveDate>,
    pub contractor_name: Option<String>,
    pub project_name: Option<String>,
    pub bill_amount: Option<f64>,
    #[serde(default = "default_active")]
    pub status: String,
}

impl BillRecord {
    pub fn new(bill_number: &str) -> Self {
        Self {
            bill_number: bill_number.to_string(),
            bill_date: None,
            contractor_name: None,
            project_name: None,
            bill_amount: None,
            status: default_active(),
        }
    }
}

impl Record for BillRecord {
    const KIND: RecordKind = RecordKind::Bill;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bill_number: row.get("bill_number")?,
            bill_date: row.get("bill_date")?,
            contractor_name: row.get("contractor_name")?,
            project_name: row.get("project_name")?,
            bill_amount: row.get("bill_amount")?,
            status: row
                .get::<_, Option<String>>("status")?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionRecord {
    pub bill_id: i64,
    pub deduction_type: String,
    pub amount: f64,
    pub rate: f64,
    pub is_statutory: bool,
}

impl Record for DeductionRecord {
    const KIND: RecordKind = RecordKind::Deduction;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bill_id: row.get::<_, Option<i64>>("bill_id")?.unwrap_or_default(),
            deduction_type: row
                .get::<_, Option<String>>("deduction_type")?
                .unwrap_or_default(),
            amount: row.get::<_, Option<f64>>("amount")?.unwrap_or_default(),
            rate: row.get::<_, Option<f64>>("rate")?.unwrap_or_default(),
            is_statutory: row
                .get::<_, Option<bool>>("is_statutory")?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmdRefundRecord {
    pub tender_number: String,
    pub contractor_name: Option<String>,
    pub emd_amount: Option<f64>,
    pub deposit_date: Option<NaiveDate>,
    pub refund_date: Option<NaiveDate>,
    pub interest_rate: Option<f64>,
    pub refund_amount: Option<f64>,
    #[serde(default = "default_processed")]
    pub status: String,
}

impl EmdRefundRecord {
    pub fn new(tender_number: &str) -> Self {
        Self {
            tender_number: tender_number.to_string(),
            contractor_name: None,
            emd_amount: None,
            deposit_date: None,
            refund_date: None,
            interest_rate: None,
            refund_amount: None,
            status: default_processed(),
        }
    }
}

impl Record for EmdRefundRecord {
    const KIND: RecordKind = RecordKind::EmdRefund;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            tender_number: row.get("tender_number")?,
            contractor_name: row.get("contractor_name")?,
            emd_amount: row.get("emd_amount")?,
            deposit_date: row.get("deposit_date")?,
            refund_date: row.get("refund_date")?,
            interest_rate: row.get("interest_rate")?,
            refund_amount: row.get("refund_amount")?,
            status: row
                .get::<_, Option<String>>("status")?
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_name: String,
    pub project_code: Option<String>,
    pub contractor_name: Option<String>,
    pub agreement_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub status: String,
}

impl ProjectRecord {
    pub fn new(project_name: &str) -> Self {
        Self {
            project_name: project_name.to_string(),
            project_code: None,
            contractor_name: None,
            agreement_amount: None,
            start_date: None,
            completion_date: None,
            status: default_active(),
        }
    }
}

impl Record for ProjectRecord {
    const KIND: RecordKind = RecordKind::Project;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            project_name: row.get("project_name")?,
            project_code: row.get("project_code")?,
            contractor_name: row.get("contractor_name")?,
            agreement_amount: row.get("agreement_amount")?,
            start_date: row.get("start_date")?,
            completion_date: row.get("completion_date")?,
            status: row
                .get::<_, Option<String>>("status")?
                .unwrap_or_default(),
        })
    }
}

/// Aggregate counts and sums across the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub total_bills: i64,
    pub total_emd_refunds: i64,
    pub total_projects: i64,
    pub total_deductions: i64,
    pub total_active_bills_amount: f64,
    pub total_emd_amount: f64,
    pub total_active_projects_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fields_reject_non_finite_numbers() {
        let amount = RecordKind::Bill.column("bill_amount").unwrap();
        assert_eq!(
            FieldValue::parse(amount, "1250.5").unwrap(),
            FieldValue::Real(1250.5)
        );
        for raw in ["NaN", "inf", "-infinity"] {
            let err = FieldValue::parse(amount, raw).unwrap_err().to_string();
            assert!(err.contains("bill_amount expects a number"), "{}", err);
        }
    }

    #[test]
    fn test_empty_and_null_clear_the_field() {
        let rate = RecordKind::EmdRefund.column("interest_rate").unwrap();
        assert_eq!(FieldValue::parse(rate, "  ").unwrap(), FieldValue::Null);
        assert_eq!(FieldValue::parse(rate, "NULL").unwrap(), FieldValue::Null);
    }
}
