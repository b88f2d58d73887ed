pub mod models;
pub mod queries;
pub mod sample;
pub mod sqlite;

pub use models::{
    BillRecord, DeductionRecord, EmdRefundRecord, FieldValue, LedgerStats, ProjectRecord,
    Record, RecordKind, Stored,
};
pub use sqlite::Database;
