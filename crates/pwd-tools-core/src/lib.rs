pub mod compute;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod storage;

pub use compute::bill::{BillDraft, BillItem, BillSummary};
pub use compute::deductions::{DeductionBreakdown, DeductionLine, DeductionSpec};
pub use compute::delay::DelayReport;
pub use compute::interest::DepositInterest;
pub use compute::stamp_duty::{Bracket, StampDuty, StampDutyTable};
pub use config::AppConfig;
pub use error::Error;
pub use export::{ExportCapabilities, Exporter, RenderOutcome};
pub use storage::Database;
