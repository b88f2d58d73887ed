use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;

use pwd_tools_core::storage::models::*;
use pwd_tools_core::storage::Database;
use pwd_tools_core::{BillDraft, DeductionSpec, Error};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn make_bill(number: &str, contractor: &str, amount: f64) -> BillDraft {
    BillDraft {
        bill_number: number.to_string(),
        bill_date: Some(date("2024-01-15")),
        contractor_name: Some(contractor.to_string()),
        project_name: Some("Road Construction Project".to_string()),
        bill_amount: Some(amount),
        deductions: vec![
            DeductionSpec::fixed("Income Tax", 5_000.0, true),
            DeductionSpec::percent("Security Deposit", 5.0, false),
        ],
        ..Default::default()
    }
}

#[test]
fn test_save_bill_with_deductions() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .save_bill_draft(&make_bill("B001/2024", "ABC Construction", 500_000.0))
        .unwrap();
    assert!(id > 0);

    let (bill, deductions) = db.bill_with_deductions(id).unwrap();
    assert_eq!(bill.record.bill_number, "B001/2024");
    assert_eq!(bill.record.bill_date, Some(date("2024-01-15")));
    assert_eq!(bill.record.bill_amount, Some(500_000.0));
    assert_eq!(bill.record.status, "Active");
    assert!(!bill.created_at.is_empty());

    assert_eq!(deductions.len(), 2);
    assert_eq!(deductions[0].record.deduction_type, "Income Tax");
    assert_eq!(deductions[0].record.amount, 5_000.0);
    assert!(deductions[0].record.is_statutory);
    assert_eq!(deductions[1].record.amount, 25_000.0);
    assert_eq!(deductions[1].record.rate, 5.0);
    assert!(deductions.iter().all(|d| d.record.bill_id == id));
}

#[test]
fn test_saved_fields_round_trip() {
    let db = Database::open_in_memory().unwrap();

    let mut emd = EmdRefundRecord::new("T001/2024");
    emd.contractor_name = Some("XYZ Builders".to_string());
    emd.emd_amount = Some(50_000.0);
    emd.deposit_date = Some(date("2024-01-10"));
    emd.refund_date = Some(date("2024-02-10"));
    emd.interest_rate = Some(6.0);
    emd.refund_amount = Some(50_254.79);
    db.save_emd_refund(&emd).unwrap();

    let mut project = ProjectRecord::new("Bridge Construction");
    project.project_code = Some("PWD/BRG/001".to_string());
    project.agreement_amount = Some(2_000_000.0);
    project.start_date = Some(date("2024-01-01"));
    db.save_project(&project).unwrap();

    let emds = db.list::<EmdRefundRecord>(None).unwrap();
    assert_eq!(emds.len(), 1);
    assert_eq!(emds[0].record, emd);

    let projects = db.list::<ProjectRecord>(None).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].record, project);
    assert_eq!(projects[0].record.completion_date, None);
}

#[test]
fn test_list_newest_first_with_limit() {
    let db = Database::open_in_memory().unwrap();
    for n in 1..=5 {
        db.save_emd_refund(&EmdRefundRecord::new(&format!("T{:03}", n)))
            .unwrap();
    }

    let all = db.list::<EmdRefundRecord>(None).unwrap();
    let tenders: Vec<&str> = all.iter().map(|r| r.record.tender_number.as_str()).collect();
    assert_eq!(tenders, vec!["T005", "T004", "T003", "T002", "T001"]);

    let limited = db.list::<EmdRefundRecord>(Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].record.tender_number, "T005");
}

#[test]
fn test_search_is_case_sensitive_substring() {
    let db = Database::open_in_memory().unwrap();
    db.save_bill_draft(&make_bill("B001", "ABC Construction", 100.0))
        .unwrap();
    db.save_bill_draft(&make_bill("B002", "abc traders", 100.0))
        .unwrap();
    db.save_bill_draft(&make_bill("B003", "XYZ Builders", 100.0))
        .unwrap();

    let hits = db.search::<BillRecord>("ABC").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.bill_number, "B001");

    // Search spans bill_number as well as names.
    let hits = db.search::<BillRecord>("B00").unwrap();
    assert_eq!(hits.len(), 3);

    // LIKE wildcards are matched literally.
    assert!(db.search::<BillRecord>("%").unwrap().is_empty());
    assert!(db.search::<DeductionRecord>("Income").unwrap().is_empty());
}

#[test]
fn test_update_record_fields() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .save_bill_draft(&make_bill("B001", "ABC Construction", 100.0))
        .unwrap();

    let updates = Database::parse_updates(
        RecordKind::Bill,
        &[
            ("status".to_string(), "Paid".to_string()),
            ("bill_amount".to_string(), "250.5".to_string()),
            ("project_name".to_string(), "".to_string()),
        ],
    )
    .unwrap();
    assert!(db.update_record(RecordKind::Bill, id, &updates).unwrap());

    let bill = db.get_bill(id).unwrap().unwrap();
    assert_eq!(bill.record.status, "Paid");
    assert_eq!(bill.record.bill_amount, Some(250.5));
    assert_eq!(bill.record.project_name, None);

    assert!(!db.update_record(RecordKind::Bill, id + 100, &updates).unwrap());
}

#[test]
fn test_update_rejects_unknown_and_empty_fields() {
    let db = Database::open_in_memory().unwrap();
    let id = db.save_project(&ProjectRecord::new("Bridge")).unwrap();

    let err = Database::parse_updates(
        RecordKind::Project,
        &[("bill_number".to_string(), "x".to_string())],
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnknownField { .. }));

    let mut updates = std::collections::BTreeMap::new();
    updates.insert("id; DROP TABLE projects".to_string(), FieldValue::Integer(1));
    assert!(matches!(
        db.update_record(RecordKind::Project, id, &updates),
        Err(Error::UnknownField { .. })
    ));

    let empty = std::collections::BTreeMap::new();
    assert!(matches!(
        db.update_record(RecordKind::Project, id, &empty),
        Err(Error::Validation(_))
    ));

    let err = Database::parse_updates(
        RecordKind::Project,
        &[("start_date".to_string(), "01-13-2024".to_string())],
    )
    .unwrap_err();
    assert!(err.to_string().contains("start_date"));
    assert_eq!(db.count(RecordKind::Project).unwrap(), 1);
}

#[test]
fn test_update_rejects_non_finite_amounts() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .save_bill_draft(&make_bill("B001", "ABC Construction", 100.0))
        .unwrap();

    for raw in ["NaN", "inf", "-infinity"] {
        let err = Database::parse_updates(
            RecordKind::Bill,
            &[("bill_amount".to_string(), raw.to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("bill_amount"));
    }

    let bill = db.get_bill(id).unwrap().unwrap();
    assert_eq!(bill.record.bill_amount, Some(100.0));
}

#[test]
fn test_delete_bill_keeps_deductions() {
    let db = Database::open_in_memory().unwrap();
    let id = db
        .save_bill_draft(&make_bill("B001", "ABC Construction", 500_000.0))
        .unwrap();

    assert!(db.delete_record(RecordKind::Bill, id).unwrap());
    assert!(!db.delete_record(RecordKind::Bill, id).unwrap());
    assert!(db.get_bill(id).unwrap().is_none());
    assert_eq!(db.get_deductions_for_bill(id).unwrap().len(), 2);
    assert!(matches!(
        db.bill_with_deductions(id),
        Err(Error::BillNotFound(_))
    ));
}

#[test]
fn test_save_deduction_requires_bill() {
    let db = Database::open_in_memory().unwrap();
    let deduction = DeductionRecord {
        bill_id: 42,
        deduction_type: "Labour Cess".to_string(),
        amount: 1_000.0,
        rate: 1.0,
        is_statutory: true,
    };
    assert!(matches!(
        db.save_deduction(&deduction),
        Err(Error::BillNotFound(42))
    ));

    let bill_id = db.save_bill(&BillRecord::new("B1"), &[]).unwrap();
    let deduction = DeductionRecord { bill_id, ..deduction };
    let id = db.save_deduction(&deduction).unwrap();
    assert!(id > 0);
    assert_eq!(db.get_deductions_for_bill(bill_id).unwrap()[0].record, deduction);
}

#[test]
fn test_statistics() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.statistics().unwrap(), LedgerStats::default());

    db.save_bill_draft(&make_bill("B1", "A", 100_000.0)).unwrap();
    let mut paid = make_bill("B2", "B", 50_000.0);
    paid.status = Some("Paid".to_string());
    db.save_bill_draft(&paid).unwrap();

    let mut emd = EmdRefundRecord::new("T1");
    emd.emd_amount = Some(10_000.0);
    db.save_emd_refund(&emd).unwrap();

    let mut project = ProjectRecord::new("P1");
    project.agreement_amount = Some(1_000_000.0);
    db.save_project(&project).unwrap();

    let stats = db.statistics().unwrap();
    assert_eq!(stats.total_bills, 2);
    assert_eq!(stats.total_deductions, 4);
    assert_eq!(stats.total_emd_refunds, 1);
    assert_eq!(stats.total_projects, 1);
    assert_eq!(stats.total_active_bills_amount, 100_000.0);
    assert_eq!(stats.total_emd_amount, 10_000.0);
    assert_eq!(stats.total_active_projects_value, 1_000_000.0);
}

#[test]
fn test_settings_upsert() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get_setting("default_interest_rate").unwrap(), None);
    db.set_setting("default_interest_rate", "6.0").unwrap();
    db.set_setting("default_interest_rate", "7.5").unwrap();
    assert_eq!(
        db.get_setting("default_interest_rate").unwrap().as_deref(),
        Some("7.5")
    );
}

#[test]
fn test_seed_sample_data() {
    let db = Database::open_in_memory().unwrap();
    let ids = db.seed_sample_data().unwrap();

    let (bill, deductions) = db.bill_with_deductions(ids.bill_id).unwrap();
    assert_eq!(bill.record.bill_number, "B001/2024");
    let total: f64 = deductions.iter().map(|d| d.record.amount).sum();
    assert_eq!(total, 30_000.0);

    let emds = db.search::<EmdRefundRecord>("XYZ").unwrap();
    assert_eq!(emds.len(), 1);
    assert_eq!(emds[0].id, ids.emd_id);
    // 31 days at 6% on 50,000.
    assert_eq!(emds[0].record.refund_amount, Some(50_254.79));

    let projects = db.search::<ProjectRecord>("PWD/BRG").unwrap();
    assert_eq!(projects[0].id, ids.project_id);
}

#[test]
fn test_file_database_persists_and_backs_up() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    {
        let db = Database::open(&path).unwrap();
        db.seed_sample_data().unwrap();
        let backup = db.backup(Some(dir.path().join("copy.db").as_path())).unwrap();
        assert!(backup.exists());
    }

    let reopened = Database::open(&path).unwrap();
    assert_eq!(reopened.count(RecordKind::Bill).unwrap(), 1);

    let copy = Database::open(dir.path().join("copy.db")).unwrap();
    assert_eq!(copy.count(RecordKind::Project).unwrap(), 1);
}

#[test]
fn test_export_table_csv() {
    let dir = tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    db.seed_sample_data().unwrap();

    let path = db
        .export_table_csv(RecordKind::Deduction, None, dir.path())
        .unwrap();
    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("deductions_export_"));

    let content = fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("id,bill_id,deduction_type,amount,rate,is_statutory,created_at")
    );
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_record_kind_parsing() {
    assert_eq!("bills".parse::<RecordKind>().unwrap(), RecordKind::Bill);
    assert_eq!("EMD".parse::<RecordKind>().unwrap(), RecordKind::EmdRefund);
    assert_eq!(
        "emd-refunds".parse::<RecordKind>().unwrap(),
        RecordKind::EmdRefund
    );
    assert!(matches!(
        "invoices".parse::<RecordKind>(),
        Err(Error::UnknownKind(_))
    ));
}
