use super::models::*;
use super::sqlite::Database;
use crate::compute::bill::BillDraft;
use crate::compute::deductions::DeductionLine;
use crate::error::Error;
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::{params, params_from_iter};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, Error>;

impl Database {
    // ── Bills & Deductions ──────────────────────────────────────

    /// Insert a bill and its deductions in one transaction.
    pub fn save_bill(&self, bill: &BillRecord, deductions: &[DeductionLine]) -> Result<i64> {
        let tx = self.connection().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO bills (bill_number, bill_date, contractor_name, project_name, \
             bill_amount, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bill.bill_number,
                bill.bill_date,
                bill.contractor_name,
                bill.project_name,
                bill.bill_amount,
                bill.status,
            ],
        )?;
        let bill_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO deductions (bill_id, deduction_type, amount, rate, is_statutory) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for line in deductions {
                stmt.execute(params![
                    bill_id,
                    line.deduction_type,
                    line.amount,
                    line.rate,
                    line.statutory,
                ])?;
            }
        }
        tx.commit()?;
        debug!(
            "Saved bill {} ({}) with {} deductions",
            bill_id,
            bill.bill_number,
            deductions.len()
        );
        Ok(bill_id)
    }

    /// Compute a draft's deductions against its gross amount and store both.
    pub fn save_bill_draft(&self, draft: &BillDraft) -> Result<i64> {
        let summary = draft.summary();
        self.save_bill(&draft.to_record(), &summary.deductions.lines)
    }

    /// Insert a single deduction. The owning bill must exist.
    pub fn save_deduction(&self, deduction: &DeductionRecord) -> Result<i64> {
        if !self.bill_exists(deduction.bill_id)? {
            return Err(Error::BillNotFound(deduction.bill_id));
        }
        self.connection().execute(
            "INSERT INTO deductions (bill_id, deduction_type, amount, rate, is_statutory) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                deduction.bill_id,
                deduction.deduction_type,
                deduction.amount,
                deduction.rate,
                deduction.is_statutory,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Saved deduction {} for bill {}", id, deduction.bill_id);
        Ok(id)
    }

    pub fn bill_exists(&self, bill_id: i64) -> Result<bool> {
        let count: i64 = self.connection().query_row(
            "SELECT COUNT(*) FROM bills WHERE id = ?1",
            params![bill_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_bill(&self, bill_id: i64) -> Result<Option<Stored<BillRecord>>> {
        self.get::<BillRecord>(bill_id)
    }

    pub fn get_deductions_for_bill(&self, bill_id: i64) -> Result<Vec<Stored<DeductionRecord>>> {
        let sql = format!(
            "SELECT {} FROM deductions WHERE bill_id = ?1 ORDER BY id",
            RecordKind::Deduction.select_list()
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params![bill_id], stored_from_row::<DeductionRecord>)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// A bill and the deductions recorded against it.
    pub fn bill_with_deductions(
        &self,
        bill_id: i64,
    ) -> Result<(Stored<BillRecord>, Vec<Stored<DeductionRecord>>)> {
        let bill = self.get_bill(bill_id)?.ok_or(Error::BillNotFound(bill_id))?;
        let deductions = self.get_deductions_for_bill(bill_id)?;
        Ok((bill, deductions))
    }

    // ── EMD Refunds & Projects ──────────────────────────────────

    pub fn save_emd_refund(&self, emd: &EmdRefundRecord) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO emd_refunds (tender_number, contractor_name, emd_amount, deposit_date, \
             refund_date, interest_rate, refund_amount, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                emd.tender_number,
                emd.contractor_name,
                emd.emd_amount,
                emd.deposit_date,
                emd.refund_date,
                emd.interest_rate,
                emd.refund_amount,
                emd.status,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Saved EMD refund {} ({})", id, emd.tender_number);
        Ok(id)
    }

    /// Insert many EMD rows atomically; either all are written or none.
    pub fn save_emd_refunds(&self, rows: &[EmdRefundRecord]) -> Result<Vec<i64>> {
        let tx = self.connection().unchecked_transaction()?;
        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO emd_refunds (tender_number, contractor_name, emd_amount, \
                 deposit_date, refund_date, interest_rate, refund_amount, status) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for emd in rows {
                stmt.execute(params![
                    emd.tender_number,
                    emd.contractor_name,
                    emd.emd_amount,
                    emd.deposit_date,
                    emd.refund_date,
                    emd.interest_rate,
                    emd.refund_amount,
                    emd.status,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        debug!("Saved {} EMD refunds", ids.len());
        Ok(ids)
    }

    pub fn save_project(&self, project: &ProjectRecord) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO projects (project_name, project_code, contractor_name, \
             agreement_amount, start_date, completion_date, status) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.project_name,
                project.project_code,
                project.contractor_name,
                project.agreement_amount,
                project.start_date,
                project.completion_date,
                project.status,
            ],
        )?;
        let id = self.connection().last_insert_rowid();
        debug!("Saved project {} ({})", id, project.project_name);
        Ok(id)
    }

    // ── Generic queries ─────────────────────────────────────────

    /// One record by id.
    pub fn get<R: Record>(&self, id: i64) -> Result<Option<Stored<R>>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            R::KIND.select_list(),
            R::KIND.table()
        );
        match self
            .connection()
            .query_row(&sql, params![id], stored_from_row::<R>)
        {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Records of one kind, newest first. `None` returns every row.
    pub fn list<R: Record>(&self, limit: Option<i64>) -> Result<Vec<Stored<R>>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY created_at DESC, id DESC LIMIT ?1",
            R::KIND.select_list(),
            R::KIND.table()
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params![limit.unwrap_or(-1)], stored_from_row::<R>)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Case-sensitive substring match ORed across the kind's search columns.
    /// A kind without search columns yields no rows.
    pub fn search<R: Record>(&self, term: &str) -> Result<Vec<Stored<R>>> {
        let columns = R::KIND.search_columns();
        if columns.is_empty() {
            return Ok(Vec::new());
        }
        let where_clause = columns
            .iter()
            .map(|c| format!("instr({}, ?1) > 0", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY created_at DESC, id DESC",
            R::KIND.select_list(),
            R::KIND.table(),
            where_clause
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt
            .query_map(params![term], stored_from_row::<R>)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Search '{}' in {} matched {} rows", term, R::KIND, rows.len());
        Ok(rows)
    }

    /// Replace the given fields of one row. Returns whether a row changed.
    pub fn update_record(
        &self,
        kind: RecordKind,
        id: i64,
        updates: &BTreeMap<String, FieldValue>,
    ) -> Result<bool> {
        if updates.is_empty() {
            return Err(Error::Validation("no fields to update".to_string()));
        }
        for field in updates.keys() {
            if kind.column(field).is_none() {
                return Err(Error::UnknownField {
                    kind: kind.table(),
                    field: field.clone(),
                });
            }
        }

        let set_clause = updates
            .keys()
            .enumerate()
            .map(|(i, field)| format!("{} = ?{}", field, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            kind.table(),
            set_clause,
            updates.len() + 1
        );
        let mut values: Vec<&dyn ToSql> = updates.values().map(|v| v as &dyn ToSql).collect();
        values.push(&id);
        let changed = self.connection().execute(&sql, params_from_iter(values))?;
        debug!("Updated {} row {} ({} fields)", kind, id, updates.len());
        Ok(changed > 0)
    }

    /// Parse `field=value` text pairs against the kind's column types.
    pub fn parse_updates(
        kind: RecordKind,
        pairs: &[(String, String)],
    ) -> Result<BTreeMap<String, FieldValue>> {
        let mut updates = BTreeMap::new();
        for (field, raw) in pairs {
            let column = kind.column(field).ok_or_else(|| Error::UnknownField {
                kind: kind.table(),
                field: field.clone(),
            })?;
            updates.insert(field.clone(), FieldValue::parse(column, raw)?);
        }
        Ok(updates)
    }

    /// Delete one row by id. Deleting a bill leaves its deductions in place.
    pub fn delete_record(&self, kind: RecordKind, id: i64) -> Result<bool> {
        let changed = self.connection().execute(
            &format!("DELETE FROM {} WHERE id = ?1", kind.table()),
            params![id],
        )?;
        debug!("Deleted {} row {}: {}", kind, id, changed > 0);
        Ok(changed > 0)
    }

    pub fn count(&self, kind: RecordKind) -> Result<i64> {
        Ok(self.connection().query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?)
    }

    fn sum(&self, sql: &str) -> Result<f64> {
        Ok(self
            .connection()
            .query_row(sql, [], |row| row.get::<_, Option<f64>>(0))?
            .unwrap_or(0.0))
    }

    pub fn statistics(&self) -> Result<LedgerStats> {
        Ok(LedgerStats {
            total_bills: self.count(RecordKind::Bill)?,
            total_emd_refunds: self.count(RecordKind::EmdRefund)?,
            total_projects: self.count(RecordKind::Project)?,
            total_deductions: self.count(RecordKind::Deduction)?,
            total_active_bills_amount: self
                .sum("SELECT SUM(bill_amount) FROM bills WHERE status = 'Active'")?,
            total_emd_amount: self.sum("SELECT SUM(emd_amount) FROM emd_refunds")?,
            total_active_projects_value: self
                .sum("SELECT SUM(agreement_amount) FROM projects WHERE status = 'Active'")?,
        })
    }

    // ── Settings ────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        match self.connection().query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.connection().execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             updated_at = CURRENT_TIMESTAMP",
            params![key, value],
        )?;
        Ok(())
    }

    // ── Export ──────────────────────────────────────────────────

    /// Dump every column of one table to CSV. Without a path the file is
    /// named `<table>_export_<timestamp>.csv` in `dir`.
    pub fn export_table_csv(
        &self,
        kind: RecordKind,
        path: Option<&Path>,
        dir: &Path,
    ) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => dir.join(format!(
                "{}_export_{}.csv",
                kind.table(),
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )),
        };

        let mut stmt = self
            .connection()
            .prepare(&format!("SELECT * FROM {} ORDER BY id", kind.table()))?;
        let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&headers)?;

        let mut rows = stmt.query([])?;
        let mut count = 0usize;
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(headers.len());
            for i in 0..headers.len() {
                fields.push(match row.get_ref(i)? {
                    ValueRef::Null => String::new(),
                    ValueRef::Integer(v) => v.to_string(),
                    ValueRef::Real(v) => v.to_string(),
                    ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
                    ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
                });
            }
            writer.write_record(&fields)?;
            count += 1;
        }
        writer.flush()?;
        info!("Exported {} rows from {} to {}", count, kind, path.display());
        Ok(path)
    }
}
