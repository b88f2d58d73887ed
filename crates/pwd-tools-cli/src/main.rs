mod commands;
mod logging;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{
    BillCommand, Category, Cli, Commands, DeductionArgs, EmdCommand, InterestArgs,
    ProjectCommand, RenderFormat, SettingCommand,
};
use dotenv::dotenv;
use pwd_tools_core::export::currency::format_inr;
use pwd_tools_core::export::reports::{EmdCertificate, ProjectReport, TableData};
use pwd_tools_core::import::write_emd_template;
use pwd_tools_core::storage::{
    BillRecord, Database, DeductionRecord, EmdRefundRecord, ProjectRecord, RecordKind,
};
use pwd_tools_core::{
    AppConfig, BillDraft, DeductionBreakdown, DeductionSpec, DelayReport, DepositInterest,
    Exporter,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match pwd_tools_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return Ok(());
    };

    let exporter = Exporter::detect();
    if let Err(err) = run(command, &config, &exporter) {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

fn run(command: Commands, config: &AppConfig, exporter: &Exporter) -> anyhow::Result<()> {
    match command {
        Commands::Tools { category } => show_tools(category, config),
        Commands::Interest(args) => {
            let calc = interest(&args, config);
            print_interest(&calc);
            Ok(())
        }
        Commands::Deductions { amount, deductions } => {
            let breakdown = DeductionBreakdown::compute(amount, &deduction_specs(&deductions, config));
            print_breakdown(&breakdown);
            Ok(())
        }
        Commands::Delay { scheduled, actual } => {
            let report = DelayReport::new(scheduled, actual);
            if report.is_delayed() {
                println!("Delay: {} days", report.delay_days.to_string().red());
            } else {
                println!(
                    "{} ({} days ahead of schedule)",
                    "On time".green(),
                    -report.variance_days
                );
            }
            Ok(())
        }
        Commands::StampDuty { amount } => {
            let duty = config.stamp_duty_table()?.duty(amount)?;
            println!("Amount: {}", format_inr(duty.amount));
            println!("Rate: {:.2}%", duty.rate);
            println!("Stamp Duty: {}", format_inr(duty.duty).green());
            Ok(())
        }
        Commands::Bill(cmd) => run_bill(cmd, config, exporter),
        Commands::Emd(cmd) => run_emd(cmd, config, exporter),
        Commands::SecurityRefund {
            bill_id,
            date,
            recoveries,
            output,
        } => security_refund(bill_id, date, recoveries, output, config, exporter),
        Commands::Project(cmd) => run_project(cmd, config, exporter),
        Commands::List { kind, limit } => {
            let db = open_db(config)?;
            let rows = match kind {
                RecordKind::Bill => to_values(db.list::<BillRecord>(limit)?)?,
                RecordKind::Deduction => to_values(db.list::<DeductionRecord>(limit)?)?,
                RecordKind::EmdRefund => to_values(db.list::<EmdRefundRecord>(limit)?)?,
                RecordKind::Project => to_values(db.list::<ProjectRecord>(limit)?)?,
            };
            print_rows(kind, &rows)
        }
        Commands::Search { kind, term } => {
            let db = open_db(config)?;
            let rows = match kind {
                RecordKind::Bill => to_values(db.search::<BillRecord>(&term)?)?,
                RecordKind::Deduction => to_values(db.search::<DeductionRecord>(&term)?)?,
                RecordKind::EmdRefund => to_values(db.search::<EmdRefundRecord>(&term)?)?,
                RecordKind::Project => to_values(db.search::<ProjectRecord>(&term)?)?,
            };
            print_rows(kind, &rows)
        }
        Commands::Update { kind, id, fields } => {
            let db = open_db(config)?;
            let updates = Database::parse_updates(kind, &fields)?;
            if db.update_record(kind, id, &updates)? {
                println!("Updated {} {}", kind, id);
            } else {
                println!("{}", format!("No {} with id {}", kind, id).yellow());
            }
            Ok(())
        }
        Commands::Delete { kind, id, yes } => {
            let confirmed = yes
                || prompt_confirm(
                    &format!("Are you SURE you want to delete {} {}?", kind, id),
                    Some(false),
                )?;
            if !confirmed {
                return Ok(());
            }
            let db = open_db(config)?;
            if db.delete_record(kind, id)? {
                println!("Deleted {} {}", kind, id);
            } else {
                println!("{}", format!("No {} with id {}", kind, id).yellow());
            }
            Ok(())
        }
        Commands::Stats => {
            let db = open_db(config)?;
            print_stats(&db)
        }
        Commands::Setting(SettingCommand::Get { key }) => {
            let db = open_db(config)?;
            match db.get_setting(&key)? {
                Some(value) => println!("{} = {}", key, value),
                None => println!("{}", format!("{} is not set", key).yellow()),
            }
            Ok(())
        }
        Commands::Setting(SettingCommand::Set { key, value }) => {
            let db = open_db(config)?;
            db.set_setting(&key, &value)?;
            println!("{} = {}", key, value);
            Ok(())
        }
        Commands::Backup { output } => {
            let db = open_db(config)?;
            let path = db.backup(output.as_deref())?;
            println!("Backup written to {}", path.display().to_string().green());
            Ok(())
        }
        Commands::ExportCsv { kind, output } => {
            let db = open_db(config)?;
            let path = db.export_table_csv(kind, output.as_deref(), Path::new(&config.export_dir))?;
            println!("Exported {} to {}", kind, path.display().to_string().green());
            Ok(())
        }
        Commands::ExportXlsx { kind, output } => export_xlsx(kind, output, config, exporter),
        Commands::ImportEmd { path, sheet } => {
            let db = open_db(config)?;
            let summary = db.import_emd_file(&path, sheet.as_deref())?;
            for w in &summary.warnings {
                println!("{} {}", "warning:".yellow(), w);
            }
            println!(
                "Imported {} EMD records ({} rows skipped)",
                summary.ids.len().to_string().green(),
                summary.skipped
            );
            Ok(())
        }
        Commands::EmdTemplate { output } => {
            let path = write_emd_template(&output)?;
            println!("Template written to {}", path.display());
            Ok(())
        }
        Commands::Seed => {
            let db = open_db(config)?;
            let ids = db.seed_sample_data()?;
            println!(
                "Inserted sample bill {}, EMD refund {} and project {}",
                ids.bill_id, ids.emd_id, ids.project_id
            );
            Ok(())
        }
        Commands::PrintConfig => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
    }
}

fn open_db(config: &AppConfig) -> anyhow::Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))
}

fn show_tools(category: Category, config: &AppConfig) -> anyhow::Result<()> {
    println!("{}", category.title().bold().blue());
    if category != Category::Dashboard {
        for (name, command) in category.tools() {
            println!("  {:<26} pwd-tools {}", name, command.cyan());
        }
        return Ok(());
    }

    for category in [Category::Financial, Category::Calculation, Category::Reports] {
        println!(
            "  {:<20} {} tools  (pwd-tools tools {})",
            category.title(),
            category.tools().len(),
            format!("{:?}", category).to_lowercase().cyan()
        );
    }
    println!();
    let db = open_db(config)?;
    print_stats(&db)
}

fn interest(args: &InterestArgs, config: &AppConfig) -> DepositInterest {
    let rate = args.rate.unwrap_or(config.default_interest_rate);
    DepositInterest::between(args.amount, rate, args.deposit, args.refund).rounded()
}

fn print_interest(calc: &DepositInterest) {
    println!("Principal: {}", format_inr(calc.principal));
    println!("Rate: {:.2}% per annum", calc.annual_rate);
    println!("Days Held: {}", calc.days_held);
    println!("Interest: {}", format_inr(calc.interest));
    println!("Refund Amount: {}", format_inr(calc.refund).green());
}

fn deduction_specs(args: &DeductionArgs, config: &AppConfig) -> Vec<DeductionSpec> {
    let mut specs = if args.presets {
        config.preset_deductions()
    } else {
        Vec::new()
    };
    specs.extend(args.deductions.iter().cloned());
    specs
}

fn print_breakdown(breakdown: &DeductionBreakdown) {
    println!("Base Amount: {}", format_inr(breakdown.base));
    for line in &breakdown.lines {
        println!(
            "  {:<24} {:>8}  {:>16}{}",
            line.deduction_type,
            line.rate_label(),
            format_inr(line.amount),
            if line.statutory { "  (statutory)" } else { "" }
        );
    }
    println!("Total Deductions: {}", format_inr(breakdown.total).red());
    println!("Net Payable: {}", format_inr(breakdown.net).green());
}

fn print_stats(db: &Database) -> anyhow::Result<()> {
    let stats = db.statistics()?;
    println!("Bills: {}", stats.total_bills.to_string().cyan());
    println!("Deductions: {}", stats.total_deductions.to_string().cyan());
    println!("EMD Refunds: {}", stats.total_emd_refunds.to_string().cyan());
    println!("Projects: {}", stats.total_projects.to_string().cyan());
    println!(
        "Active Bills Amount: {}",
        format_inr(stats.total_active_bills_amount).green()
    );
    println!("Total EMD Amount: {}", format_inr(stats.total_emd_amount).green());
    println!(
        "Active Projects Value: {}",
        format_inr(stats.total_active_projects_value).green()
    );
    Ok(())
}

fn to_values<T: Serialize>(rows: Vec<T>) -> serde_json::Result<Vec<Value>> {
    rows.iter().map(serde_json::to_value).collect()
}

fn print_rows(kind: RecordKind, rows: &[Value]) -> anyhow::Result<()> {
    println!("{} {}", rows.len().to_string().cyan(), kind);
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn run_bill(cmd: BillCommand, config: &AppConfig, exporter: &Exporter) -> anyhow::Result<()> {
    match cmd {
        BillCommand::Create {
            from,
            number,
            date,
            contractor,
            project,
            amount,
            deductions,
            render,
        } => {
            let mut draft: BillDraft = match &from {
                Some(path) => {
                    let raw = fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str(&raw)
                        .with_context(|| format!("parsing bill draft {}", path.display()))?
                }
                None => BillDraft::default(),
            };
            if let Some(number) = number {
                draft.bill_number = number;
            }
            if date.is_some() {
                draft.bill_date = date;
            }
            if contractor.is_some() {
                draft.contractor_name = contractor;
            }
            if project.is_some() {
                draft.project_name = project;
            }
            if amount.is_some() {
                draft.bill_amount = amount;
            }
            let mut specs = deduction_specs(&deductions, config);
            specs.append(&mut draft.deductions);
            draft.deductions = specs;

            if draft.bill_number.trim().is_empty() {
                bail!("a bill number is required (--number or bill_number in --from)");
            }

            let db = open_db(config)?;
            let id = db.save_bill_draft(&draft)?;
            let summary = draft.summary();
            println!("Saved bill {} as id {}", draft.bill_number, id.to_string().green());
            print_breakdown(&summary.deductions);

            if let Some(format) = render {
                let path = render_bill(&draft, format, None, config, exporter)?;
                println!("Rendered to {}", path.display().to_string().green());
            }
            Ok(())
        }
        BillCommand::Show { id } => {
            let db = open_db(config)?;
            let (bill, deductions) = db.bill_with_deductions(id)?;
            let draft = BillDraft::from_stored(&bill, &deductions);
            println!("{}", serde_json::to_string_pretty(&bill)?);
            print_breakdown(&draft.summary().deductions);
            Ok(())
        }
        BillCommand::Render { id, format, output } => {
            let db = open_db(config)?;
            let (bill, deductions) = db.bill_with_deductions(id)?;
            let draft = BillDraft::from_stored(&bill, &deductions);
            let path = render_bill(&draft, format, output, config, exporter)?;
            println!("Rendered to {}", path.display().to_string().green());
            Ok(())
        }
    }
}

fn run_emd(cmd: EmdCommand, config: &AppConfig, exporter: &Exporter) -> anyhow::Result<()> {
    match cmd {
        EmdCommand::Save {
            tender,
            contractor,
            interest: args,
            status,
        } => {
            let calc = interest(&args, config);
            let mut record = EmdRefundRecord::new(&tender);
            record.contractor_name = contractor;
            record.emd_amount = Some(args.amount);
            record.deposit_date = Some(args.deposit);
            record.refund_date = Some(args.refund);
            record.interest_rate = Some(calc.annual_rate);
            record.refund_amount = Some(calc.refund);
            record.status = status;

            let db = open_db(config)?;
            let id = db.save_emd_refund(&record)?;
            print_interest(&calc);
            println!("Saved EMD refund {} as id {}", tender, id.to_string().green());
            Ok(())
        }
        EmdCommand::Certificate { id, output } => {
            let db = open_db(config)?;
            let stored = db
                .get::<EmdRefundRecord>(id)?
                .with_context(|| format!("no EMD refund with id {}", id))?;
            let cert = EmdCertificate::from_record(&stored.record)?;
            let (bytes, ext) = match exporter.emd_certificate(&cert)?.into_bytes() {
                Some(bytes) => (bytes, "pdf"),
                None => {
                    warn!("PDF export unavailable, writing a text certificate");
                    (exporter.emd_text(&cert).into_bytes(), "txt")
                }
            };
            let path = output_path(
                output,
                config,
                &format!("EMD_Refund_{}", file_stem(&cert.tender_number)),
                ext,
            );
            write_output(&path, &bytes)?;
            println!("Certificate written to {}", path.display().to_string().green());
            Ok(())
        }
    }
}

fn security_refund(
    bill_id: i64,
    date: Option<NaiveDate>,
    recoveries: f64,
    output: Option<PathBuf>,
    config: &AppConfig,
    exporter: &Exporter,
) -> anyhow::Result<()> {
    let db = open_db(config)?;
    let on = date.unwrap_or_else(|| Local::now().date_naive());
    let refund = db.security_refund(bill_id, on)?.with_recoveries(recoveries)?;

    println!("Bill: {}", refund.bill.bill_number);
    println!("Total Held: {}", format_inr(refund.total_held()));
    println!("Recoveries: {}", format_inr(refund.recoveries));
    println!("Amount Refundable: {}", format_inr(refund.refund_amount()).green());

    let (bytes, ext) = match exporter.security_refund(&refund)?.into_bytes() {
        Some(bytes) => (bytes, "pdf"),
        None => {
            warn!("PDF export unavailable, writing a text refund note");
            (exporter.security_refund_text(&refund).into_bytes(), "txt")
        }
    };
    let path = output_path(
        output,
        config,
        &format!("Security_Refund_{}", file_stem(&refund.bill.bill_number)),
        ext,
    );
    write_output(&path, &bytes)?;
    println!("Refund note written to {}", path.display().to_string().green());
    Ok(())
}

fn run_project(cmd: ProjectCommand, config: &AppConfig, exporter: &Exporter) -> anyhow::Result<()> {
    match cmd {
        ProjectCommand::Save {
            name,
            code,
            contractor,
            agreement,
            start,
            completion,
            status,
        } => {
            let mut record = ProjectRecord::new(&name);
            record.project_code = code;
            record.contractor_name = contractor;
            record.agreement_amount = agreement;
            record.start_date = start;
            record.completion_date = completion;
            record.status = status;

            let db = open_db(config)?;
            let id = db.save_project(&record)?;
            println!("Saved project {} as id {}", name, id.to_string().green());
            Ok(())
        }
        ProjectCommand::Report {
            id,
            work_done,
            payments,
            physical,
            output,
        } => {
            let db = open_db(config)?;
            let stored = db
                .get::<ProjectRecord>(id)?
                .with_context(|| format!("no project with id {}", id))?;
            let mut report = ProjectReport::new(stored.record, work_done, payments);
            if let Some(physical) = physical {
                report = report.with_progress(physical, Local::now().date_naive());
            }
            let (bytes, ext) = match exporter.project_report(&report)?.into_bytes() {
                Some(bytes) => (bytes, "pdf"),
                None => {
                    warn!("PDF export unavailable, writing a text report");
                    (exporter.project_text(&report).into_bytes(), "txt")
                }
            };
            let path = output_path(
                output,
                config,
                &format!("Project_Report_{}", file_stem(&report.project.project_name)),
                ext,
            );
            write_output(&path, &bytes)?;
            println!("Report written to {}", path.display().to_string().green());
            Ok(())
        }
    }
}

fn render_bill(
    draft: &BillDraft,
    format: RenderFormat,
    output: Option<PathBuf>,
    config: &AppConfig,
    exporter: &Exporter,
) -> anyhow::Result<PathBuf> {
    let rendered = match format {
        RenderFormat::Xlsx => exporter.bill_workbook(draft)?.into_bytes(),
        RenderFormat::Pdf => exporter.bill_document(draft)?.into_bytes(),
        RenderFormat::Txt => None,
    };
    let (bytes, ext) = match rendered {
        Some(bytes) => (bytes, format.extension()),
        None => {
            if format != RenderFormat::Txt {
                warn!("{} export unavailable, writing a text bill", format.extension());
            }
            (exporter.bill_text(draft).into_bytes(), "txt")
        }
    };
    let path = output_path(
        output,
        config,
        &format!("PWD_Bill_{}", file_stem(&draft.bill_number)),
        ext,
    );
    write_output(&path, &bytes)?;
    Ok(path)
}

fn export_xlsx(
    kind: RecordKind,
    output: Option<PathBuf>,
    config: &AppConfig,
    exporter: &Exporter,
) -> anyhow::Result<()> {
    let db = open_db(config)?;
    if !exporter.capabilities().workbook() {
        warn!("Workbook export unavailable, exporting CSV instead");
        let output = output.map(|p| p.with_extension("csv"));
        let path = db.export_table_csv(kind, output.as_deref(), Path::new(&config.export_dir))?;
        println!("Exported {} to {}", kind, path.display().to_string().green());
        return Ok(());
    }

    let table = match kind {
        RecordKind::Bill => TableData::from_records(&db.list::<BillRecord>(None)?)?,
        RecordKind::Deduction => TableData::from_records(&db.list::<DeductionRecord>(None)?)?,
        RecordKind::EmdRefund => TableData::from_records(&db.list::<EmdRefundRecord>(None)?)?,
        RecordKind::Project => TableData::from_records(&db.list::<ProjectRecord>(None)?)?,
    };
    let title = format!("PWD {} Report", kind.table().replace('_', " ").to_uppercase());
    let Some(bytes) = exporter.table_workbook(&title, &table)?.into_bytes() else {
        bail!("workbook export unavailable");
    };
    let path = output_path(output, config, &format!("{}_report", kind.table()), "xlsx");
    write_output(&path, &bytes)?;
    info!("Exported {} {} rows", table.rows.len(), kind);
    println!("Exported {} to {}", kind, path.display().to_string().green());
    Ok(())
}

/// Keep letters, digits, `-` and `_`; bill and tender numbers carry `/`.
fn file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

fn output_path(output: Option<PathBuf>, config: &AppConfig, stem: &str, ext: &str) -> PathBuf {
    match output {
        Some(path) => path.with_extension(ext),
        None => Path::new(&config.export_dir).join(format!(
            "{}_{}.{}",
            stem,
            Local::now().format("%Y%m%d_%H%M%S"),
            ext
        )),
    }
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
