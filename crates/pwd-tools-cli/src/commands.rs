use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pwd_tools_core::storage::RecordKind;
use pwd_tools_core::DeductionSpec;

#[derive(Debug, Parser)]
#[command(name = "pwd-tools")]
#[command(about = "Public Works Department financial tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the tools of one category, or the dashboard
    Tools {
        #[arg(value_enum, default_value_t = Category::Dashboard)]
        category: Category,
    },
    /// Interest and refund on a deposit held between two dates
    Interest(InterestArgs),
    /// Break a base amount into deductions and net payable
    Deductions {
        #[arg(long)]
        amount: f64,
        #[command(flatten)]
        deductions: DeductionArgs,
    },
    /// Days between scheduled and actual completion
    Delay {
        #[arg(long)]
        scheduled: NaiveDate,
        #[arg(long)]
        actual: NaiveDate,
    },
    /// Stamp duty on an amount using the configured brackets
    StampDuty {
        #[arg(long)]
        amount: f64,
    },
    /// Prepare, inspect and render bills
    #[command(subcommand)]
    Bill(BillCommand),
    /// Save EMD refunds and print refund certificates
    #[command(subcommand)]
    Emd(EmdCommand),
    /// Release the security deposit held against a stored bill
    SecurityRefund {
        bill_id: i64,
        /// Refund date; today by default
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Amount recovered from the deposit before release
        #[arg(long, default_value_t = 0.0)]
        recoveries: f64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Save projects and print financial reports
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Most recent records of one kind
    List {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Case-sensitive substring search over one kind
    Search {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        term: String,
    },
    /// Replace fields of one record, given as field=value
    Update {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        id: i64,
        #[arg(required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    /// Delete one record by id
    Delete {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Record counts and totals
    Stats,
    /// Read or write a stored setting
    #[command(subcommand)]
    Setting(SettingCommand),
    /// Copy the database file
    Backup {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Dump one table to CSV
    ExportCsv {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Formatted spreadsheet report of one table
    ExportXlsx {
        #[arg(value_parser = parse_kind)]
        kind: RecordKind,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import EMD deposits from a CSV file or Excel workbook
    ImportEmd {
        path: PathBuf,
        /// Workbook sheet to read; the first sheet by default
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Write a sample EMD import file; a .xlsx name writes a workbook
    EmdTemplate {
        #[arg(long, default_value = "emd_template.csv")]
        output: PathBuf,
    },
    /// Insert sample records
    Seed,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Category {
    Financial,
    Calculation,
    Reports,
    Dashboard,
}

impl Category {
    pub fn title(self) -> &'static str {
        match self {
            Category::Financial => "Financial Tools",
            Category::Calculation => "Calculation Tools",
            Category::Reports => "Report Tools",
            Category::Dashboard => "Dashboard",
        }
    }

    /// Tool name and the command that runs it.
    pub fn tools(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Category::Financial => &[
                ("Bill Note Sheet", "bill create"),
                ("EMD Refund", "emd save"),
                ("Security Refund", "security-refund"),
                ("Financial Progress", "project report"),
            ],
            Category::Calculation => &[
                ("Delay Calculator", "delay"),
                ("Stamp Duty Calculator", "stamp-duty"),
                ("Deductions Table", "deductions"),
                ("Interest Calculator", "interest"),
                ("EMD Import", "import-emd"),
            ],
            Category::Reports => &[
                ("Bill Generator", "bill render"),
                ("EMD Refund Certificate", "emd certificate"),
                ("Table Export", "export-xlsx"),
            ],
            Category::Dashboard => &[],
        }
    }
}

#[derive(Debug, Args)]
pub struct InterestArgs {
    #[arg(long)]
    pub amount: f64,
    /// Annual rate in percent; defaults to the configured rate
    #[arg(long)]
    pub rate: Option<f64>,
    #[arg(long)]
    pub deposit: NaiveDate,
    #[arg(long)]
    pub refund: NaiveDate,
}

#[derive(Debug, Args)]
pub struct DeductionArgs {
    /// `Type=RATE%` or `Type=AMOUNT`, with `:s` for statutory
    #[arg(short = 'd', long = "deduction", value_parser = parse_deduction)]
    pub deductions: Vec<DeductionSpec>,
    /// Add the configured deduction presets
    #[arg(long)]
    pub presets: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Xlsx,
    Pdf,
    Txt,
}

impl RenderFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RenderFormat::Xlsx => "xlsx",
            RenderFormat::Pdf => "pdf",
            RenderFormat::Txt => "txt",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum BillCommand {
    /// Compute a bill and save it with its deductions
    Create {
        /// JSON bill draft; flags below override its fields
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long)]
        number: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        contractor: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[command(flatten)]
        deductions: DeductionArgs,
        /// Also render the saved bill in this format
        #[arg(long, value_enum)]
        render: Option<RenderFormat>,
    },
    /// Print a stored bill and its deductions
    Show { id: i64 },
    /// Render a stored bill to a file
    Render {
        id: i64,
        #[arg(long, value_enum, default_value_t = RenderFormat::Pdf)]
        format: RenderFormat,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum EmdCommand {
    /// Compute the refund for a deposit and save it
    Save {
        #[arg(long)]
        tender: String,
        #[arg(long)]
        contractor: Option<String>,
        #[command(flatten)]
        interest: InterestArgs,
        #[arg(long, default_value = "Processed")]
        status: String,
    },
    /// Render the refund certificate of a stored EMD refund
    Certificate {
        id: i64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Save a project
    Save {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        contractor: Option<String>,
        #[arg(long)]
        agreement: Option<f64>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        completion: Option<NaiveDate>,
        #[arg(long, default_value = "Active")]
        status: String,
    },
    /// Financial position and progress of a stored project
    Report {
        id: i64,
        #[arg(long, default_value_t = 0.0)]
        work_done: f64,
        #[arg(long, default_value_t = 0.0)]
        payments: f64,
        /// Physical progress in percent
        #[arg(long)]
        physical: Option<f64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingCommand {
    Get { key: String },
    Set { key: String, value: String },
}

fn parse_kind(raw: &str) -> Result<RecordKind, String> {
    raw.parse().map_err(|e: pwd_tools_core::Error| e.to_string())
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))
}

/// `Income Tax=2%:s` is a statutory 2% deduction; `Security=5000` a fixed one.
pub fn parse_deduction(raw: &str) -> Result<DeductionSpec, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected Type=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing deduction type in '{}'", raw));
    }
    let (value, statutory) = match value.trim().strip_suffix(":s") {
        Some(v) => (v.trim(), true),
        None => (value.trim(), false),
    };
    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("invalid deduction value '{}'", value))
    };
    match value.strip_suffix('%') {
        Some(rate) => Ok(DeductionSpec::percent(name, number(rate)?, statutory)),
        None => Ok(DeductionSpec::fixed(name, number(value)?, statutory)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deduction_forms() {
        let d = parse_deduction("Income Tax=2%:s").unwrap();
        assert_eq!(d.deduction_type, "Income Tax");
        assert_eq!(d.rate, 2.0);
        assert_eq!(d.fixed_amount, None);
        assert!(d.statutory);

        let d = parse_deduction("Security Deposit = 5000").unwrap();
        assert_eq!(d.fixed_amount, Some(5_000.0));
        assert!(!d.statutory);

        assert!(parse_deduction("Cess").is_err());
        assert!(parse_deduction("=5%").is_err());
        assert!(parse_deduction("Cess=five%").is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("status=Paid").unwrap(),
            ("status".to_string(), "Paid".to_string())
        );
        assert_eq!(
            parse_assignment("project_name=").unwrap(),
            ("project_name".to_string(), String::new())
        );
        assert!(parse_assignment("status").is_err());
    }

    #[test]
    fn test_cli_parses_update() {
        let cli = Cli::try_parse_from([
            "pwd-tools", "update", "bills", "3", "status=Paid", "bill_amount=10",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Update { kind, id, fields }) => {
                assert_eq!(kind, RecordKind::Bill);
                assert_eq!(id, 3);
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_every_category_but_dashboard_has_tools() {
        for category in [Category::Financial, Category::Calculation, Category::Reports] {
            assert!(!category.tools().is_empty());
        }
        assert!(Category::Dashboard.tools().is_empty());
    }

    #[test]
    fn test_security_refund_is_a_financial_tool() {
        assert!(Category::Financial
            .tools()
            .iter()
            .any(|(_, command)| *command == "security-refund"));

        let cli = Cli::try_parse_from([
            "pwd-tools", "security-refund", "4", "--date", "2024-12-31", "--recoveries", "500",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::SecurityRefund {
                bill_id,
                date,
                recoveries,
                output,
            }) => {
                assert_eq!(bill_id, 4);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 12, 31));
                assert_eq!(recoveries, 500.0);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
