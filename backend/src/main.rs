//! ESN dashboard CLI - chapter analytics from CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! esn-dashboard serve                          # Start HTTP server (port 3000)
//! esn-dashboard report --semester 23.24-S1     # Dashboard data as JSON
//! esn-dashboard export purchases -o out.csv    # Filtered raw data as CSV
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! esn-dashboard semesters                      # Semesters present in purchases
//! esn-dashboard dates                          # Date coverage per table
//! esn-dashboard label 2024-01-31               # Semester of a date
//! ```

use clap::{Args, Parser, Subcommand};
use esn_dashboard::transform::browser::parse_field_list;
use esn_dashboard::{
    build_dashboard, date_diagnostics, filter_options, load_dataset, parse_datetime, pipeline,
    semester_label, DashboardConfig, DashboardQuery, Dataset, DatasetKind, PeriodFilter,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "esn-dashboard")]
#[command(about = "Dashboard for ESN chapter students, events and ticket sales", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Location of the three CSV exports.
#[derive(Args)]
struct DataArgs {
    /// Directory holding the CSV exports (default: ESN_DATA_DIR or ./data)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

/// Period selection. Any of --from/--to switches to date-range mode.
#[derive(Args)]
struct FilterArgs {
    /// Semester label, e.g. 23.24-S1 (default: All)
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    semester: Option<String>,

    /// First day, YYYY-MM-DD (default: first purchase)
    #[arg(long)]
    from: Option<String>,

    /// Last day, YYYY-MM-DD (default: last purchase)
    #[arg(long)]
    to: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self, dataset: &Dataset) -> Result<PeriodFilter, Box<dyn std::error::Error>> {
        let mode = if self.from.is_some() || self.to.is_some() { "date" } else { "semester" };
        Ok(PeriodFilter::from_params(
            Some(mode),
            self.semester.as_deref(),
            self.from.as_deref(),
            self.to.as_deref(),
            dataset.purchase_date_bounds(),
        )?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: ESN_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Compute the dashboard and output JSON
    Report {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Nationalities to show (5-50)
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export filtered raw data as CSV
    Export {
        /// purchases, events or students
        dataset: String,

        /// Comma-separated columns (default: first 10)
        #[arg(long)]
        fields: Option<String>,

        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the semesters present in the purchases
    Semesters {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Show date coverage of each table
    Dates {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Print the semester label of a date
    Label {
        /// Date or timestamp, e.g. 2024-01-31 or 2023-09-15T10:00:00Z
        date: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port, data } => cmd_serve(port, &data).await,
        Commands::Report {
            data,
            filter,
            top_n,
            output,
        } => cmd_report(&data, &filter, top_n, output.as_deref()),
        Commands::Export {
            dataset,
            fields,
            data,
            filter,
            output,
        } => cmd_export(&dataset, fields.as_deref(), &data, &filter, output.as_deref()),
        Commands::Semesters { data } => cmd_semesters(&data),
        Commands::Dates { data } => cmd_dates(&data),
        Commands::Label { date } => cmd_label(&date),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn config(data: &DataArgs) -> DashboardConfig {
    let config = DashboardConfig::from_env();
    match &data.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    }
}

fn load(config: &DashboardConfig) -> Result<Dataset, Box<dyn std::error::Error>> {
    Ok(load_dataset(&config.sources)?)
}

async fn cmd_serve(port: Option<u16>, data: &DataArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config(data);
    if let Some(port) = port {
        config.port = port;
    }
    let dataset = load(&config)?;
    esn_dashboard::server::start_server(esn_dashboard::api::AppState { dataset, config }).await
}

fn cmd_report(
    data: &DataArgs,
    filter: &FilterArgs,
    top_n: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load(&config(data))?;
    let query = DashboardQuery::new(filter.to_filter(&dataset)?, Some(top_n));

    let report = build_dashboard(&dataset, &query);

    eprintln!("\n📊 {}", report.filter);
    eprintln!("   Revenue:        {:.2}", report.kpis.total_revenue);
    eprintln!("   Participants:   {}", report.kpis.unique_participants);
    eprintln!("   Events:         {}", report.kpis.events_organized);
    eprintln!("   Tickets sold:   {}", report.kpis.tickets_sold);

    let json = serde_json::to_string_pretty(&report)?;
    write_output(json.as_bytes(), output)?;
    Ok(())
}

fn cmd_export(
    dataset_name: &str,
    fields: Option<&str>,
    data: &DataArgs,
    filter: &FilterArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: DatasetKind = dataset_name.parse()?;
    let dataset = load(&config(data))?;
    let filter = filter.to_filter(&dataset)?;

    let csv = pipeline::export(&dataset, &filter, kind, &parse_field_list(fields))?;

    eprintln!("📤 {} rows ({})", csv.rows, csv.filename);
    write_output(&csv.content, output)?;
    Ok(())
}

fn cmd_semesters(data: &DataArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load(&config(data))?;
    let options = filter_options(&dataset);

    for semester in &options.semesters {
        println!("{}", semester);
    }
    if let Some(range) = options.default_range {
        eprintln!("\n📅 Purchases from {} to {}", range.from, range.to);
    }
    Ok(())
}

fn cmd_dates(data: &DataArgs) -> Result<(), Box<dyn std::error::Error>> {
    let dataset = load(&config(data))?;

    println!("\n📅 Date coverage:\n");
    for entry in date_diagnostics(&dataset) {
        let fmt = |d: Option<chrono::NaiveDateTime>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        println!("  {} ({})", entry.table, entry.column);
        println!("     Rows:        {}", entry.total_rows);
        println!("     Earliest:    {}", fmt(entry.earliest));
        println!("     Latest:      {}", fmt(entry.latest));
        println!("     Missing:     {} ({} unparseable)", entry.missing, entry.unparseable);
        println!();
    }
    Ok(())
}

fn cmd_label(date: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = parse_datetime(date);
    if parsed.is_none() {
        eprintln!("⚠️  Not a recognised date: {}", date);
    }
    println!("{}", semester_label(parsed.as_ref()));
    Ok(())
}

fn write_output(content: &[u8], path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use esn_dashboard::{load_table, Purchase, Student};

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("students.csv"),
            "_id,email,esnCardNumber,registerDate,nationality\n\
             s1,ana@example.com,ESN1,2023-09-01,Türkiye\n\
             s2,ben@example.com,ESN2,2024-02-10,Germany\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("events.csv"),
            "_id,name,startDate\ne1,Visita à Ribeira,2023-09-20 21:00:00\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("event_purchases.csv"),
            "_id,eventId,student_email,student_esnCard,purchaseDate,amountPaid\n\
             p1,e1,ana@example.com,ESN1,2023-09-05 18:00:00,10\n\
             p2,e1,ben@example.com,ESN2,2024-02-20 12:00:00,12.5\n",
        )
        .unwrap();
        dir
    }

    fn no_filter() -> FilterArgs {
        FilterArgs {
            semester: None,
            from: None,
            to: None,
        }
    }

    #[test]
    fn test_export_file_reloads_as_source_table() {
        let dir = data_dir();
        let data = DataArgs {
            data_dir: Some(dir.path().to_path_buf()),
        };
        let out = dir.path().join("students_filtrado.csv");

        cmd_export("students", None, &data, &no_filter(), Some(&out)).unwrap();

        let reloaded = load_table::<Student>(&fs::read(&out).unwrap(), "students_filtrado.csv").unwrap();
        assert_eq!(reloaded.rows.len(), 2);
        assert_eq!(reloaded.rows[0].id, "s1");
        assert_eq!(reloaded.rows[0].nationality.as_deref(), Some("Türkiye"));
    }

    #[test]
    fn test_export_respects_semester() {
        let dir = data_dir();
        let data = DataArgs {
            data_dir: Some(dir.path().to_path_buf()),
        };
        let out = dir.path().join("purchases.csv");
        let filter = FilterArgs {
            semester: Some("23.24-S2".into()),
            ..no_filter()
        };

        cmd_export(
            "purchases",
            Some("purchase_id,student_email,student_esnCard,purchaseDate,amountPaid,event_id"),
            &data,
            &filter,
            Some(&out),
        )
        .unwrap();

        let reloaded = load_table::<Purchase>(&fs::read(&out).unwrap(), "purchases.csv").unwrap();
        assert_eq!(reloaded.rows.len(), 1);
        assert_eq!(reloaded.rows[0].id, "p2");
        assert_eq!(reloaded.rows[0].amount_paid, Some(12.5));
    }
}
