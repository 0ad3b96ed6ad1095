// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use registry_lens::{
    logging, CategoryRules, Config, DateRange, DuplicateKey, MatchMode, Record, SearchOutcome,
    Session,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "registry-lens", version, about = "Search and aggregate business-registration tables")]
struct Cli {
    /// TOML config file (column names, closed status, rules file)
    #[arg(long, global = true, env = "REGISTRY_LENS_CONFIG")]
    config: Option<PathBuf>,

    /// Uploaded table (.csv, .xlsx or .xls); the built-in sample is used when omitted
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Default)]
struct ExportArg {
    /// Also write the view as BOM-prefixed CSV
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Multi-term search over name, owner, registration and national id
    Search {
        terms: Vec<String>,
        /// Match any term instead of all terms
        #[arg(long)]
        any: bool,
        #[command(flatten)]
        out: ExportArg,
    },
    /// Businesses by status (closed by default), optionally within a closure-date range
    Closed {
        /// Status to include; repeat or comma-separate (default: config `default_statuses`)
        #[arg(long = "status", value_delimiter = ',')]
        statuses: Vec<String>,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[command(flatten)]
        out: ExportArg,
    },
    /// Closures counted per year
    Years {
        #[arg(long)]
        from: Option<i32>,
        #[arg(long)]
        to: Option<i32>,
        #[command(flatten)]
        out: ExportArg,
    },
    /// Owners or national ids that appear on more than one record
    Duplicates {
        #[arg(long, default_value = "owner")]
        by: DuplicateKey,
        /// Show the records of one duplicate key instead of the summary
        #[arg(long)]
        key: Option<String>,
        #[command(flatten)]
        out: ExportArg,
    },
    /// Rows per category derived from keyword rules
    Categories {
        /// Rules file (`label = pattern1|pattern2` lines, or JSON)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Only list records in this category
        #[arg(long)]
        only: Option<String>,
        #[command(flatten)]
        out: ExportArg,
    },
    /// Interactive terminal dashboard (default)
    Tui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Command::Tui));
    if interactive {
        // Log lines would tear the alternate screen
        logging::init_with_default("off");
    } else {
        logging::init();
    }

    let config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    let mut session = open_session(cli.file.as_deref(), config)?;
    session
        .load_configured_rules()
        .context("Failed to load category rules")?;

    match cli.command {
        None | Some(Command::Tui) => run_ui_mode(session),
        Some(Command::Search { terms, any, out }) => {
            let mode = if any { MatchMode::Any } else { session.config().default_mode };
            run_search(&session, &terms.join(" "), mode, &out)
        }
        Some(Command::Closed { statuses, from, to, out }) => {
            run_closed(&session, statuses, from, to, &out)
        }
        Some(Command::Years { from, to, out }) => run_years(&session, from, to, &out),
        Some(Command::Duplicates { by, key, out }) => run_duplicates(&session, by, key, &out),
        Some(Command::Categories { rules, only, out }) => {
            if let Some(path) = rules {
                let rules = CategoryRules::from_file(&path)
                    .with_context(|| format!("Failed to load rules: {}", path.display()))?;
                session.set_rules(rules);
            }
            run_categories(&session, only, &out)
        }
    }
}

fn open_session(file: Option<&Path>, config: Config) -> Result<Session> {
    match file {
        Some(path) => {
            let session = Session::from_path(path, config)
                .with_context(|| format!("Failed to load table: {}", path.display()))?;
            if let Some(enc) = session.encoding() {
                println!("📂 Loaded {} rows from {} ({})", session.records().len(), path.display(), enc);
            }
            Ok(session)
        }
        None => {
            eprintln!("ℹ️  No file given; using the built-in sample table.");
            Ok(Session::sample(config))
        }
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_search(session: &Session, text: &str, mode: MatchMode, out: &ExportArg) -> Result<()> {
    let outcome = session.search_for(text, mode);
    let summary = session.summary();

    println!("🔎 Search [{}] \"{}\"", mode.label(), text.trim());
    println!("   Rows: {}  |  Results: {}", summary.total, outcome.len());

    if let Some(advisory) = outcome.advisory() {
        println!("⚠️  {}", advisory);
    }
    if let SearchOutcome::Matches(records) = &outcome {
        print_records(session, records);
        write_export(out, || session.export_records(records))?;
    }
    Ok(())
}

fn run_closed(
    session: &Session,
    statuses: Vec<String>,
    from: Option<String>,
    to: Option<String>,
    out: &ExportArg,
) -> Result<()> {
    let statuses = if statuses.is_empty() {
        session.default_statuses()
    } else {
        statuses
    };
    let range = date_range_arg(session, &statuses, from.as_deref(), to.as_deref())?;
    let listed = session.status_list(&statuses, range);
    let total = session.records().len();

    println!("📋 Businesses with status: {}", statuses.join(", "));
    println!("   Available statuses: {}", session.status_options().join(", "));
    if let Some(r) = range {
        println!("   Closure date: {} ..= {}", r.start, r.end);
    }
    let share = if total == 0 {
        0.0
    } else {
        listed.len() as f64 / total as f64 * 100.0
    };
    println!("   Listed: {}  |  Share of all rows: {:.1}%", listed.len(), share);
    print_records(session, &listed);
    write_export(out, || session.export_records(&listed))
}

/// An open bound falls back to the edge of the selected records' dates.
fn date_range_arg(
    session: &Session,
    statuses: &[String],
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>> {
    let parse = |s: &str| {
        registry_lens::parse_date(s).with_context(|| format!("Unrecognised date: {s}"))
    };
    let start = from.map(parse).transpose()?;
    let end = to.map(parse).transpose()?;
    Ok(session.status_range(statuses, start, end))
}

fn run_years(session: &Session, from: Option<i32>, to: Option<i32>, out: &ExportArg) -> Result<()> {
    let years = session.closed_years();
    let (Some(&first), Some(&last)) = (years.first(), years.last()) else {
        println!("ℹ️  No closure years available.");
        return write_export(out, || session.export_year_counts(&[]));
    };

    let lo = from.unwrap_or(first);
    let hi = to.unwrap_or(last);
    let counts = session.closures_by_year(Some(lo.min(hi)..=lo.max(hi)));

    println!("📈 Closures per year ({}..={})", lo.min(hi), lo.max(hi));
    for c in &counts {
        println!("   {:>6}  {:>5}  {}", c.year, c.count, "█".repeat(c.count.min(60)));
    }
    write_export(out, || session.export_year_counts(&counts))
}

fn run_duplicates(session: &Session, by: DuplicateKey, key: Option<String>, out: &ExportArg) -> Result<()> {
    let header = session.key_header(by).to_string();

    if let Some(value) = key {
        let detail = session.duplicate_detail(by, &value);
        println!("👥 Records with {} = {}", header, value);
        print_records(session, &detail);
        return write_export(out, || session.export_records(&detail));
    }

    let groups = session.duplicate_groups(by);
    println!("👥 Repeated {} values: {}", header, groups.len());
    for g in &groups {
        println!("   {:<24} {:>5}", g.key, g.count);
    }
    write_export(out, || session.export_duplicate_groups(by, &groups))
}

fn run_categories(session: &Session, only: Option<String>, out: &ExportArg) -> Result<()> {
    println!("🏷️  Categories ({} rules)", session.rules().rule_count());
    for (label, count) in session.category_counts() {
        println!("   {:<24} {:>5}", label, count);
    }

    if let Some(label) = only {
        let view = session.filter(&registry_lens::FilterSpec::new().with_categories([label.clone()]));
        println!("\n🏷️  {} ({} rows)", label, view.len());
        print_records(session, &view);
        return write_export(out, || session.export_records(&view));
    }
    Ok(())
}

// ============================================================================
// OUTPUT HELPERS
// ============================================================================

fn print_records(session: &Session, records: &[Record]) {
    let headers = session.config().columns.display();
    println!("   {}", headers.join(" | "));
    println!("   {}", "─".repeat(72));
    for r in records {
        println!(
            "   {} | {} | {} | {} | {} | {}",
            r.name, r.registration_id, r.owner_name, r.national_id, r.status, r.closure_date_raw
        );
    }
}

fn write_export<F, E>(out: &ExportArg, render: F) -> Result<()>
where
    F: FnOnce() -> std::result::Result<Vec<u8>, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let Some(path) = &out.export else {
        return Ok(());
    };
    let bytes = render().context("Failed to render CSV")?;
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("💾 Exported to {}", path.display());
    Ok(())
}

// ============================================================================
// UI MODE
// ============================================================================

#[cfg(feature = "tui")]
fn run_ui_mode(session: Session) -> Result<()> {
    let mut app = ui::App::new(session);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_session: Session) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a subcommand: registry-lens search <terms>");
    std::process::exit(1);
}
