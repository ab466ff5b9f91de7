// Entry point and terminal front-end for the sales dashboard.
//
// - Option [1] loads and validates the CSV, printing findings.
// - Options [2]-[4] change the state/salesman filter.
// - Option [5] recomputes every chart table for the current filter, prints
//   previews and exports CSV/JSON files.
// With `--batch` the file is loaded and reported once without the menu.
use clap::Parser;
use sales_dashboard::config::DashboardConfig;
use sales_dashboard::types::{FilterSelection, Finding, Record};
use sales_dashboard::{loader, output, pipeline, report, util};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sales-dashboard",
    about = "Sales performance dashboard: leaderboard, target achievement and trend tables"
)]
struct Cli {
    /// CSV file with salesman, state, sales and target columns
    #[arg(long)]
    input: Option<PathBuf>,

    /// JSON config file; flags given on the command line take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restrict to these states (repeatable)
    #[arg(long = "state")]
    states: Vec<String>,

    /// Restrict to these salesmen (repeatable)
    #[arg(long = "salesman")]
    salesmen: Vec<String>,

    /// Salesmen shown at each end of the leaderboard
    #[arg(long)]
    top: Option<usize>,

    /// Target hit % below which a salesman is listed as needing support
    #[arg(long)]
    threshold: Option<f64>,

    /// Directory receiving the exported reports
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Keep only the first of repeated (salesman, state, date) rows
    #[arg(long)]
    drop_duplicates: bool,

    /// Leave out states that have more than one salesman
    #[arg(long)]
    exclude_conflicts: bool,

    /// Load and report once, without the interactive menu
    #[arg(long)]
    batch: bool,

    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> sales_dashboard::Result<DashboardConfig> {
        let mut cfg = match &self.config {
            Some(path) => DashboardConfig::from_json_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(input) = self.input {
            cfg.input = input;
        }
        if let Some(dir) = self.out_dir {
            cfg.output_dir = dir;
        }
        if let Some(n) = self.top {
            cfg.top_n = n;
        }
        if let Some(t) = self.threshold {
            cfg.pipeline.support_threshold_pct = t;
        }
        if !self.states.is_empty() {
            cfg.states = self.states;
        }
        if !self.salesmen.is_empty() {
            cfg.salesmen = self.salesmen;
        }
        cfg.load.drop_duplicates |= self.drop_duplicates;
        cfg.load.exclude_conflicting_states |= self.exclude_conflicts;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Loaded data and the current filter for this run.
struct Session {
    config: DashboardConfig,
    records: Option<Vec<Record>>,
    findings: Vec<Finding>,
    selection: FilterSelection,
}

impl Session {
    fn new(config: DashboardConfig) -> Self {
        let selection = FilterSelection::new(config.states.clone(), config.salesmen.clone());
        Session {
            config,
            records: None,
            findings: Vec::new(),
            selection,
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Print `label` and read one trimmed line.
///
/// Returns `None` once input is exhausted (or unreadable) so callers can
/// stop instead of re-prompting forever on a closed stdin.
fn prompt_from<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> Option<String> {
    let _ = write!(out, "{}", label);
    let _ = out.flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn prompt(label: &str) -> Option<String> {
    prompt_from(&mut io::stdin().lock(), &mut io::stdout(), label)
}

/// Comma-separated list; blank input means "no restriction".
fn read_list(label: &str) -> Vec<String> {
    parse_list(&prompt(label).unwrap_or_default())
}

fn parse_list(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Handle option [1]: read and validate the input file.
///
/// On success the records replace any previously loaded dataset and the
/// findings are printed as a table. A file that cannot be opened leaves the
/// session unchanged.
fn handle_load(session: &mut Session) {
    let path = session.config.input.clone();
    let raw = match loader::read_csv(&path) {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("failed to load {}: {}", path.display(), e);
            return;
        }
    };
    let (records, findings) = loader::load_with(&raw, &session.config.load);
    println!(
        "Processing dataset... ({} rows read, {} usable)",
        util::format_int(raw.len()),
        util::format_int(records.len())
    );
    let parse_errors = findings.iter().filter(|f| f.is_parse_error()).count();
    println!(
        "Note: {} rows skipped due to parse errors, {} warnings.\n",
        util::format_int(parse_errors),
        util::format_int(findings.len() - parse_errors)
    );
    if !findings.is_empty() {
        output::preview_table("Validation Findings", None, &report::finding_rows(&findings), 20);
    }
    session.records = Some(records);
    session.findings = findings;
}

fn print_states(records: &[Record]) {
    let mut states: Vec<&str> = records.iter().map(|r| r.state.as_str()).collect();
    states.sort_unstable();
    states.dedup();
    println!("Available states: {}", states.join(", "));
}

/// Handle option [5]: recompute everything for the current filter.
///
/// Prints the KPI cards and previews, then exports `leaderboard.csv`,
/// `regional_summary.csv`, `support_list.csv`, `trend.csv` (only when the
/// data is dated) and `summary.json` into the output directory.
fn handle_generate_reports(session: &Session) {
    let Some(records) = session.records.as_deref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };
    let cfg = &session.config;
    let result = pipeline::compute_with(records, &session.selection, &cfg.pipeline);

    println!("Generating reports...");
    if session.selection.is_empty() {
        println!("(All regions, all salesmen)\n");
    } else {
        println!(
            "(States: {} | Salesmen: {})\n",
            describe(&session.selection.states),
            describe(&session.selection.salesmen)
        );
    }

    let k = &result.kpis;
    println!("Total Sales (Selected): {}", util::format_currency(k.total_sales));
    println!("Avg. Target Hit %: {}", util::format_pct(k.avg_target_hit_pct));
    println!("Total Salesmen: {}", util::format_int(k.total_salesmen));
    println!(
        "Salesmen Meeting Target: {}\n",
        util::format_int(k.salesmen_meeting_target)
    );

    let n = cfg.top_n;
    let r1 = report::leaderboard_rows(&result.leaderboard, n);
    export(cfg, "leaderboard.csv", &r1);
    output::preview_table(
        &format!("Top {} & Bottom {} Salesmen by Total Sales", n, n),
        None,
        &r1,
        2 * n,
    );

    let a = &result.achievement;
    println!(
        "Target Achievement: {} of {} ({})\n",
        util::format_currency(a.total_sales_sum),
        util::format_currency(a.total_target_sum),
        util::format_pct(a.overall_hit_pct)
    );

    let r2 = report::region_rows(&result);
    export(cfg, "regional_summary.csv", &r2);
    output::preview_table("Regional Target Hit %", None, &r2, r2.len());

    let r3 = report::support_rows(&result.support);
    export(cfg, "support_list.csv", &r3);
    let title = format!(
        "Salesmen Requiring Support (Target Hit % < {}%)",
        util::format_number(cfg.pipeline.support_threshold_pct, 0)
    );
    if r3.is_empty() {
        println!("{}\n", title);
        println!("Great work! No salesmen currently fall below the set performance threshold.\n");
    } else {
        output::preview_table(&title, None, &r3, r3.len());
    }

    match &result.trend {
        Some(points) => {
            let r4 = report::trend_rows(points);
            export(cfg, "trend.csv", &r4);
            output::preview_table("Sales Trend", Some("Grouped by date"), &r4, 10);
        }
        None => println!("Sales Trend: not available (no dated records)\n"),
    }

    let summary = report::summary(&result, records.len(), &session.findings);
    let path = cfg.output_dir.join("summary.json");
    if let Err(e) = output::write_json(&path, &summary) {
        log::error!("write error for {}: {}", path.display(), e);
    }
    println!("(Reports exported to {})\n", cfg.output_dir.display());
}

fn export<T: serde::Serialize>(cfg: &DashboardConfig, file: &str, rows: &[T]) {
    let path = cfg.output_dir.join(file);
    if let Err(e) = output::write_csv(&path, rows) {
        log::error!("write error for {}: {}", path.display(), e);
    }
}

fn describe(set: &std::collections::BTreeSet<String>) -> String {
    if set.is_empty() {
        "all".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Interactive loop; ends on option [6] or end of input.
fn run_menu(session: &mut Session) {
    loop {
        println!("Sales Dashboard Controls:");
        println!("[1] Load the file");
        println!("[2] Filter by state");
        println!("[3] Filter by salesman");
        println!("[4] Clear filters");
        println!("[5] Generate reports");
        println!("[6] Exit\n");
        let Some(choice) = prompt("Enter choice: ") else {
            println!("\nEnd of input. Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(session),
            "2" => {
                if let Some(records) = &session.records {
                    print_states(records);
                }
                let states = read_list("States (comma separated, blank for all): ");
                session.selection = FilterSelection::new(states, session.selection.salesmen.clone());
            }
            "3" => {
                let salesmen = read_list("Salesmen (comma separated, blank for all): ");
                session.selection = FilterSelection::new(session.selection.states.clone(), salesmen);
            }
            "4" => {
                session.selection = FilterSelection::default();
                println!("Filters cleared.\n");
            }
            "5" => {
                println!();
                handle_generate_reports(session);
            }
            "6" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter a number from 1 to 6.\n"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let batch = cli.batch;
    let config = match cli.into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };
    let mut session = Session::new(config);
    if batch {
        handle_load(&mut session);
        if session.records.is_none() {
            std::process::exit(1);
        }
        handle_generate_reports(&session);
    } else {
        run_menu(&mut session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn prompt_reads_trimmed_lines_then_stops_at_end_of_input() {
        let mut input = Cursor::new("  5 \n2\n");
        let mut out = Vec::new();
        assert_eq!(
            prompt_from(&mut input, &mut out, "Enter choice: ").as_deref(),
            Some("5")
        );
        assert_eq!(prompt_from(&mut input, &mut out, "> ").as_deref(), Some("2"));
        assert_eq!(prompt_from(&mut input, &mut out, "> "), None);
        assert_eq!(String::from_utf8(out).unwrap(), "Enter choice: > > ");
    }

    #[test]
    fn empty_line_is_not_end_of_input() {
        let mut input = Cursor::new("\n");
        let mut out = Vec::new();
        assert_eq!(prompt_from(&mut input, &mut out, "").as_deref(), Some(""));
        assert_eq!(prompt_from(&mut input, &mut out, ""), None);
    }

    #[test]
    fn list_input_splits_on_commas() {
        assert_eq!(parse_list(" Goa, Kerala ,,"), vec!["Goa", "Kerala"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn cli_flags_override_defaults() {
        let cli = Cli::parse_from([
            "sales-dashboard",
            "--state",
            "Goa",
            "--state",
            "Kerala",
            "--top",
            "3",
            "--drop-duplicates",
        ]);
        let cfg = cli.into_config().unwrap();
        assert_eq!(cfg.states, vec!["Goa", "Kerala"]);
        assert_eq!(cfg.top_n, 3);
        assert!(cfg.load.drop_duplicates);
        assert_eq!(cfg.pipeline.support_threshold_pct, 60.0);
    }
}
