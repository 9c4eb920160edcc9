use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use wellnessdash::filter::{self, window::parse_ymd};
use wellnessdash::source::{DirectorySource, RestSource};
use wellnessdash::{
    report, Backend, Dashboard, DashboardReport, DateWindow, FilterOptions, FilterSpec,
    PodSelector, Snapshot, StoreConfig, DEFAULT_EXCLUDED_USERS,
};

#[derive(Parser)]
#[command(name = "wellnessdash", about = "Adherence analytics for wellness programs")]
struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read tables from JSON files in this directory instead of the store
    #[arg(long, value_name = "DIR")]
    source_dir: Option<PathBuf>,

    /// Seconds a fetched table stays fresh
    #[arg(long, default_value = "300")]
    cache_ttl: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Window expression: all, 14d, 2024-01, 2024-W05, 2024-01-15, A..B
    #[arg(long)]
    window: Option<String>,
    /// Start date (YYYY-MM-DD), overrides the window start
    #[arg(long)]
    from: Option<String>,
    /// End date (YYYY-MM-DD), overrides the window end
    #[arg(long)]
    to: Option<String>,
    /// Pod to show, or "all"
    #[arg(long, default_value = "all")]
    pod: String,
    /// Include only this user (id or full name); repeatable
    #[arg(long = "user", value_name = "USER")]
    users: Vec<String>,
    /// Include every user, ignoring the default exclusions
    #[arg(long, conflicts_with = "users")]
    select_all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the dashboard for a filter
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        /// Also print the detail tables
        #[arg(long)]
        details: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the pods, users, and date range available for filtering
    Options {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the raw tables as JSON files
    Export {
        /// Output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
    },
    /// Recompute the headline metrics on an interval
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Seconds between renders
        #[arg(long, default_value = "60")]
        interval: u64,
        /// Refetch every table on each render instead of waiting for the cache to expire
        #[arg(long)]
        refresh: bool,
        /// Stop after this many renders
        #[arg(long)]
        count: Option<u64>,
    },
}

fn build_spec(snapshot: &Snapshot, args: &FilterArgs) -> anyhow::Result<FilterSpec> {
    let mut spec = if args.select_all {
        FilterSpec::select_all(snapshot)
    } else {
        FilterSpec::reset_default(snapshot, DEFAULT_EXCLUDED_USERS)
    };

    if !args.users.is_empty() {
        spec = spec.with_users(filter::resolve_users(snapshot, &args.users)?);
    }

    let mut window = match &args.window {
        Some(expr) => DateWindow::parse(expr, snapshot.date_bounds())?,
        None => spec.window,
    };
    let from = args.from.as_deref().map(parse_ymd).transpose()?;
    let to = args.to.as_deref().map(parse_ymd).transpose()?;
    window = window.with_bounds(from, to);
    if window.start > window.end {
        anyhow::bail!("start date {} is after end date {}", window.start, window.end);
    }

    Ok(spec.with_window(window).with_pod(PodSelector::parse(&args.pod)))
}

fn print_warnings(snapshot: &Snapshot) {
    for w in &snapshot.warnings {
        eprintln!("warning: {} could not be loaded: {}", w.table, w.message);
    }
}

fn print_headline(report: &DashboardReport) {
    let sel = &report.selection;
    println!(
        "Showing {} of {} users ({}), pod: {}",
        sel.selected,
        sel.total,
        report.filter.window,
        match &report.filter.pod {
            PodSelector::All => "all",
            PodSelector::Named(name) => name.as_str(),
        }
    );
    if !sel.excluded_names.is_empty() {
        println!("  Excluded: {}", sel.excluded_names.join(", "));
    }
    println!();
    for card in &report.cards {
        match &card.delta {
            Some(delta) => println!("  {:<24} {:>8}  ({delta})", card.label, card.value),
            None => println!("  {:<24} {:>8}", card.label, card.value),
        }
    }
}

fn print_report(report: &DashboardReport, details: bool) {
    print_headline(report);

    println!("\nUsers by pod");
    if report.pod_distribution.is_empty() {
        println!("  (none)");
    }
    for p in &report.pod_distribution {
        println!("  {:<24} {:>5}", p.label(), p.users);
    }

    println!("\nDaily completion");
    if report.daily_trend.is_empty() {
        println!("  (no records)");
    }
    for point in &report.daily_trend {
        println!(
            "  {}  {:>5.1}%  ({})",
            point.date,
            point.rate.pct,
            point.rate.delta()
        );
    }

    println!("\nTop performers");
    for (i, r) in report.top_performers.iter().enumerate() {
        println!("  {:>2}. {:<28} {:>5.1}%  ({})", i + 1, r.name, r.rate.pct, r.rate.delta());
    }

    let heatmap = &report.weekly_heatmap;
    if !heatmap.rows.is_empty() {
        println!("\nWeekly completion");
        let header: Vec<String> = heatmap.weekdays.iter().map(|d| format!("{:>5}", &d[..3])).collect();
        println!("  {:<10}{}", "", header.join(""));
        for row in &heatmap.rows {
            let cells: Vec<String> = row.cells.iter().map(|c| format!("{:>5.2}", c)).collect();
            println!("  {:<10}{}", row.label(), cells.join(""));
        }
    }

    println!("\nTask completion by type");
    for t in &report.task_completion_by_type {
        println!("  {:<28} {:>5.1}%  ({})", t.task_id.as_str(), t.rate.pct, t.rate.delta());
    }

    println!("\nLowest task completion by user");
    for r in &report.task_completion_by_user {
        println!("  {:<28} {:>5.1}%  ({})", r.name, r.rate.pct, r.rate.delta());
    }

    if details {
        let d = &report.details;
        println!("\nUsers");
        for u in &d.users {
            println!(
                "  {:<10} {:<28} {:<16} questionnaire: {}",
                u.id.as_str(),
                u.display_name(),
                u.pod_type.as_deref().unwrap_or("-"),
                u.has_completed_questionnaire
            );
        }
        println!("\nDaily records");
        for r in &d.daily_records {
            println!(
                "  {}  {:<28} {}",
                r.date,
                r.full_name.as_deref().unwrap_or("-"),
                if r.all_completed { "completed" } else { "incomplete" }
            );
        }
        println!("\nDaily tasks");
        for t in &d.daily_tasks {
            let at = t
                .created_at
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".into());
            println!(
                "  {:<16} {:<28} {:<28} {}",
                at,
                t.user.as_deref().unwrap_or("-"),
                t.task.as_deref().unwrap_or("-"),
                if t.completed { "done" } else { "open" }
            );
        }
    }
}

fn print_options(options: &FilterOptions) {
    match options.date_bounds {
        Some((start, end)) => println!("Dates: {start} to {end}"),
        None => println!("Dates: no daily records"),
    }
    println!("\nPods:");
    for pod in &options.pod_types {
        println!("  {pod}");
    }
    println!("\nUsers:");
    for u in &options.users {
        let default_excluded = DEFAULT_EXCLUDED_USERS.contains(&u.full_name.as_str());
        println!(
            "  {:<10} {}{}",
            u.id.as_str(),
            u.full_name,
            if default_excluded { " (excluded by default)" } else { "" }
        );
    }
}

async fn handle_watch(
    dash: &mut Dashboard<Backend>,
    filter: &FilterArgs,
    interval: u64,
    refresh: bool,
    count: Option<u64>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut renders = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Stopped.");
                return Ok(());
            }
        }

        if refresh {
            dash.refresh();
        }
        match dash.load().await {
            Ok(snapshot) => {
                print_warnings(&snapshot);
                let spec = build_spec(&snapshot, filter)?;
                let report = report::build(&snapshot, &spec);
                println!("== {} ==", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
                print_headline(&report);
                println!();
            }
            Err(e) => log::error!("Render failed: {e}"),
        }

        renders += 1;
        if count.is_some_and(|n| renders >= n) {
            return Ok(());
        }
    }
}

/// Logger for `-v` repetitions; `RUST_LOG` wins when set. Call after `.env`
/// is loaded so a `RUST_LOG` there is seen.
fn build_logger(verbose: u8) -> env_logger::Logger {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let logger = build_logger(cli.verbose);
    let max_level = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);

    let backend = match &cli.source_dir {
        Some(dir) => Backend::Directory(DirectorySource::new(dir)),
        None => Backend::Rest(RestSource::new(&StoreConfig::from_env()?)?),
    };
    let mut dash = Dashboard::new(backend, Duration::from_secs(cli.cache_ttl));

    match cli.command {
        Commands::Report {
            filter,
            details,
            json,
        } => {
            let snapshot = dash.load().await?;
            print_warnings(&snapshot);
            let spec = build_spec(&snapshot, &filter)?;
            let report = report::build(&snapshot, &spec);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, details);
            }
        }
        Commands::Options { json } => {
            let snapshot = dash.load().await?;
            print_warnings(&snapshot);
            let options = FilterOptions::from_snapshot(&snapshot);
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                print_options(&options);
            }
        }
        Commands::Export { out } => {
            let written = dash.export(&out).await?;
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        Commands::Watch {
            filter,
            interval,
            refresh,
            count,
        } => {
            handle_watch(&mut dash, &filter, interval, refresh, count).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_rust_log_from_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "RUST_LOG=debug\n").unwrap();

        std::env::remove_var("RUST_LOG");
        assert_eq!(build_logger(0).filter(), LevelFilter::Warn);

        dotenvy::from_path(&path).unwrap();
        assert_eq!(build_logger(0).filter(), LevelFilter::Debug);
        std::env::remove_var("RUST_LOG");
    }
}
