//! CLI entry point for eLAB visit analytics.
//!
//! Provides subcommands for a full export run, a log-only summary run and
//! inspecting the district alias table.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use elab_analytics::config::{DateRange, StoreConfig};
use elab_analytics::districts::{DistrictAliases, DistrictNormalizer};
use elab_analytics::fetch::BasicClient;
use elab_analytics::fetch::auth::SupabaseKey;
use elab_analytics::infra::postgrest::PostgrestStore;
use elab_analytics::output::{ExportTargets, write_artifacts};
use elab_analytics::pipeline::{Analysis, RunOptions, build, collect};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "elab_analytics")]
#[command(about = "Employee, district and test analytics over eLAB visits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch everything, aggregate and write the workbook and JSON document
    Export {
        #[command(flatten)]
        run: RunArgs,

        /// Workbook to write
        #[arg(short, long, default_value = "elab_analytics.xlsx")]
        output: PathBuf,

        /// JSON document to write
        #[arg(long, default_value = "elab_analytics.json")]
        json: PathBuf,

        /// Optional: also write one CSV per table into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
    /// Fetch and aggregate, then log the top-line totals without writing files
    Summary {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show the district alias table, or the canonical form of one label
    Districts {
        /// JSON file of extra aliases layered over the built-in table
        #[arg(long, value_name = "FILE")]
        districts: Option<String>,

        /// Label to canonicalize
        #[arg(short, long)]
        label: Option<String>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Only visits from the last N days (by service date)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    days: Option<u32>,

    /// First service date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last service date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// JSON file of extra district aliases layered over the built-in table
    #[arg(long, value_name = "FILE")]
    districts: Option<String>,

    /// Limit the species tables to one species, e.g. "Canine"
    #[arg(long)]
    species: Option<String>,

    /// Rows per page request (overrides ELAB_PAGE_SIZE)
    #[arg(long)]
    page_size: Option<usize>,

    /// Concurrent page requests per collection (overrides ELAB_FETCH_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Attempts per page before the run fails (overrides ELAB_MAX_ATTEMPTS)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Treat an empty visits collection as a valid, empty report
    #[arg(long, default_value_t = false)]
    allow_empty: bool,
}

impl RunArgs {
    fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        if let Some(days) = self.days {
            return Ok(DateRange::last_days(days, today));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bail!("--from {from} is after --to {to}");
            }
        }
        Ok(DateRange {
            start: self.from,
            end: self.to,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/elab_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("elab_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Export {
            run,
            output,
            json,
            csv_dir,
        } => {
            let targets = ExportTargets {
                workbook: output,
                json,
                csv_dir,
            };
            export(&run, &targets).await
        }
        Commands::Summary { run } => summary(&run).await,
        Commands::Districts { districts, label } => show_districts(districts.as_deref(), label.as_deref()),
    };

    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Run failed");
    }
    result
}

/// Built-in aliases, with the optional file layered on top.
fn district_normalizer(path: Option<&str>) -> Result<DistrictNormalizer> {
    let mut aliases = DistrictAliases::kerala();
    if let Some(path) = path {
        let extra = DistrictAliases::load(path)?;
        info!(path, aliases = extra.len(), "Loaded extra district aliases");
        aliases = aliases.merged_with(&extra)?;
    }
    Ok(DistrictNormalizer::new(aliases))
}

/// Fetches, normalizes, aggregates and verifies.
#[tracing::instrument(skip_all)]
async fn analyze(run: &RunArgs) -> Result<Analysis> {
    let mut config = StoreConfig::from_env()?;
    if let Some(page_size) = run.page_size {
        config.paging.page_size = page_size;
    }
    if let Some(concurrency) = run.concurrency {
        config.paging.concurrency = concurrency;
    }
    if let Some(max_attempts) = run.max_attempts {
        config.paging.max_attempts = max_attempts;
    }
    config.paging = config.paging.sanitized();

    let normalizer = district_normalizer(run.districts.as_deref())?;
    let options = RunOptions {
        range: run.date_range(Local::now().date_naive())?,
        allow_empty: run.allow_empty,
        species: run.species.clone(),
    };

    let http = BasicClient::new(config.timeout).context("failed to build HTTP client")?;
    let client = SupabaseKey::new(http, &config.key)?;
    let store = PostgrestStore::new(client, config.url.as_str());

    info!(
        url = %config.url,
        page_size = config.paging.page_size,
        concurrency = config.paging.concurrency,
        max_attempts = config.paging.max_attempts,
        start = %options.range.describe_start(),
        end = %options.range.describe_end(),
        "Starting run"
    );

    let raw = collect(&store, &config.paging).await?;
    let analysis = build(raw, &normalizer, &options)?;
    Ok(analysis)
}

async fn export(run: &RunArgs, targets: &ExportTargets) -> Result<()> {
    let analysis = analyze(run).await?;
    let published = write_artifacts(&analysis.visits, &analysis.report, &analysis.range, targets)?;
    for path in &published {
        info!(path = %path.display(), "Wrote artifact");
    }
    log_summary(&analysis);
    Ok(())
}

async fn summary(run: &RunArgs) -> Result<()> {
    let analysis = analyze(run).await?;
    log_summary(&analysis);
    Ok(())
}

fn log_summary(analysis: &Analysis) {
    let s = &analysis.report.summary;
    info!(
        total_visits = s.total_visits,
        total_tests = s.total_tests,
        total_revenue = %s.total_revenue,
        unique_employees = s.unique_employees,
        unique_districts = s.unique_districts,
        unattributed_visits = s.unattributed_visits,
        undated_visits = s.undated_visits,
        orphan_tests = s.orphan_tests,
        animal_cases = s.animal_cases,
        orphan_animal_cases = s.orphan_animal_cases,
        unique_customers = s.unique_customers,
        avg_revenue_per_case = %s.avg_revenue_per_case,
        payment_completion_rate = %s.payment_completion_rate,
        sample_collection_rate = %s.sample_collection_rate,
        report_sent_rate = %s.report_sent_rate,
        "Summary"
    );
}

fn show_districts(path: Option<&str>, label: Option<&str>) -> Result<()> {
    let normalizer = district_normalizer(path)?;

    if let Some(label) = label {
        println!("{}", normalizer.normalize(Some(label)));
        return Ok(());
    }

    for (variant, canonical) in normalizer.aliases().iter() {
        println!("{variant}\t{canonical}");
    }
    info!(aliases = normalizer.aliases().len(), "District alias table");
    Ok(())
}
