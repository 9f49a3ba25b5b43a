// sensordash entry point.
// Parses the command line, loads config, and runs dashboard and feedback commands.

mod cache;
mod config;
mod data;
mod error;
mod feedback;
mod ingest;
mod sheets;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::data::{DashboardRequest, DashboardView};
use crate::error::{DashError, Result};
use crate::feedback::{FeedbackLogger, FeedbackRecord, FeedbackSchema, Role};
use crate::ingest::IngestionCache;
use crate::sheets::{SheetsClient, TabularSource};

/// Sensor dashboard: cached spreadsheet readings and a local feedback log.
#[derive(Debug, Parser)]
#[command(name = "sensordash", version, about)]
struct Cli {
    /// Config file (defaults to $SENSORDASH_CONFIG, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the dataset cache TTL, in seconds.
    #[arg(long, global = true)]
    ttl: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configured setups and their sheet tabs.
    Setups,

    /// Show the latest readings and the selected day's data for a setup.
    Show {
        setup: String,
        /// Day to show (YYYY-MM-DD).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Variable to chart.
        #[arg(long)]
        variable: Option<String>,
        /// Redraw every SECS seconds, reusing cached data until it expires.
        #[arg(long, value_name = "SECS")]
        watch: Option<u64>,
    },

    /// Append a feedback record.
    Feedback {
        setup: String,
        #[arg(long)]
        variable: String,
        /// Day the feedback refers to (defaults to today).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Overall rating, 1-5.
        #[arg(long)]
        rating: u8,
        /// Answer to each of the role's questions, in order (1-5).
        #[arg(long = "answer")]
        answers: Vec<u8>,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "farmer")]
        role: Role,
        #[arg(long, default_value = "")]
        comments: String,
    },

    /// Summarize stored feedback.
    Summary {
        #[arg(long)]
        role: Option<Role>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sensordash=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let path = Config::resolve_path(cli.config.as_deref());
    let mut config = Config::load(path.as_deref())?;
    if let Some(ttl) = cli.ttl {
        config.ttl_secs = ttl;
        config.validate()?;
    }

    match cli.command {
        Command::Setups => {
            for (name, tab) in &config.setups {
                println!("{}\t{}", name, tab);
            }
            Ok(())
        }
        Command::Show {
            setup,
            date,
            variable,
            watch,
        } => {
            let cache = IngestionCache::new(SheetsClient::new(&config)?, &config);
            let mut request = DashboardRequest::new(setup);
            if let Some(variable) = variable {
                request = request.with_variable(variable);
            }
            if let Some(date) = date {
                request = request.with_date(date);
            }
            match watch {
                Some(secs) => {
                    let interval = Duration::from_secs(secs.max(1));
                    watch_dashboard(&cache, &request, interval).await
                }
                None => show_dashboard(&cache, &request).await,
            }
        }
        Command::Feedback {
            setup,
            variable,
            date,
            rating,
            answers,
            name,
            role,
            comments,
        } => {
            if config.tab_for(&setup).is_none() {
                return Err(DashError::UnknownDataset(setup));
            }
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let schema = FeedbackSchema::for_role(role);
            let record = FeedbackRecord::new(setup, variable, date, rating)
                .with_name(name)
                .with_role(role)
                .with_answers(answers)
                .with_comments(comments);

            let logger = FeedbackLogger::new(&config.feedback_dir);
            logger.append(&record, schema)?;
            println!(
                "Thank you for your feedback! Saved to {}",
                logger.store_path(schema).display()
            );
            Ok(())
        }
        Command::Summary { role } => {
            let logger = FeedbackLogger::new(&config.feedback_dir);
            let schemas = match role {
                Some(role) => vec![FeedbackSchema::for_role(role)],
                None => FeedbackSchema::ALL.to_vec(),
            };
            for schema in schemas {
                let summary = logger.summary(schema)?;
                let mean = summary
                    .mean_overall
                    .map(|m| format!("{:.2}", m))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{} records\tmean overall {}",
                    schema.id(),
                    summary.records,
                    mean
                );
            }
            Ok(())
        }
    }
}

async fn show_dashboard<S: TabularSource>(
    cache: &IngestionCache<S>,
    request: &DashboardRequest,
) -> Result<()> {
    let table = cache.get_dataset(&request.setup).await?;
    let crop_type = cache.get_metadata(&request.setup).await?;
    let view = DashboardView::build(&table, crop_type, request)?;
    print_view(&view);
    Ok(())
}

/// Redraw until interrupted. Fetch errors are reported and retried on the
/// next tick; a table still within its TTL keeps being served.
async fn watch_dashboard<S: TabularSource>(
    cache: &IngestionCache<S>,
    request: &DashboardRequest,
    interval: Duration,
) -> Result<()> {
    loop {
        match show_dashboard(cache, request).await {
            Ok(()) => {}
            Err(e @ (DashError::Fetch(_) | DashError::HttpStatus { .. })) => {
                eprintln!("Error: {} (retrying)", e);
            }
            Err(e) => return Err(e),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
        println!();
    }
}

fn print_view(view: &DashboardView) {
    println!("{} (crop: {})", view.setup, view.crop_type);

    if let Some(at) = view.latest_at {
        println!("Latest reading at {}", at.format("%Y-%m-%d %H:%M:%S"));
        for metric in &view.latest {
            println!("  {:<16} {}", metric.name, metric.display());
        }
    } else {
        println!("No readings");
    }

    println!("Variables: {}", view.variables.join(", "));

    if let (Some(first), Some(last)) = (view.dates.first(), view.dates.last()) {
        println!("Dates available: {} .. {} ({} days)", first, last, view.dates.len());
    }

    if view.rows.is_empty() {
        println!("No rows for the selected date");
    } else {
        println!("Rows selected: {}", view.rows.len());
    }

    for (at, value) in &view.series {
        let value = value
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        println!("  {}  {}", at.format("%Y-%m-%d %H:%M"), value);
    }
}
