use std::io::IsTerminal;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use hazard_indexer::airnow::{AirnowHttpClient, fetch_aqi};
use hazard_indexer::app::{App, RunOptions, RunReport};
use hazard_indexer::config::{ConfigLoader, Settings};
use hazard_indexer::domain::Collection;
use hazard_indexer::error::HazardError;
use hazard_indexer::fema::{FemaHttpClient, fetch_shelters};
use hazard_indexer::firms::{FirmsHttpClient, fetch_fires};
use hazard_indexer::index::AlgoliaHttpClient;
use hazard_indexer::notify::WebhookHttpClient;
use hazard_indexer::output::{JsonOutput, LogSink, OutputMode, render_summary};

#[derive(Parser)]
#[command(name = "hazard-ix")]
#[command(about = "Ingest wildfire, shelter and air-quality feeds into a hosted search index")]
#[command(version, author)]
struct Cli {
    /// Print machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// JSON file with endpoint and polling overrides.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch every feed and publish it to the index (default)")]
    Run(RunArgs),
    #[command(about = "Fetch and normalize one feed without indexing")]
    Fetch(FetchArgs),
}

#[derive(Args, Default)]
struct RunArgs {
    /// Only run these stages; repeatable.
    #[arg(long, value_enum)]
    only: Vec<Collection>,

    /// Attempt every stage even after one fails to index.
    #[arg(long)]
    isolate_stages: bool,

    /// Observation date for the AQI query (YYYY-MM-DD).
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(value_enum)]
    collection: Collection,

    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            let code = report
                .downcast_ref::<HazardError>()
                .map_or(1, HazardError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run() -> miette::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let settings = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_ingest(args, settings, output_mode),
        Commands::Fetch(args) => run_fetch(args, settings),
    }
}

fn run_ingest(
    args: RunArgs,
    settings: Settings,
    output_mode: OutputMode,
) -> miette::Result<ExitCode> {
    // Both the index client and its credentials are resolved before any
    // feed is contacted.
    let index = AlgoliaHttpClient::new(&settings.index)?;
    let app = App::new(
        settings,
        FirmsHttpClient::new()?,
        FemaHttpClient::new()?,
        AirnowHttpClient::new()?,
        index,
        WebhookHttpClient::new()?,
    );
    let options = RunOptions {
        isolate_stages: args.isolate_stages,
        only: args.only,
        date: args.date,
    };

    let report = match output_mode {
        OutputMode::Json => app.run(&options, &JsonOutput)?,
        OutputMode::Human => app.run(&options, &LogSink)?,
    };

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic()?,
        OutputMode::Human => print_run_summary(&report),
    }

    Ok(ExitCode::from(report.exit_code()))
}

fn run_fetch(args: FetchArgs, settings: Settings) -> miette::Result<ExitCode> {
    match args.collection {
        Collection::Fires => {
            let client = FirmsHttpClient::new()?;
            let records = fetch_fires(&client, &settings.fire_feeds);
            JsonOutput::print_records(&records).into_diagnostic()?;
        }
        Collection::Shelters => {
            let client = FemaHttpClient::new()?;
            let records = fetch_shelters(&client, &settings.shelter_url);
            JsonOutput::print_records(&records).into_diagnostic()?;
        }
        Collection::Aqi => {
            let client = AirnowHttpClient::new()?;
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            let records = fetch_aqi(&client, &settings.airnow, date);
            JsonOutput::print_records(&records).into_diagnostic()?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_run_summary(report: &RunReport) {
    // Plain text when stdout is a file or pipe, e.g. under cron.
    let colored = std::io::stdout().is_terminal();
    print!("{}", render_summary(report, colored));
}
