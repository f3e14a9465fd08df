use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use emissions_explorer::app::{App, SessionCache, ShowOptions};
use emissions_explorer::client::HttpDatasetClient;
use emissions_explorer::config::{ConfigLoader, ResolvedConfig};
use emissions_explorer::domain::{DatasetSource, Metric};
use emissions_explorer::error::ExplorerError;
use emissions_explorer::output::{JsonOutput, OutputMode};
use emissions_explorer::tui::Tui;

#[derive(Parser)]
#[command(name = "emx")]
#[command(about = "Explore the latest country-level CO2 and PM2.5 figures")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage cached datasets")]
    Data(DataArgs),
}

#[derive(Args)]
struct DataArgs {
    #[command(subcommand)]
    command: DataCommand,
}

#[derive(Subcommand)]
enum DataCommand {
    #[command(about = "Download datasets into the local cache")]
    Fetch(FetchArgs),
    #[command(about = "Print the panel for one country as JSON")]
    Show(ShowArgs),
    #[command(about = "Show cache provenance")]
    Info,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long, help = "owid or pm25; every source when omitted")]
    source: Option<DatasetSource>,

    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, value_enum, default_value = "total")]
    metric: Metric,

    #[arg(long, default_value = "")]
    search: String,

    #[arg(long)]
    country: Option<String>,

    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(50..=99))]
    percentile: u8,

    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ExplorerError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ExplorerError) -> u8 {
    match error {
        ExplorerError::DataUnavailable { .. } => 3,
        ExplorerError::ConfigRead(_)
        | ExplorerError::ConfigParse(_)
        | ExplorerError::InvalidPercentile(_)
        | ExplorerError::InvalidSource(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Data(args)) => run_data(args.command, &config),
        None => match output_mode {
            OutputMode::Interactive => {
                let app = build_app(&config)?;
                let mut tui = Tui::new(Metric::TotalCo2, "", 90);
                tui.run(app)
            }
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `emx data --help`)",
            )),
        },
    }
}

fn build_app(config: &ResolvedConfig) -> miette::Result<App<HttpDatasetClient>> {
    let client = HttpDatasetClient::new(config.timeout)?;
    Ok(App::new(config, client))
}

fn run_data(command: DataCommand, config: &ResolvedConfig) -> miette::Result<()> {
    let app = build_app(config)?;
    match command {
        DataCommand::Fetch(args) => {
            let sources = match args.source {
                Some(source) => vec![source],
                None => DatasetSource::all().to_vec(),
            };
            let result = app.fetch(&sources, args.force, &JsonOutput)?;
            JsonOutput::print_fetch(&result).into_diagnostic()
        }
        DataCommand::Show(args) => {
            let mut session = SessionCache::new();
            let options = ShowOptions {
                metric: args.metric,
                search: args.search,
                country: args.country,
                percentile: args.percentile,
                force: args.force,
            };
            let result = app.show(&mut session, &options, &JsonOutput)?;
            JsonOutput::print_show(&result).into_diagnostic()
        }
        DataCommand::Info => JsonOutput::print_info(&app.info()).into_diagnostic(),
    }
}
