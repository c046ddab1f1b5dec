mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::analyze::AnalyzeArgs;
use commands::financing::FinancingArgs;
use commands::monte_carlo::MonteCarloArgs;
use commands::rates::RatesArgs;
use commands::simulate::SimulateArgs;

/// Leveraged rental property returns from live mortgage rates
#[derive(Parser)]
#[command(
    name = "mmage",
    version,
    about = "Leveraged rental property returns from live mortgage rates",
    long_about = "Aggregates mortgage rate quotes by LTV, prices first and second liens \
                  with PMI, projects a rental pro-forma period by period, and computes \
                  IRR, cash-on-cash and NOI, deterministically or by Monte Carlo."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON or YAML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate rate quotes for a lien and LTV, or sweep every LTV bucket
    Rates(RatesArgs),
    /// Price financing terms for a loan request
    Financing(FinancingArgs),
    /// Project the period-by-period cash flows of a deal
    Simulate(SimulateArgs),
    /// Simulate a deal and compute IRR, cash-on-cash and NOI
    Analyze(AnalyzeArgs),
    /// Run a seeded Monte Carlo over rent, tax, appreciation and rates
    MonteCarlo(MonteCarloArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match input::config::load_engine_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Rates(args) => commands::rates::run_rates(args, &config),
        Commands::Financing(args) => commands::financing::run_financing(args, &config),
        Commands::Simulate(args) => commands::simulate::run_simulate(args, &config),
        Commands::Analyze(args) => commands::analyze::run_analyze(args, &config),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args, &config),
        Commands::Version => {
            println!("mmage {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so piped JSON on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
